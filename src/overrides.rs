use core::any::TypeId;
use std::collections::BTreeMap;

use crate::any::TypeInfo;

/// Runtime substitutions: capability type to the concrete type that should
/// satisfy it. Consulted on every resolution entry; mutable for the
/// container's lifetime.
#[derive(Default)]
pub(crate) struct OverrideTable {
    map: BTreeMap<TypeId, TypeInfo>,
}

impl OverrideTable {
    /// Registers a substitution. Setting a second time replaces.
    pub(crate) fn set(&mut self, capability: TypeInfo, target: TypeInfo) {
        self.map.insert(capability.id, target);
    }

    /// Removes a substitution. A no-op when none was set.
    pub(crate) fn remove(&mut self, capability: TypeId) {
        self.map.remove(&capability);
    }

    #[must_use]
    pub(crate) fn lookup(&self, capability: TypeId) -> Option<TypeInfo> {
        self.map.get(&capability).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::OverrideTable;
    use crate::any::TypeInfo;

    struct First;
    struct Second;
    trait Iface: Send {}

    #[test]
    fn test_set_replaces() {
        let mut table = OverrideTable::default();
        let capability = TypeInfo::of::<dyn Iface>();

        table.set(capability, TypeInfo::of::<First>());
        table.set(capability, TypeInfo::of::<Second>());

        assert_eq!(table.lookup(capability.id), Some(TypeInfo::of::<Second>()));
    }

    #[test]
    fn test_lookup_unrelated_is_absent() {
        let table = OverrideTable::default();
        assert!(table.lookup(TypeInfo::of::<First>().id).is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut table = OverrideTable::default();
        let capability = TypeInfo::of::<dyn Iface>();

        table.remove(capability.id);
        table.set(capability, TypeInfo::of::<First>());
        table.remove(capability.id);
        table.remove(capability.id);

        assert!(table.lookup(capability.id).is_none());
    }
}
