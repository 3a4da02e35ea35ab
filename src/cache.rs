use core::any::TypeId;
use std::collections::BTreeMap;

use crate::component::Erased;

/// Container-scoped instance state: the shared-instance cache, keyed by the
/// concrete type actually chosen, and the ordered retained-root list.
#[derive(Default)]
pub(crate) struct Cache {
    shared: BTreeMap<TypeId, Erased>,
    retained: Vec<Erased>,
}

impl Cache {
    #[must_use]
    pub(crate) fn get_shared(&self, concrete: TypeId) -> Option<Erased> {
        self.shared.get(&concrete).cloned()
    }

    /// Publishes a shared instance. Happens before injection so that a
    /// transitive request for the same type during assembly observes it.
    pub(crate) fn insert_shared(&mut self, concrete: TypeId, instance: Erased) {
        self.shared.insert(concrete, instance);
    }

    /// Appends a retained root; first-insertion order is preserved.
    pub(crate) fn retain(&mut self, instance: Erased) {
        self.retained.push(instance);
    }

    #[cfg(test)]
    pub(crate) fn retained_len(&self) -> usize {
        self.retained.len()
    }
}
