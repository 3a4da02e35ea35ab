use core::any::TypeId;
use std::{collections::BTreeMap, sync::Arc};

use parking_lot::Mutex;
use tracing::warn;

use crate::{
    any::TypeInfo,
    errors::ResolveErrorKind,
    registration::{Caster, ComponentVtable, EntryKind, SlotDesc, TypeEntry, __TYPE_ENTRIES},
};

/// Resolved metadata for one type: what the engine consults on every
/// resolution. Derived from the registration entries and memoized for the
/// container's lifetime.
#[derive(Debug)]
pub(crate) struct TypeDescriptor {
    pub(crate) name: &'static str,
    pub(crate) info: TypeInfo,
    pub(crate) kind: DescriptorKind,
}

#[derive(Debug)]
pub(crate) enum DescriptorKind {
    Concrete(ConcreteDescriptor),
    Capability { default_impl: Option<TypeInfo> },
}

#[derive(Debug)]
pub(crate) struct ConcreteDescriptor {
    /// Sharing flag, inherited from the ancestor chain.
    pub(crate) shared: bool,
    /// Every declared slot, ancestors before descendants, declaration order
    /// within each level.
    pub(crate) slots: Vec<SlotDesc>,
    /// The type itself, its direct capabilities, then recursively the
    /// ancestor and the ancestor's capabilities.
    pub(crate) chain: Vec<TypeInfo>,
    /// Views this type can produce of its own instances (own declarations
    /// only; an embedded ancestor is not a reachable view).
    pub(crate) casters: Vec<(TypeId, Caster)>,
    pub(crate) vtable: ComponentVtable,
}

impl TypeDescriptor {
    #[must_use]
    pub(crate) fn concrete(&self) -> Option<&ConcreteDescriptor> {
        match &self.kind {
            DescriptorKind::Concrete(concrete) => Some(concrete),
            DescriptorKind::Capability { .. } => None,
        }
    }

    #[must_use]
    pub(crate) fn is_shared(&self) -> bool {
        self.concrete().is_some_and(|concrete| concrete.shared)
    }

    #[must_use]
    pub(crate) fn caster(&self, requested: TypeId) -> Option<Caster> {
        self.concrete()
            .and_then(|concrete| concrete.casters.iter().find(|(id, _)| *id == requested))
            .map(|(_, caster)| *caster)
    }

    #[must_use]
    pub(crate) fn capability_chain(&self) -> &[TypeInfo] {
        match self.concrete() {
            Some(concrete) => &concrete.chain,
            None => &[],
        }
    }
}

/// Builds and memoizes [`TypeDescriptor`]s from the registered entries.
pub(crate) struct MetadataProbe {
    entries: BTreeMap<TypeId, TypeEntry>,
    descriptors: Mutex<BTreeMap<TypeId, Arc<TypeDescriptor>>>,
}

impl MetadataProbe {
    #[must_use]
    pub(crate) fn new() -> Self {
        let mut entries = BTreeMap::new();
        for getter in __TYPE_ENTRIES.iter() {
            let entry = getter();
            let info = entry.info;
            if entries.insert(info.id, entry).is_some() {
                warn!(type_name = info.name, "Duplicate registration, last one wins");
            }
        }
        Self {
            entries,
            descriptors: Mutex::new(BTreeMap::new()),
        }
    }

    pub(crate) fn descriptor(&self, info: TypeInfo) -> Result<Arc<TypeDescriptor>, ResolveErrorKind> {
        if let Some(descriptor) = self.descriptors.lock().get(&info.id) {
            return Ok(descriptor.clone());
        }

        let descriptor = Arc::new(self.build(info)?);
        self.descriptors.lock().insert(info.id, descriptor.clone());
        Ok(descriptor)
    }

    fn build(&self, info: TypeInfo) -> Result<TypeDescriptor, ResolveErrorKind> {
        let entry = self.entries.get(&info.id).ok_or(ResolveErrorKind::UnknownType(info))?;
        match &entry.kind {
            EntryKind::Capability(capability) => Ok(TypeDescriptor {
                name: entry.name,
                info: entry.info,
                kind: DescriptorKind::Capability {
                    default_impl: capability.default_impl,
                },
            }),
            EntryKind::Concrete(concrete) => {
                let (shared, slots, chain) = self.flatten(info)?;
                Ok(TypeDescriptor {
                    name: entry.name,
                    info: entry.info,
                    kind: DescriptorKind::Concrete(ConcreteDescriptor {
                        shared,
                        slots,
                        chain,
                        casters: concrete.casters.clone(),
                        vtable: concrete.vtable,
                    }),
                })
            }
        }
    }

    /// Walks the ancestor chain, accumulating slots ancestor-first and the
    /// capability chain descendant-first.
    fn flatten(&self, info: TypeInfo) -> Result<(bool, Vec<SlotDesc>, Vec<TypeInfo>), ResolveErrorKind> {
        let entry = self.entries.get(&info.id).ok_or(ResolveErrorKind::UnknownType(info))?;
        let EntryKind::Concrete(concrete) = &entry.kind else {
            return Err(ResolveErrorKind::UnknownType(info));
        };

        let (ancestor_shared, ancestor_slots, ancestor_chain) = match concrete.ancestor {
            Some(base) => self.flatten(base)?,
            None => (false, Vec::new(), Vec::new()),
        };

        let mut slots = ancestor_slots;
        slots.extend(concrete.slots.iter().copied());

        let mut chain = vec![info];
        chain.extend(concrete.capabilities.iter().copied());
        chain.extend(ancestor_chain);

        Ok((concrete.shared || ancestor_shared, slots, chain))
    }
}
