use core::any::{Any, TypeId};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    component::Handle,
    metadata::TypeDescriptor,
    service::{service_fn, BoxCloneService},
};

/// A hook fired once per created instance satisfying a given capability,
/// after the instance's own construction completes.
pub trait Initializer<Cap: ?Sized>: Clone + 'static {
    fn ready(&mut self, instance: Handle<Cap>);
}

impl<F, Cap: ?Sized> Initializer<Cap> for F
where
    F: FnMut(Handle<Cap>) + Clone + 'static,
{
    #[inline]
    fn ready(&mut self, instance: Handle<Cap>) {
        self(instance);
    }
}

pub(crate) type BoxedInitializer = BoxCloneService<Box<dyn Any>, (), ()>;

/// Boxes a typed initializer behind the erased capability-view calling
/// convention used by the resolution engine.
#[must_use]
pub(crate) fn boxed_initializer_factory<Cap, Init>(mut initializer: Init) -> BoxedInitializer
where
    Cap: ?Sized + 'static,
    Init: Initializer<Cap> + Send + Sync,
{
    BoxCloneService(Box::new(service_fn(move |view: Box<dyn Any>| {
        let instance = view
            .downcast::<Handle<Cap>>()
            .expect("initializer invoked with a mismatched capability view");
        initializer.ready(*instance);
        Ok(())
    })))
}

/// Capability-indexed hooks plus the per-concrete-type memo of which hook
/// keys apply.
#[derive(Default)]
pub(crate) struct InitializerIndex {
    hooks: BTreeMap<TypeId, BoxedInitializer>,
    applicable: BTreeMap<TypeId, Arc<[TypeId]>>,
}

impl InitializerIndex {
    /// Registers a hook for a capability. Registering twice replaces. The
    /// applicability memo is dropped so the new hook is observed by every
    /// subsequent resolution.
    pub(crate) fn register(&mut self, capability: TypeId, hook: BoxedInitializer) {
        self.hooks.insert(capability, hook);
        self.applicable.clear();
    }

    #[must_use]
    pub(crate) fn hook(&self, capability: TypeId) -> Option<BoxedInitializer> {
        self.hooks.get(&capability).cloned()
    }

    /// Hook keys applicable to a concrete type: every registered capability
    /// encountered on its capability chain, deduplicated, chain order.
    #[must_use]
    pub(crate) fn applicable(&mut self, descriptor: &TypeDescriptor) -> Arc<[TypeId]> {
        if let Some(keys) = self.applicable.get(&descriptor.info.id) {
            return keys.clone();
        }

        let mut seen = BTreeSet::new();
        let mut keys = Vec::new();
        for link in descriptor.capability_chain() {
            if self.hooks.contains_key(&link.id) && seen.insert(link.id) {
                keys.push(link.id);
            }
        }

        let keys: Arc<[TypeId]> = keys.into();
        self.applicable.insert(descriptor.info.id, keys.clone());
        keys
    }
}
