//! Link-time registration of component and capability metadata.
//!
//! Every [`component!`](macro@crate::component) and
//! [`capability!`](macro@crate::capability) invocation contributes one getter
//! to the distributed slice below; a
//! container scans the slice once to build its type index. This replaces
//! reflective type-by-name lookup with a registration step resolved at link
//! time.

use core::any::{Any, TypeId};
use std::sync::Arc;

pub use linkme::{self, distributed_slice};

use crate::{
    any::TypeInfo,
    component::{Assemble, Component, Erased, Handle, Lock},
    errors::InjectErrorKind,
};

/// Metadata getters, one per registration site.
#[distributed_slice]
pub static __TYPE_ENTRIES: [fn() -> TypeEntry];

/// Produces a handle viewing an erased instance as some capability or as its
/// concrete type. Registered by the concrete side, consumed when a slot or a
/// hook declared against that view is served.
pub type Caster = fn(&Erased) -> Box<dyn Any>;

/// A declared dependency slot: owning type, field name, declared type.
#[derive(Debug, Clone, Copy)]
pub struct SlotDesc {
    pub(crate) owner: TypeInfo,
    pub(crate) name: &'static str,
    pub(crate) ty: TypeInfo,
}

/// Erased operations over one concrete component type.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ComponentVtable {
    pub(crate) allocate: fn() -> Erased,
    pub(crate) inject: fn(&Erased, TypeId, &'static str, Box<dyn Any>) -> Result<(), InjectErrorKind>,
    pub(crate) construct: fn(&Erased),
}

/// One registered type: a concrete component or an abstract capability.
pub struct TypeEntry {
    pub(crate) name: &'static str,
    pub(crate) info: TypeInfo,
    pub(crate) kind: EntryKind,
}

pub(crate) enum EntryKind {
    Concrete(ConcreteEntry),
    Capability(CapabilityEntry),
}

pub(crate) struct ConcreteEntry {
    pub(crate) shared: bool,
    pub(crate) ancestor: Option<TypeInfo>,
    pub(crate) capabilities: Vec<TypeInfo>,
    pub(crate) slots: Vec<SlotDesc>,
    pub(crate) casters: Vec<(TypeId, Caster)>,
    pub(crate) vtable: ComponentVtable,
}

pub(crate) struct CapabilityEntry {
    pub(crate) default_impl: Option<TypeInfo>,
}

impl TypeEntry {
    /// Entry for a concrete component type.
    #[must_use]
    pub fn concrete<C>(name: &'static str) -> Self
    where
        C: Assemble + Default,
    {
        let identity: Caster = |erased| Box::new(downcast_instance::<C>(erased));
        Self {
            name,
            info: TypeInfo::of::<C>(),
            kind: EntryKind::Concrete(ConcreteEntry {
                shared: false,
                ancestor: None,
                capabilities: Vec::new(),
                slots: Vec::new(),
                casters: vec![(TypeId::of::<C>(), identity)],
                vtable: ComponentVtable {
                    allocate: || {
                        let cell: Erased = Arc::new(Lock::new(C::default()));
                        cell
                    },
                    inject: |erased, owner, slot, value| downcast_instance::<C>(erased).lock().assign(owner, slot, value),
                    construct: |erased| downcast_instance::<C>(erased).lock().construct(),
                },
            }),
        }
    }

    /// Entry for an abstract capability (`dyn Trait`).
    #[must_use]
    pub fn capability<T>(name: &'static str) -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name,
            info: TypeInfo::of::<T>(),
            kind: EntryKind::Capability(CapabilityEntry { default_impl: None }),
        }
    }

    /// Declares the concrete fallback used when this capability is requested
    /// with no override in place.
    #[must_use]
    pub fn default_impl<D>(mut self) -> Self
    where
        D: Assemble + Default,
    {
        match &mut self.kind {
            EntryKind::Capability(capability) => capability.default_impl = Some(TypeInfo::of::<D>()),
            EntryKind::Concrete(_) => panic!("default_impl is only valid on capability entries"),
        }
        self
    }

    /// Marks the component as shared: at most one instance per container.
    #[must_use]
    pub fn shared(mut self) -> Self {
        self.concrete_mut().shared = true;
        self
    }

    /// Declares an embedded ancestor component whose slots, sharing flag and
    /// capability chain are inherited.
    #[must_use]
    pub fn extends<B>(mut self) -> Self
    where
        B: Assemble + Default,
    {
        self.concrete_mut().ancestor = Some(TypeInfo::of::<B>());
        self
    }

    /// Declares a capability this component satisfies, with the caster that
    /// produces the capability view of an instance.
    #[must_use]
    pub fn caster_for<T>(mut self, caster: Caster) -> Self
    where
        T: ?Sized + 'static,
    {
        let concrete = self.concrete_mut();
        concrete.capabilities.push(TypeInfo::of::<T>());
        concrete.casters.push((TypeId::of::<T>(), caster));
        self
    }

    /// Declares a dependency slot with its field name and declared type.
    #[must_use]
    pub fn slot<S>(mut self, name: &'static str) -> Self
    where
        S: ?Sized + 'static,
    {
        let owner = self.info;
        self.concrete_mut().slots.push(SlotDesc {
            owner,
            name,
            ty: TypeInfo::of::<S>(),
        });
        self
    }

    fn concrete_mut(&mut self) -> &mut ConcreteEntry {
        match &mut self.kind {
            EntryKind::Concrete(concrete) => concrete,
            EntryKind::Capability(_) => panic!("component metadata is only valid on concrete entries"),
        }
    }
}

/// Recovers the typed cell from an erased instance. Only called with the
/// matching concrete type, by construction of the entry that carries it.
#[must_use]
pub fn downcast_instance<C: Component>(erased: &Erased) -> Handle<C> {
    erased
        .clone()
        .downcast::<Lock<C>>()
        .expect("component cell downcast to a mismatched type")
}

/// Recovers a typed slot value from the erased form produced by a caster.
pub fn downcast_slot<T>(owner: &'static str, slot: &'static str, value: Box<dyn Any>) -> Result<Handle<T>, InjectErrorKind>
where
    T: ?Sized + 'static,
{
    match value.downcast::<Handle<T>>() {
        Ok(handle) => Ok(*handle),
        Err(_) => Err(InjectErrorKind::SlotTypeMismatch { owner, slot }),
    }
}
