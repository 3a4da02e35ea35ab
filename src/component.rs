use core::{
    any::{Any, TypeId},
    fmt,
};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::InjectErrorKind;

/// Interior-mutability cell every assembled component lives in.
///
/// Assembly mutates components (slot writes, own construction) while shared
/// peers may already hold handles to them, so the cell is mandatory.
pub type Lock<T> = Mutex<T>;

/// Shared handle to an assembled component, either by concrete type
/// (`Handle<Locator>`) or by capability (`Handle<dyn Places>`).
pub type Handle<T> = Arc<Lock<T>>;

/// Type-erased component storage: an `Arc<Lock<C>>` behind `dyn Any`.
pub type Erased = Arc<dyn Any + Send + Sync>;

/// A type the container can instantiate and wire.
///
/// Allocation uses `Default`; [`Component::construct`] is the component's own
/// construction logic, invoked only after every declared dependency slot has
/// been assigned. Construction of a shared component may run while a peer in
/// a dependency cycle is still under assembly, so it should only store its
/// injected handles; heavy work belongs in an initializer.
pub trait Component: Any + Send {
    fn construct(&mut self) {}
}

/// Slot-write dispatch, implemented by the [`component!`](macro@crate::component)
/// macro. Not meant to be written by hand.
pub trait Assemble: Component {
    /// Assigns a dependency value to the slot identified by its declaring
    /// type and field name, delegating to the embedded ancestor when the
    /// owner is not `Self`.
    fn assign(&mut self, owner: TypeId, slot: &'static str, value: Box<dyn Any>) -> Result<(), InjectErrorKind>;
}

/// A declared dependency slot.
///
/// Starts empty and is filled by the container before the owning component's
/// [`Component::construct`] runs.
#[derive(Clone)]
pub struct Slot<T: ?Sized>(Option<Handle<T>>);

impl<T: ?Sized> Default for Slot<T> {
    #[inline]
    fn default() -> Self {
        Self(None)
    }
}

impl<T: ?Sized> Slot<T> {
    /// Returns the injected handle.
    ///
    /// # Panics
    /// Panics if read before the container assigned the slot. Inside
    /// [`Component::construct`] and later the slot is always filled.
    #[must_use]
    pub fn get(&self) -> Handle<T> {
        self.0.clone().expect("dependency slot read before assembly")
    }

    #[inline]
    #[must_use]
    pub fn try_get(&self) -> Option<Handle<T>> {
        self.0.clone()
    }

    #[inline]
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.0.is_some()
    }

    /// Stores the injected handle. Called by generated assign code.
    #[inline]
    pub fn fill(&mut self, value: Handle<T>) {
        self.0 = Some(value);
    }
}

impl<T: ?Sized> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.is_some() { "Slot(filled)" } else { "Slot(empty)" })
    }
}
