use core::any::{Any, TypeId};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, debug_span, error, warn};

use crate::{
    any::TypeInfo,
    cache::Cache,
    component::{Assemble, Erased, Handle},
    errors::ResolveErrorKind,
    initializer::{boxed_initializer_factory, Initializer, InitializerIndex},
    metadata::{DescriptorKind, MetadataProbe, TypeDescriptor},
    overrides::OverrideTable,
    registration::SlotDesc,
    registry::{NameRoots, Root, TypeIndex},
    service::Service as _,
};

static CURRENT: Mutex<Option<Container>> = Mutex::new(None);

/// A resolved component with its concrete metadata attached.
#[derive(Clone)]
pub struct Instance {
    pub(crate) descriptor: Arc<TypeDescriptor>,
    pub(crate) erased: Erased,
}

impl Instance {
    /// Identity of the concrete type the engine actually chose.
    #[must_use]
    pub fn concrete_info(&self) -> TypeInfo {
        self.descriptor.info
    }

    /// Views the instance as the requested concrete type or capability.
    ///
    /// # Errors
    /// Fails when the concrete type declares no such view.
    pub fn cast<T: ?Sized + 'static>(&self) -> Result<Handle<T>, ResolveErrorKind> {
        let unsupported = || ResolveErrorKind::UnsupportedCast {
            concrete: self.descriptor.info,
            requested: TypeInfo::of::<T>(),
        };
        let caster = self.descriptor.caster(TypeId::of::<T>()).ok_or_else(unsupported)?;
        caster(&self.erased)
            .downcast::<Handle<T>>()
            .map(|handle| *handle)
            .map_err(|_| unsupported())
    }
}

/// The unit of assembly: holds the shared-instance cache, the override table,
/// the initializer index and the retained-root list, and drives resolution.
///
/// Cheap to clone; clones address the same assembly. Assembly is
/// single-threaded by design: callers serialize access.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    index: Mutex<TypeIndex>,
    probe: MetadataProbe,
    overrides: Mutex<OverrideTable>,
    initializers: Mutex<InitializerIndex>,
    cache: Mutex<Cache>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates a container with empty name roots and publishes it as the
    /// ambient current container.
    #[must_use]
    pub fn new() -> Self {
        Self::with_roots(NameRoots::default())
    }

    /// Creates a container with the given name roots and publishes it as the
    /// ambient current container.
    #[must_use]
    pub fn with_roots(roots: NameRoots) -> Self {
        let container = Self {
            inner: Arc::new(ContainerInner {
                index: Mutex::new(TypeIndex::new(roots)),
                probe: MetadataProbe::new(),
                overrides: Mutex::new(OverrideTable::default()),
                initializers: Mutex::new(InitializerIndex::default()),
                cache: Mutex::new(Cache::default()),
            }),
        };
        *CURRENT.lock() = Some(container.clone());
        container
    }

    /// The most recently constructed container, for host code that wants to
    /// self-wire. Tests that need isolation construct their own container
    /// and address it directly.
    #[must_use]
    pub fn current() -> Option<Container> {
        CURRENT.lock().clone()
    }

    /// Resolves a component or capability without retaining it.
    #[allow(clippy::missing_errors_doc)]
    pub fn get<T: ?Sized + 'static>(&self) -> Result<Handle<T>, ResolveErrorKind> {
        self.load::<T>(false)
    }

    /// Resolves a component or capability, optionally keeping the instance
    /// alive for the container's lifetime.
    #[allow(clippy::missing_errors_doc)]
    pub fn load<T: ?Sized + 'static>(&self, retain: bool) -> Result<Handle<T>, ResolveErrorKind> {
        let instance = self.resolve(TypeInfo::of::<T>())?;
        if retain {
            self.inner.cache.lock().retain(instance.erased.clone());
        }
        instance.cast::<T>()
    }

    /// Resolves a component by its registered name under the component root.
    #[allow(clippy::missing_errors_doc)]
    pub fn load_by_name(&self, name: &str, retain: bool) -> Result<Instance, ResolveErrorKind> {
        let info = self.inner.index.lock().lookup(name, Root::Component)?;
        let instance = self.resolve(info)?;
        if retain {
            self.inner.cache.lock().retain(instance.erased.clone());
        }
        Ok(instance)
    }

    /// Injects dependency slots into an externally-owned instance.
    ///
    /// Runs slot injection only: no allocation, no own construction, no
    /// initializer hooks. Useful for host objects the runtime did not create.
    #[allow(clippy::missing_errors_doc)]
    pub fn resolve_into<T: Assemble>(&self, target: &mut T) -> Result<(), ResolveErrorKind> {
        let descriptor = self.inner.probe.descriptor(TypeInfo::of::<T>())?;
        let Some(concrete) = descriptor.concrete() else {
            return Err(ResolveErrorKind::UnknownType(descriptor.info));
        };
        for slot in &concrete.slots {
            let value = self.resolve_slot_value(slot)?;
            target.assign(slot.owner.id, slot.name, value)?;
        }
        Ok(())
    }

    /// Registers a hook fired once per created instance satisfying the
    /// capability. Registering a second hook for the same capability
    /// replaces the first. Already-created instances are not revisited.
    pub fn add_initializer<Cap: ?Sized + 'static>(&self, initializer: impl Initializer<Cap> + Send + Sync) {
        self.inner
            .initializers
            .lock()
            .register(TypeId::of::<Cap>(), boxed_initializer_factory::<Cap, _>(initializer));
    }

    /// Substitutes the capability with the given concrete component for
    /// every subsequent resolution. Already-cached shared instances are not
    /// rebuilt.
    pub fn set_override<Cap: ?Sized + 'static, C: Assemble + Default>(&self) {
        self.inner.overrides.lock().set(TypeInfo::of::<Cap>(), TypeInfo::of::<C>());
    }

    /// Registers an override by textual names, both resolved under the
    /// override root.
    #[allow(clippy::missing_errors_doc)]
    pub fn set_override_by_name(&self, capability: &str, target: &str) -> Result<(), ResolveErrorKind> {
        let (capability, target) = {
            let mut index = self.inner.index.lock();
            (index.lookup(capability, Root::Override)?, index.lookup(target, Root::Override)?)
        };
        self.inner.overrides.lock().set(capability, target);
        Ok(())
    }

    /// Removes any override registered for the capability. A no-op when none
    /// was set.
    pub fn remove_override<Cap: ?Sized + 'static>(&self) {
        self.inner.overrides.lock().remove(TypeId::of::<Cap>());
    }

    /// Whether at most one instance of the type exists per container,
    /// directly or inherited from an ancestor.
    #[must_use]
    pub fn is_shared<T: ?Sized + 'static>(&self) -> bool {
        self.inner
            .probe
            .descriptor(TypeInfo::of::<T>())
            .is_ok_and(|descriptor| descriptor.is_shared())
    }

    #[cfg(test)]
    pub(crate) fn retained_len(&self) -> usize {
        self.inner.cache.lock().retained_len()
    }
}

impl Container {
    pub(crate) fn resolve(&self, requested: TypeInfo) -> Result<Instance, ResolveErrorKind> {
        let span = debug_span!("resolve", requested = requested.short_name());
        let _guard = span.enter();

        // An override is authoritative. It re-enters resolution so chained
        // substitutions compose; a self-mapping falls through to the direct
        // path instead of recursing forever.
        let overridden = self.inner.overrides.lock().lookup(requested.id);
        if let Some(target) = overridden {
            if target.id != requested.id {
                debug!(target = target.short_name(), "Override applies");
                return self.resolve(target);
            }
        }

        let descriptor = self.inner.probe.descriptor(requested)?;
        match &descriptor.kind {
            DescriptorKind::Capability { default_impl } => match default_impl {
                Some(default) => {
                    debug!(default = default.short_name(), "Using default implementation");
                    let descriptor = self.inner.probe.descriptor(*default)?;
                    self.instantiate(&descriptor)
                }
                None => {
                    let err = ResolveErrorKind::UnresolvableAbstract(requested);
                    warn!("{err}");
                    Err(err)
                }
            },
            DescriptorKind::Concrete(_) => self.instantiate(&descriptor),
        }
    }

    fn instantiate(&self, descriptor: &Arc<TypeDescriptor>) -> Result<Instance, ResolveErrorKind> {
        let Some(concrete) = descriptor.concrete() else {
            // Default implementations and override targets must be concrete.
            return Err(ResolveErrorKind::UnresolvableAbstract(descriptor.info));
        };

        if concrete.shared {
            if let Some(erased) = self.inner.cache.lock().get_shared(descriptor.info.id) {
                debug!("Found in shared cache");
                return Ok(Instance {
                    descriptor: descriptor.clone(),
                    erased,
                });
            }
        }

        let instance = Instance {
            descriptor: descriptor.clone(),
            erased: (concrete.vtable.allocate)(),
        };

        // Published before injection so a dependency cycle among shared
        // components terminates with one instance each. The entry stays in
        // place even if a later slot fails to resolve.
        if concrete.shared {
            self.inner
                .cache
                .lock()
                .insert_shared(descriptor.info.id, instance.erased.clone());
        }

        for slot in &concrete.slots {
            let value = self.resolve_slot_value(slot)?;
            (concrete.vtable.inject)(&instance.erased, slot.owner.id, slot.name, value).map_err(|err| {
                error!("{err}");
                ResolveErrorKind::Inject(err)
            })?;
        }

        (concrete.vtable.construct)(&instance.erased);
        debug!(component = descriptor.name, "Constructed");

        self.fire_initializers(descriptor, &instance);

        Ok(instance)
    }

    fn resolve_slot_value(&self, slot: &SlotDesc) -> Result<Box<dyn Any>, ResolveErrorKind> {
        let dependency = self.resolve(slot.ty)?;
        let Some(caster) = dependency.descriptor.caster(slot.ty.id) else {
            let err = ResolveErrorKind::UnsupportedCast {
                concrete: dependency.descriptor.info,
                requested: slot.ty,
            };
            error!("{err}");
            return Err(err);
        };
        Ok(caster(&dependency.erased))
    }

    fn fire_initializers(&self, descriptor: &Arc<TypeDescriptor>, instance: &Instance) {
        let keys = self.inner.initializers.lock().applicable(descriptor);
        for key in keys.iter() {
            let Some(mut hook) = self.inner.initializers.lock().hook(*key) else {
                continue;
            };
            // A hook keyed on an embedded ancestor's own type has no
            // reachable view from the descendant.
            let Some(caster) = descriptor.caster(*key) else {
                debug!("No view for initializer key, skipped");
                continue;
            };
            let _ = hook.call(caster(&instance.erased));
            debug!("Initializer fired");
        }
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicU8, Ordering};
    use std::sync::Arc;

    use tracing_test::traced_test;

    use super::Container;
    use crate::{capability, component, Component, ResolveErrorKind, Slot};

    #[derive(Default)]
    struct Bus;
    impl Component for Bus {}
    component! { Bus { name: "cont::Bus", shared } }

    #[test]
    #[traced_test]
    fn test_shared_uniqueness() {
        let container = Container::new();

        let first = container.get::<Bus>().unwrap();
        let second = container.get::<Bus>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(container.is_shared::<Bus>());
    }

    trait Clock: Send {
        fn now(&self) -> u64;
    }

    #[derive(Default)]
    struct SystemClock;
    impl Component for SystemClock {}
    impl Clock for SystemClock {
        fn now(&self) -> u64 {
            1
        }
    }

    #[derive(Default)]
    struct FakeClock;
    impl Component for FakeClock {}
    impl Clock for FakeClock {
        fn now(&self) -> u64 {
            2
        }
    }

    component! { SystemClock { name: "cont::SystemClock", capabilities: [dyn Clock] } }
    component! { FakeClock { name: "cont::FakeClock", capabilities: [dyn Clock] } }
    capability! { dyn Clock, name: "cont::Clock", default: SystemClock }

    #[test]
    #[traced_test]
    fn test_default_implementation() {
        let container = Container::new();

        let clock = container.get::<dyn Clock>().unwrap();
        assert_eq!(clock.lock().now(), 1);

        let instance = container.load_by_name("cont::Clock", false).unwrap();
        assert_eq!(instance.concrete_info().short_name(), "SystemClock");
    }

    #[test]
    #[traced_test]
    fn test_override_takes_precedence() {
        let container = Container::new();
        container.set_override::<dyn Clock, FakeClock>();

        let clock = container.get::<dyn Clock>().unwrap();
        assert_eq!(clock.lock().now(), 2);
    }

    #[test]
    #[traced_test]
    fn test_override_roundtrip_restores_default() {
        let container = Container::new();

        container.set_override::<dyn Clock, FakeClock>();
        container.remove_override::<dyn Clock>();

        let clock = container.get::<dyn Clock>().unwrap();
        assert_eq!(clock.lock().now(), 1);
    }

    static CREATION_STAMP: AtomicU8 = AtomicU8::new(0);

    #[derive(Default)]
    struct Tuner {
        stamp: u8,
    }
    impl Component for Tuner {
        fn construct(&mut self) {
            self.stamp = CREATION_STAMP.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Antenna {
        stamp: u8,
    }
    impl Component for Antenna {
        fn construct(&mut self) {
            self.stamp = CREATION_STAMP.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Receiver {
        tuner: Slot<Tuner>,
    }
    impl Component for Receiver {}

    #[derive(Default)]
    struct Radio {
        receiver: Receiver,
        antenna: Slot<Antenna>,
        saw_slots: bool,
    }
    impl Component for Radio {
        fn construct(&mut self) {
            self.saw_slots = self.receiver.tuner.is_filled() && self.antenna.is_filled();
        }
    }

    component! { Tuner { name: "cont::Tuner" } }
    component! { Antenna { name: "cont::Antenna" } }
    component! { Receiver { name: "cont::Receiver", slots: [tuner: Tuner] } }
    component! {
        Radio {
            name: "cont::Radio",
            extends: receiver: Receiver,
            slots: [antenna: Antenna],
        }
    }

    #[test]
    #[traced_test]
    fn test_ancestor_slots_injected_first() {
        let container = Container::new();

        let radio = container.get::<Radio>().unwrap();
        let radio = radio.lock();

        assert!(radio.saw_slots);
        let tuner_stamp = radio.receiver.tuner.get().lock().stamp;
        let antenna_stamp = radio.antenna.get().lock().stamp;
        assert!(tuner_stamp < antenna_stamp);
    }

    trait HasActivity: Send {}

    #[derive(Default)]
    struct Walker;
    impl Component for Walker {}
    impl HasActivity for Walker {}

    #[derive(Default)]
    struct Runner;
    impl Component for Runner {}
    impl HasActivity for Runner {}

    component! { Walker { name: "cont::Walker", capabilities: [dyn HasActivity] } }
    component! { Runner { name: "cont::Runner", capabilities: [dyn HasActivity] } }
    capability! { dyn HasActivity, name: "cont::HasActivity" }

    #[test]
    #[traced_test]
    fn test_hook_fires_once_per_resolution() {
        let container = Container::new();
        let fired = Arc::new(AtomicU8::new(0));

        container.add_initializer::<dyn HasActivity>({
            let fired = fired.clone();
            move |_instance| {
                fired.fetch_add(1, Ordering::SeqCst);
            }
        });

        let _ = container.get::<Walker>().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let _ = container.get::<Runner>().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_hook_replaced_on_second_registration() {
        let container = Container::new();
        let first = Arc::new(AtomicU8::new(0));
        let second = Arc::new(AtomicU8::new(0));

        container.add_initializer::<dyn HasActivity>({
            let first = first.clone();
            move |_instance| {
                first.fetch_add(1, Ordering::SeqCst);
            }
        });
        container.add_initializer::<dyn HasActivity>({
            let second = second.clone();
            move |_instance| {
                second.fetch_add(1, Ordering::SeqCst);
            }
        });

        let _ = container.get::<Walker>().unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_hook_registered_after_first_resolution_applies() {
        let container = Container::new();
        let fired = Arc::new(AtomicU8::new(0));

        let _ = container.get::<Walker>().unwrap();

        container.add_initializer::<dyn HasActivity>({
            let fired = fired.clone();
            move |_instance| {
                fired.fetch_add(1, Ordering::SeqCst);
            }
        });

        let _ = container.get::<Walker>().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[derive(Default)]
    struct Ping {
        pong: Slot<Pong>,
    }
    impl Component for Ping {}

    #[derive(Default)]
    struct Pong {
        ping: Slot<Ping>,
    }
    impl Component for Pong {}

    component! { Ping { name: "cont::Ping", shared, slots: [pong: Pong] } }
    component! { Pong { name: "cont::Pong", shared, slots: [ping: Ping] } }

    #[test]
    #[traced_test]
    fn test_shared_cycle_terminates() {
        let container = Container::new();

        let ping = container.get::<Ping>().unwrap();
        let pong = container.get::<Pong>().unwrap();

        assert!(Arc::ptr_eq(&ping.lock().pong.get(), &pong));
        assert!(Arc::ptr_eq(&pong.lock().ping.get(), &ping));
    }

    trait Route: Send {
        fn hops(&self) -> u8;
    }

    #[derive(Default)]
    struct DirectRoute;
    impl Component for DirectRoute {}
    impl Route for DirectRoute {
        fn hops(&self) -> u8 {
            1
        }
    }

    #[derive(Default)]
    struct RelayRoute;
    impl Component for RelayRoute {}
    impl Route for RelayRoute {
        fn hops(&self) -> u8 {
            3
        }
    }

    component! { DirectRoute { name: "cont::DirectRoute", capabilities: [dyn Route] } }
    component! { RelayRoute { name: "cont::RelayRoute", capabilities: [dyn Route] } }
    capability! { dyn Route, name: "cont::Route" }

    #[test]
    #[traced_test]
    fn test_override_chain_composes() {
        let container = Container::new();

        container.set_override::<dyn Route, DirectRoute>();
        container.set_override::<DirectRoute, RelayRoute>();

        let route = container.get::<dyn Route>().unwrap();
        assert_eq!(route.lock().hops(), 3);
    }

    #[test]
    #[traced_test]
    fn test_unresolvable_abstract() {
        trait Orphan: Send + std::fmt::Debug {}
        capability! { dyn Orphan, name: "cont::Orphan" }

        let container = Container::new();
        let err = container.get::<dyn Orphan>().unwrap_err();
        assert!(matches!(err, ResolveErrorKind::UnresolvableAbstract(_)));
    }

    #[derive(Default)]
    struct HostOwned {
        bus: Slot<Bus>,
    }
    impl Component for HostOwned {}
    component! { HostOwned { name: "cont::HostOwned", slots: [bus: Bus] } }

    #[test]
    #[traced_test]
    fn test_resolve_into_injects_only() {
        let container = Container::new();

        let mut target = HostOwned::default();
        container.resolve_into(&mut target).unwrap();

        assert!(target.bus.is_filled());
        let from_container = container.get::<Bus>().unwrap();
        assert!(Arc::ptr_eq(&target.bus.get(), &from_container));
    }

    #[test]
    #[traced_test]
    fn test_retained_roots_accumulate() {
        let container = Container::new();

        let _ = container.load::<Bus>(true).unwrap();
        let _ = container.load::<Bus>(false).unwrap();
        let _ = container.load::<Bus>(true).unwrap();

        assert_eq!(container.retained_len(), 2);
    }

    #[derive(Default)]
    struct Pool;
    impl Component for Pool {}

    #[derive(Default)]
    struct ReadPool {
        pool: Pool,
    }
    impl Component for ReadPool {}

    #[derive(Default)]
    struct WritePool {
        pool: Pool,
    }
    impl Component for WritePool {}

    component! { Pool { name: "cont::Pool", shared } }
    component! { ReadPool { name: "cont::ReadPool", extends: pool: Pool } }
    component! { WritePool { name: "cont::WritePool", extends: pool: Pool } }

    #[test]
    #[traced_test]
    fn test_shared_descendants_cache_separately() {
        let container = Container::new();

        assert!(container.is_shared::<ReadPool>());
        assert!(container.is_shared::<WritePool>());

        let read_1 = container.get::<ReadPool>().unwrap();
        let read_2 = container.get::<ReadPool>().unwrap();
        assert!(Arc::ptr_eq(&read_1, &read_2));

        // The cache key is the concrete type, so the two descendants of the
        // shared ancestor coexist as separate instances.
        let _ = container.get::<WritePool>().unwrap();
    }

    trait Upstream: Send {}
    capability! { dyn Upstream, name: "cont::Upstream" }

    #[derive(Default, Debug)]
    struct Gateway {
        upstream: Slot<dyn Upstream>,
    }
    impl Component for Gateway {}
    component! { Gateway { name: "cont::Gateway", shared, slots: [upstream: dyn Upstream] } }

    #[test]
    #[traced_test]
    fn test_failed_injection_leaves_published_shared_entry() {
        let container = Container::new();

        let err = container.get::<Gateway>().unwrap_err();
        assert!(matches!(err, ResolveErrorKind::UnresolvableAbstract(_)));

        // The instance published before injection stays cached; a later
        // request observes it with the slot unassigned.
        let gateway = container.get::<Gateway>().unwrap();
        assert!(!gateway.lock().upstream.is_filled());
    }

    #[test]
    fn test_ambient_container_is_published() {
        let _container = Container::new();
        assert!(Container::current().is_some());
    }
}
