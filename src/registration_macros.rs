/// Registers a concrete component with the assembly runtime.
///
/// The block names the component type and its registered name, followed by
/// optional keys in this order: `shared`, `extends`, `capabilities`, `slots`.
///
/// ```rust
/// use plugboard::{component, Component, Slot};
///
/// #[derive(Default)]
/// struct Telemetry;
/// impl Component for Telemetry {}
///
/// component! {
///     Telemetry { name: "Telemetry", shared }
/// }
///
/// trait Sink: Send {}
///
/// #[derive(Default)]
/// struct Recorder {
///     telemetry: Slot<Telemetry>,
/// }
/// impl Component for Recorder {}
/// impl Sink for Recorder {}
///
/// component! {
///     Recorder {
///         name: "Recorder",
///         capabilities: [dyn Sink],
///         slots: [telemetry: Telemetry],
///     }
/// }
/// ```
///
/// `extends: field: Base` embeds another registered component: the base's
/// slots are injected first and its sharing flag is inherited. The component
/// type must implement [`Component`](crate::Component) and `Default`;
/// capability traits must have `Send` as a supertrait.
#[macro_export]
macro_rules! component {
    ($ty:ident { name: $name:literal $(, $($rest:tt)*)? }) => {
        $crate::__component_internal!(@shared $ty, $name, [$($($rest)*)?]);
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __component_internal {
    (@shared $ty:ident, $name:literal, [shared $(, $($rest:tt)*)?]) => {
        $crate::__component_internal!(@extends $ty, $name, (shared), [$($($rest)*)?]);
    };
    (@shared $ty:ident, $name:literal, [$($rest:tt)*]) => {
        $crate::__component_internal!(@extends $ty, $name, (), [$($rest)*]);
    };

    (@extends $ty:ident, $name:literal, $shared:tt, [extends: $base_field:ident: $base_ty:ty $(, $($rest:tt)*)?]) => {
        $crate::__component_internal!(@caps $ty, $name, $shared, ($base_field, $base_ty), [$($($rest)*)?]);
    };
    (@extends $ty:ident, $name:literal, $shared:tt, [$($rest:tt)*]) => {
        $crate::__component_internal!(@caps $ty, $name, $shared, (), [$($rest)*]);
    };

    (@caps $ty:ident, $name:literal, $shared:tt, $base:tt, [capabilities: [$(dyn $cap:path),* $(,)?] $(, $($rest:tt)*)?]) => {
        $crate::__component_internal!(@slots $ty, $name, $shared, $base, [$($cap),*], [$($($rest)*)?]);
    };
    (@caps $ty:ident, $name:literal, $shared:tt, $base:tt, [$($rest:tt)*]) => {
        $crate::__component_internal!(@slots $ty, $name, $shared, $base, [], [$($rest)*]);
    };

    (@slots $ty:ident, $name:literal, $shared:tt, $base:tt, $caps:tt, [slots: [$($slot:ident: $slot_ty:ty),* $(,)?] $(,)?]) => {
        $crate::__component_internal!(@emit $ty, $name, $shared, $base, $caps, [$($slot: $slot_ty),*]);
    };
    (@slots $ty:ident, $name:literal, $shared:tt, $base:tt, $caps:tt, [$(,)?]) => {
        $crate::__component_internal!(@emit $ty, $name, $shared, $base, $caps, []);
    };

    (@emit $ty:ident, $name:literal, ($($shared:ident)?), (), [$($cap:path),*], [$($slot:ident: $slot_ty:ty),*]) => {
        const _: () = {
            impl $crate::Assemble for $ty {
                fn assign(
                    &mut self,
                    owner: ::core::any::TypeId,
                    slot: &'static str,
                    value: ::std::boxed::Box<dyn ::core::any::Any>,
                ) -> ::core::result::Result<(), $crate::InjectErrorKind> {
                    let _ = &value;
                    if owner == ::core::any::TypeId::of::<$ty>() {
                        $(
                            if slot == ::core::stringify!($slot) {
                                self.$slot.fill($crate::registration::downcast_slot::<$slot_ty>(
                                    ::core::any::type_name::<$ty>(),
                                    slot,
                                    value,
                                )?);
                                return ::core::result::Result::Ok(());
                            }
                        )*
                    }
                    ::core::result::Result::Err($crate::InjectErrorKind::UnknownSlot {
                        owner: ::core::any::type_name::<$ty>(),
                        slot,
                    })
                }
            }

            #[$crate::registration::distributed_slice($crate::registration::__TYPE_ENTRIES)]
            #[linkme(crate = $crate::registration::linkme)]
            static __PLUGBOARD_ENTRY: fn() -> $crate::registration::TypeEntry = || {
                $crate::registration::TypeEntry::concrete::<$ty>($name)
                    $( .$shared() )?
                    $(
                        .caster_for::<dyn $cap>(|erased| {
                            let view: $crate::Handle<dyn $cap> =
                                $crate::registration::downcast_instance::<$ty>(erased);
                            ::std::boxed::Box::new(view)
                        })
                    )*
                    $( .slot::<$slot_ty>(::core::stringify!($slot)) )*
            };
        };
    };

    (@emit $ty:ident, $name:literal, ($($shared:ident)?), ($base_field:ident, $base_ty:ty), [$($cap:path),*], [$($slot:ident: $slot_ty:ty),*]) => {
        const _: () = {
            impl $crate::Assemble for $ty {
                fn assign(
                    &mut self,
                    owner: ::core::any::TypeId,
                    slot: &'static str,
                    value: ::std::boxed::Box<dyn ::core::any::Any>,
                ) -> ::core::result::Result<(), $crate::InjectErrorKind> {
                    if owner != ::core::any::TypeId::of::<$ty>() {
                        return $crate::Assemble::assign(&mut self.$base_field, owner, slot, value);
                    }
                    $(
                        if slot == ::core::stringify!($slot) {
                            self.$slot.fill($crate::registration::downcast_slot::<$slot_ty>(
                                ::core::any::type_name::<$ty>(),
                                slot,
                                value,
                            )?);
                            return ::core::result::Result::Ok(());
                        }
                    )*
                    ::core::result::Result::Err($crate::InjectErrorKind::UnknownSlot {
                        owner: ::core::any::type_name::<$ty>(),
                        slot,
                    })
                }
            }

            #[$crate::registration::distributed_slice($crate::registration::__TYPE_ENTRIES)]
            #[linkme(crate = $crate::registration::linkme)]
            static __PLUGBOARD_ENTRY: fn() -> $crate::registration::TypeEntry = || {
                $crate::registration::TypeEntry::concrete::<$ty>($name)
                    $( .$shared() )?
                    .extends::<$base_ty>()
                    $(
                        .caster_for::<dyn $cap>(|erased| {
                            let view: $crate::Handle<dyn $cap> =
                                $crate::registration::downcast_instance::<$ty>(erased);
                            ::std::boxed::Box::new(view)
                        })
                    )*
                    $( .slot::<$slot_ty>(::core::stringify!($slot)) )*
            };
        };
    };
}

/// Registers an abstract capability (`dyn Trait`), optionally with the
/// concrete component used when the capability is requested and no override
/// is in place.
///
/// ```rust
/// use plugboard::{capability, component, Component};
///
/// trait Clock: Send {
///     fn now(&self) -> u64;
/// }
///
/// #[derive(Default)]
/// struct SystemClock;
/// impl Component for SystemClock {}
/// impl Clock for SystemClock {
///     fn now(&self) -> u64 {
///         0
///     }
/// }
///
/// component! {
///     SystemClock { name: "SystemClock", capabilities: [dyn Clock] }
/// }
///
/// capability! {
///     dyn Clock, name: "Clock", default: SystemClock
/// }
/// ```
#[macro_export]
macro_rules! capability {
    (dyn $cap:path, name: $name:literal $(,)?) => {
        const _: () = {
            #[$crate::registration::distributed_slice($crate::registration::__TYPE_ENTRIES)]
            #[linkme(crate = $crate::registration::linkme)]
            static __PLUGBOARD_ENTRY: fn() -> $crate::registration::TypeEntry =
                || $crate::registration::TypeEntry::capability::<dyn $cap>($name);
        };
    };
    (dyn $cap:path, name: $name:literal, default: $default:ty $(,)?) => {
        const _: () = {
            #[$crate::registration::distributed_slice($crate::registration::__TYPE_ENTRIES)]
            #[linkme(crate = $crate::registration::linkme)]
            static __PLUGBOARD_ENTRY: fn() -> $crate::registration::TypeEntry = || {
                $crate::registration::TypeEntry::capability::<dyn $cap>($name).default_impl::<$default>()
            };
        };
    };
}
