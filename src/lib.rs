pub(crate) mod any;
pub(crate) mod cache;
pub(crate) mod component;
pub(crate) mod container;
pub(crate) mod errors;
pub(crate) mod initializer;
pub(crate) mod loader;
pub(crate) mod metadata;
pub(crate) mod overrides;
pub(crate) mod registry;
pub(crate) mod service;

pub mod registration;
mod registration_macros;

pub use any::TypeInfo;
pub use component::{Assemble, Component, Erased, Handle, Lock, Slot};
pub use container::{Container, Instance};
pub use errors::{ConfigErrorKind, InjectErrorKind, ResolveErrorKind};
pub use initializer::Initializer;
pub use loader::{load_document, load_file, load_reader, load_str, parse_str, AssemblyDoc, ComponentDirective, OverrideDirective};
pub use registry::NameRoots;
