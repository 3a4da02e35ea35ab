//! Declarative assembly: instantiates components and registers overrides
//! defined in a YAML document.
//!
//! The document has up to three optional sections, processed as overrides,
//! then services, then plugins, regardless of their textual order:
//!
//! ```yaml
//! overrides:
//!   - capability: Places
//!     target: MockPlaces
//! services:
//!   - name: Locator
//! plugins:
//!   - name: Renderer
//! ```
//!
//! Services and plugins are resolved identically; the two sections exist for
//! the document author. Directive names are resolved under the container's
//! name roots.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use serde::Deserialize;
use tracing::{error, warn};

use crate::{
    container::Container,
    errors::{ConfigErrorKind, ResolveErrorKind},
};

/// Raw shape of the assembly document. Unknown sections are ignored;
/// directives with missing attributes are skipped at load time.
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AssemblyDoc {
    #[serde(default)]
    pub overrides: Vec<OverrideDirective>,
    #[serde(default)]
    pub services: Vec<ComponentDirective>,
    #[serde(default)]
    pub plugins: Vec<ComponentDirective>,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
pub struct OverrideDirective {
    #[serde(default)]
    pub capability: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
pub struct ComponentDirective {
    #[serde(default)]
    pub name: Option<String>,
}

/// Parses a document without applying it.
#[allow(clippy::missing_errors_doc)]
pub fn parse_str(contents: &str) -> Result<AssemblyDoc, ConfigErrorKind> {
    Ok(serde_yaml::from_str(contents)?)
}

/// Loads all overrides and components defined in the provided YAML string.
///
/// Returns `Ok(true)` iff at least one component was instantiated and
/// retained, `Ok(false)` when the document is malformed (nothing is loaded),
/// and an error when assembly itself fails.
#[allow(clippy::missing_errors_doc)]
pub fn load_str(container: &Container, contents: &str) -> Result<bool, ResolveErrorKind> {
    match parse_str(contents) {
        Ok(doc) => load_document(container, &doc),
        Err(err) => {
            error!("{err}");
            Ok(false)
        }
    }
}

/// Loads assembly directives from a YAML input stream.
#[allow(clippy::missing_errors_doc)]
pub fn load_reader(container: &Container, reader: impl Read) -> Result<bool, ResolveErrorKind> {
    match serde_yaml::from_reader(reader) {
        Ok(doc) => load_document(container, &doc),
        Err(err) => {
            let err = ConfigErrorKind::Parse(err);
            error!("{err}");
            Ok(false)
        }
    }
}

/// Loads the provided YAML file and the components defined in it. A missing
/// or unreadable file reports failure with nothing loaded; the container
/// stays usable.
#[allow(clippy::missing_errors_doc)]
pub fn load_file(container: &Container, path: impl AsRef<Path>) -> Result<bool, ResolveErrorKind> {
    match File::open(path.as_ref()) {
        Ok(file) => load_reader(container, BufReader::new(file)),
        Err(err) => {
            let err = ConfigErrorKind::Io(err);
            error!("{err}");
            Ok(false)
        }
    }
}

/// Applies a parsed document: overrides first, then every service and plugin
/// in source order, each loaded with `retain`.
#[allow(clippy::missing_errors_doc)]
pub fn load_document(container: &Container, doc: &AssemblyDoc) -> Result<bool, ResolveErrorKind> {
    for directive in &doc.overrides {
        match (&directive.capability, &directive.target) {
            (Some(capability), Some(target)) => container.set_override_by_name(capability, target)?,
            _ => warn!("Override directive missing capability or target, skipped"),
        }
    }

    let mut any_loaded = false;
    for directive in doc.services.iter().chain(&doc.plugins) {
        let Some(name) = &directive.name else {
            warn!("Component directive missing name, skipped");
            continue;
        };
        container.load_by_name(name, true)?;
        any_loaded = true;
    }
    Ok(any_loaded)
}
