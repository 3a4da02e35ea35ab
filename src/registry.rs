use ahash::AHashMap;
use tracing::warn;

use crate::{any::TypeInfo, errors::ResolveErrorKind, registration::__TYPE_ENTRIES};

/// Name prefixes prepended to textual directive names before lookup: one for
/// component directives, one for override directives. There is no fallback
/// across roots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameRoots {
    pub components: &'static str,
    pub overrides: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Root {
    Component,
    Override,
}

/// Resolves textual names to registered types under the configured roots.
pub(crate) struct TypeIndex {
    roots: NameRoots,
    by_name: AHashMap<&'static str, TypeInfo>,
    lookups: AHashMap<String, TypeInfo>,
}

impl TypeIndex {
    #[must_use]
    pub(crate) fn new(roots: NameRoots) -> Self {
        let mut by_name = AHashMap::new();
        for getter in __TYPE_ENTRIES.iter() {
            let entry = getter();
            if by_name.insert(entry.name, entry.info).is_some() {
                warn!(name = entry.name, "Duplicate registered name, last one wins");
            }
        }
        Self {
            roots,
            by_name,
            lookups: AHashMap::new(),
        }
    }

    /// Prepends the root prefix and resolves the full name, memoizing the
    /// result.
    pub(crate) fn lookup(&mut self, name: &str, root: Root) -> Result<TypeInfo, ResolveErrorKind> {
        let prefix = match root {
            Root::Component => self.roots.components,
            Root::Override => self.roots.overrides,
        };
        let full = format!("{prefix}{name}");

        if let Some(info) = self.lookups.get(&full) {
            return Ok(*info);
        }

        let Some(info) = self.by_name.get(full.as_str()).copied() else {
            return Err(ResolveErrorKind::TypeNotFound { name: full });
        };
        self.lookups.insert(full, info);
        Ok(info)
    }
}
