//! Compiled-in table of module resolvers, keyed by unit name.

use crate::error::{contain, ModuleError};
use crate::scanner::ModuleDescriptor;
use crate::unit::ModuleUnit;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Produces a module's unit, or fails when the module cannot be loaded here.
pub type ModuleResolver = Arc<dyn Fn() -> Result<ModuleUnit, ModuleError> + Send + Sync>;

/// Every module this build knows how to resolve.
///
/// Discovery yields names; the catalog turns a name into a [`ModuleUnit`].
/// A name with no catalog entry is not a tool and is ignored.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    entries: BTreeMap<String, ModuleResolver>,
}

impl std::fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the resolver for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, resolver: F)
    where
        F: Fn() -> Result<ModuleUnit, ModuleError> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(resolver));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn() -> Result<ModuleUnit, ModuleError> + Send + Sync + 'static,
    {
        self.register(name, resolver);
        self
    }

    /// Add every entry of `other`, replacing entries with the same name.
    pub fn merge(&mut self, other: ModuleCatalog) {
        self.entries.extend(other.entries);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Known module names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors for every catalog entry, for hosts without a modules directory.
    pub fn descriptors(&self) -> Vec<ModuleDescriptor> {
        self.entries.keys().map(ModuleDescriptor::builtin).collect()
    }

    /// Resolve a module by name.
    ///
    /// Returns `None` for names the catalog does not know. A resolver that
    /// errors or panics yields `Some(Err(..))` carrying the diagnostic.
    pub fn resolve(&self, name: &str) -> Option<Result<ModuleUnit, String>> {
        let resolver = self.entries.get(name)?;
        Some(contain(|| resolver()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ModuleLocation;

    fn catalog() -> ModuleCatalog {
        ModuleCatalog::new()
            .with("alpha", || Ok(ModuleUnit::new()))
            .with("broken", || {
                Err(ModuleError::Resolution("missing client library".to_string()))
            })
            .with("explodes", || panic!("bad static init"))
    }

    #[test]
    fn test_names_sorted() {
        assert_eq!(catalog().names(), vec!["alpha", "broken", "explodes"]);
        assert!(catalog().contains("alpha"));
        assert!(!catalog().contains("gamma"));
    }

    #[test]
    fn test_resolve_outcomes() {
        let catalog = catalog();
        assert!(catalog.resolve("gamma").is_none());
        assert!(matches!(catalog.resolve("alpha"), Some(Ok(_))));
        assert_eq!(
            catalog.resolve("broken").unwrap().unwrap_err(),
            "missing client library"
        );
        assert!(catalog
            .resolve("explodes")
            .unwrap()
            .unwrap_err()
            .contains("bad static init"));
    }

    #[test]
    fn test_merge_and_descriptors() {
        let mut base = ModuleCatalog::new().with("alpha", || Ok(ModuleUnit::new()));
        base.merge(ModuleCatalog::new().with("beta", || Ok(ModuleUnit::new())));

        let descriptors = base.descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[1].name(), "beta");
        assert_eq!(descriptors[1].location(), &ModuleLocation::Builtin);
    }
}
