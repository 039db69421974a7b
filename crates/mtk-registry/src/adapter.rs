//! Turns a discovered module into a capability object.

use crate::capability::Capability;
use crate::catalog::ModuleCatalog;
use crate::error::contain;
use crate::legacy::LegacyModule;
use crate::scanner::ModuleDescriptor;
use crate::unit::{CapabilityType, ModuleUnit};

/// Result of adapting one module.
pub enum Adaptation {
    /// The module yielded a capability object.
    Adapted(Box<dyn Capability>),
    /// The module could not be resolved or instantiated.
    Failed(String),
    /// The module is not a tool.
    NotATool,
}

impl std::fmt::Debug for Adaptation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Adapted(capability) => f.debug_tuple("Adapted").field(&capability.name()).finish(),
            Self::Failed(message) => f.debug_tuple("Failed").field(message).finish(),
            Self::NotATool => f.write_str("NotATool"),
        }
    }
}

/// Resolves modules through a catalog and adapts what they expose.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityAdapter<'a> {
    catalog: &'a ModuleCatalog,
}

impl<'a> CapabilityAdapter<'a> {
    pub fn new(catalog: &'a ModuleCatalog) -> Self {
        Self { catalog }
    }

    /// Resolve and adapt one module.
    ///
    /// Names unknown to the catalog are not tools. A resolver failure, or a
    /// panic while instantiating the selected capability type, is a failure.
    pub fn adapt(&self, descriptor: &ModuleDescriptor) -> Adaptation {
        let name = descriptor.name();
        let unit = match self.catalog.resolve(name) {
            None => {
                tracing::debug!(module = name, "no catalog entry, not a tool");
                return Adaptation::NotATool;
            }
            Some(Err(message)) => {
                tracing::warn!(module = name, error = %message, "module resolution failed");
                return Adaptation::Failed(message);
            }
            Some(Ok(unit)) => unit,
        };
        adapt_unit(name, &unit)
    }
}

/// Adapt an already-resolved unit.
pub fn adapt_unit(module: &str, unit: &ModuleUnit) -> Adaptation {
    if let Some(capability_type) = select_capability_type(module, unit.capability_types()) {
        tracing::debug!(module, capability = capability_type.type_name(), "found capability type");
        return match contain(|| Ok(capability_type.instantiate())) {
            Ok(capability) => Adaptation::Adapted(capability),
            Err(message) => Adaptation::Failed(message),
        };
    }

    match LegacyModule::probe(module, unit) {
        Some(legacy) => {
            tracing::debug!(module, accessors = ?legacy.accessor_names(), "adapted legacy module");
            Adaptation::Adapted(Box::new(legacy))
        }
        None => {
            tracing::debug!(module, "no capability type or legacy hooks, not a tool");
            Adaptation::NotATool
        }
    }
}

/// Pick the capability type for `module`.
///
/// A single type is taken as is. Among several, the first whose name matches
/// the module name ignoring case and underscores wins, else the first defined.
pub fn select_capability_type<'u>(
    module: &str,
    types: &'u [CapabilityType],
) -> Option<&'u CapabilityType> {
    if types.len() > 1 {
        let wanted = normalize(module);
        if let Some(matching) = types.iter().find(|t| normalize(t.type_name()) == wanted) {
            return Some(matching);
        }
    }
    types.first()
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModuleError;
    use mtk_host::OperationMap;

    struct Named(&'static str);

    impl Capability for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "named"
        }
        fn operations(&self) -> OperationMap {
            OperationMap::new()
        }
    }

    fn adapted_name(adaptation: Adaptation) -> String {
        match adaptation {
            Adaptation::Adapted(capability) => capability.name().to_string(),
            other => panic!("expected a capability, got {other:?}"),
        }
    }

    #[test]
    fn test_prefers_type_matching_module_name() {
        let unit = ModuleUnit::new()
            .with_capability("HttpClient", || Named("HttpClient"))
            .with_capability("WebFetch", || Named("WebFetch"));
        assert_eq!(adapted_name(adapt_unit("web_fetch", &unit)), "WebFetch");
    }

    #[test]
    fn test_falls_back_to_first_type() {
        let unit = ModuleUnit::new()
            .with_capability("First", || Named("First"))
            .with_capability("Second", || Named("Second"));
        assert_eq!(adapted_name(adapt_unit("other", &unit)), "First");
    }

    #[test]
    fn test_capability_type_beats_legacy_hooks() {
        let unit = ModuleUnit::new()
            .with_capability("Only", || Named("Only"))
            .with_set_host(|_| {})
            .with_initialize(|_| Ok(()));
        assert_eq!(adapted_name(adapt_unit("only", &unit)), "Only");
    }

    #[test]
    fn test_legacy_convention() {
        let unit = ModuleUnit::new()
            .with_set_host(|_| {})
            .with_initialize(|_| Ok(()));
        assert_eq!(adapted_name(adapt_unit("news_api", &unit)), "News Api");
    }

    #[test]
    fn test_helper_unit_is_not_a_tool() {
        let unit = ModuleUnit::new().with_accessor("get_tools", OperationMap::new);
        assert!(matches!(adapt_unit("helpers", &unit), Adaptation::NotATool));
    }

    #[test]
    fn test_catalog_outcomes() {
        let catalog = ModuleCatalog::new()
            .with("alpha", || Ok(ModuleUnit::new().with_capability("Alpha", || Named("Alpha"))))
            .with("broken", || Err(ModuleError::Resolution("no such crate".to_string())))
            .with("faulty", || {
                Ok(ModuleUnit::new().with_capability("Faulty", || -> Named { panic!("ctor") }))
            });
        let adapter = CapabilityAdapter::new(&catalog);

        assert_eq!(
            adapted_name(adapter.adapt(&ModuleDescriptor::builtin("alpha"))),
            "Alpha"
        );
        assert!(matches!(
            adapter.adapt(&ModuleDescriptor::builtin("gamma")),
            Adaptation::NotATool
        ));
        match adapter.adapt(&ModuleDescriptor::builtin("broken")) {
            Adaptation::Failed(message) => assert_eq!(message, "no such crate"),
            other => panic!("expected failure, got {other:?}"),
        }
        match adapter.adapt(&ModuleDescriptor::builtin("faulty")) {
            Adaptation::Failed(message) => assert!(message.contains("ctor")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
