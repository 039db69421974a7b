//! The uniform capability surface every integration module is adapted to.

use crate::error::ModuleError;
use mtk_core::ModuleOptions;
use mtk_host::{HostHandle, OperationMap, ResourceMap};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Everything a module receives when it is initialized.
#[derive(Clone)]
pub struct InitContext {
    /// Module name (the unit name the scanner reported).
    pub module: String,
    /// The host runtime the module's operations are bound into.
    pub host: HostHandle,
    /// Global init params merged with the module's configured options.
    pub options: ModuleOptions,
}

impl std::fmt::Debug for InitContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitContext")
            .field("module", &self.module)
            .field("options", &self.options)
            .finish()
    }
}

impl InitContext {
    /// Build a context for `module`.
    pub fn new(module: impl Into<String>, host: HostHandle, options: ModuleOptions) -> Self {
        Self {
            module: module.into(),
            host,
            options,
        }
    }

    /// Decode a single option, `None` when absent or of the wrong shape.
    pub fn option<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.options.get(key)?.clone();
        serde_json::from_value(value).ok()
    }

    /// Decode the whole option bag into a typed settings struct.
    pub fn options_as<T: DeserializeOwned>(&self) -> Result<T, ModuleError> {
        Ok(serde_json::from_value(Value::Object(self.options.clone()))?)
    }
}

/// A tool module as the registry sees it.
///
/// Only [`name`](Capability::name), [`description`](Capability::description)
/// and [`operations`](Capability::operations) are required; the remaining
/// members default to "nothing to do".
pub trait Capability: Send + Sync {
    /// Human-readable name.
    fn name(&self) -> &str;

    /// One-line description.
    fn description(&self) -> &str;

    /// Operations this module exposes, keyed by the name they are bound under.
    fn operations(&self) -> OperationMap;

    /// Resource providers keyed by URI pattern.
    fn resources(&self) -> ResourceMap {
        ResourceMap::new()
    }

    /// External dependency names, informational only.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called exactly once, after environment validation and before binding.
    fn initialize(&mut self, _ctx: &InitContext) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Called at most once, when the registry shuts down or replaces the module.
    fn cleanup(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Whether the process environment can support this module.
    fn validate_environment(&self) -> bool {
        true
    }
}

// Compile-time check: Capability must be object-safe
const _: () = {
    fn _assert_object_safe(_: &dyn Capability) {}
};

#[cfg(test)]
mod tests {
    use super::*;
    use mtk_host::ToolServer;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Settings {
        timeout: u64,
        #[serde(default)]
        verbose: bool,
    }

    fn ctx(options: Value) -> InitContext {
        let options = match options {
            Value::Object(map) => map,
            _ => ModuleOptions::new(),
        };
        InitContext::new("sample", Arc::new(ToolServer::new()), options)
    }

    #[test]
    fn test_single_option() {
        let ctx = ctx(serde_json::json!({"timeout": 30, "name": "x"}));
        assert_eq!(ctx.option::<u64>("timeout"), Some(30));
        assert_eq!(ctx.option::<u64>("name"), None);
        assert_eq!(ctx.option::<String>("missing"), None);
    }

    #[test]
    fn test_options_as_struct() {
        let ctx = ctx(serde_json::json!({"timeout": 5}));
        let settings: Settings = ctx.options_as().unwrap();
        assert_eq!(
            settings,
            Settings {
                timeout: 5,
                verbose: false
            }
        );

        let bad = ctx_bad();
        assert!(bad.options_as::<Settings>().is_err());
    }

    fn ctx_bad() -> InitContext {
        ctx(serde_json::json!({"timeout": "soon"}))
    }
}
