//! Decides from configuration whether a module is attempted, and with what options.

use mtk_core::{ModuleOptions, ToolkitConfig};

/// Whether to attempt a module.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Attempt the module with these configured options.
    Attempt(ModuleOptions),
    /// The module is disabled by configuration.
    Disabled,
}

/// Configuration gate over an optional [`ToolkitConfig`].
///
/// Without a configuration every module is attempted with no options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigurationGate<'a> {
    config: Option<&'a ToolkitConfig>,
}

impl<'a> ConfigurationGate<'a> {
    pub fn new(config: Option<&'a ToolkitConfig>) -> Self {
        Self { config }
    }

    /// A gate that lets every module through.
    pub fn open() -> Self {
        Self { config: None }
    }

    pub fn decide(&self, module: &str) -> GateDecision {
        match self.config {
            None => GateDecision::Attempt(ModuleOptions::new()),
            Some(config) if config.is_tool_enabled(module) => {
                GateDecision::Attempt(config.tool_options(module))
            }
            Some(_) => GateDecision::Disabled,
        }
    }
}

/// Layer a module's configured options over the global init params.
///
/// Keys set for the module win over global keys of the same name.
pub fn merge_options(globals: &ModuleOptions, module: ModuleOptions) -> ModuleOptions {
    let mut merged = globals.clone();
    merged.extend(module);
    merged
}
