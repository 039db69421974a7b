//! Registration outcomes and the status snapshot surfaced to diagnostics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What happened to one module during a registration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    Disabled,
    Failed(String),
    /// Not a tool; nothing recorded.
    Ignored,
}

impl RegistrationOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for RegistrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => f.write_str("registered"),
            Self::Disabled => f.write_str("disabled"),
            Self::Failed(message) => write!(f, "failed: {message}"),
            Self::Ignored => f.write_str("ignored"),
        }
    }
}

/// One registered module as reported by diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleReport {
    pub name: String,
    pub display_name: String,
    pub description: String,
    /// Operation name -> description.
    pub operations: BTreeMap<String, String>,
    pub resources: Vec<String>,
    pub dependencies: Vec<String>,
}

/// Snapshot of the registry's status tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryStatus {
    pub registered: Vec<ModuleReport>,
    /// Module name -> diagnostic.
    pub failed: BTreeMap<String, String>,
    pub disabled: Vec<String>,
    pub total_operations: usize,
    /// Distinct entries in the host's aggregate dependency list.
    pub total_dependencies: usize,
}

impl RegistryStatus {
    pub fn registered_names(&self) -> Vec<&str> {
        self.registered.iter().map(|report| report.name.as_str()).collect()
    }

    pub fn module(&self, name: &str) -> Option<&ModuleReport> {
        self.registered.iter().find(|report| report.name == name)
    }

    /// Plain-text summary for terminals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{} module(s) registered, {} operation(s), {} dependency(ies)\n",
            self.registered.len(),
            self.total_operations,
            self.total_dependencies
        ));
        for report in &self.registered {
            out.push_str(&format!(
                "\n  {} ({})\n    {}\n",
                report.name, report.display_name, report.description
            ));
            for (operation, description) in &report.operations {
                out.push_str(&format!("    - {operation}: {description}\n"));
            }
            for pattern in &report.resources {
                out.push_str(&format!("    - resource {pattern}\n"));
            }
        }
        if !self.failed.is_empty() {
            out.push_str("\nFailed:\n");
            for (name, diagnostic) in &self.failed {
                out.push_str(&format!("  {name}: {diagnostic}\n"));
            }
        }
        if !self.disabled.is_empty() {
            out.push_str(&format!("\nDisabled: {}\n", self.disabled.join(", ")));
        }
        out
    }
}
