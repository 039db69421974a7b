//! Compatibility wrapper for modules following the older functional convention.
//!
//! A legacy module defines `set_host`, `initialize` and one or more accessor
//! functions returning its operation map. [`LegacyModule::probe`] finds them
//! in a fixed priority order and wraps them as a [`Capability`].

use crate::capability::{Capability, InitContext};
use crate::error::ModuleError;
use crate::unit::{AccessorFn, InitializeFn, ModuleUnit, SetHostFn, GENERIC_ACCESSOR_FN};
use mtk_host::OperationMap;

/// Environment precondition for a legacy module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvRequirement {
    /// Always valid.
    None,
    /// The named variable must be set to a non-empty value.
    Variable(&'static str),
}

impl EnvRequirement {
    /// Check against the process environment.
    pub fn is_satisfied(&self) -> bool {
        self.satisfied_by(|key| std::env::var(key).ok())
    }

    /// Check against an arbitrary variable lookup.
    pub fn satisfied_by(&self, lookup: impl Fn(&str) -> Option<String>) -> bool {
        match self {
            Self::None => true,
            Self::Variable(key) => lookup(key).is_some_and(|value| !value.is_empty()),
        }
    }
}

/// Known requirements, keyed by module name. Unlisted modules are accepted.
const ENV_RULES: &[(&str, EnvRequirement)] = &[
    ("news_api", EnvRequirement::Variable("NEWS_API_KEY")),
    ("fred", EnvRequirement::Variable("FRED_API_KEY")),
    ("worldbank", EnvRequirement::None),
];

/// Environment requirement for a legacy module name.
pub fn env_requirement(module: &str) -> EnvRequirement {
    ENV_RULES
        .iter()
        .find(|(name, _)| *name == module)
        .map(|(_, requirement)| *requirement)
        .unwrap_or(EnvRequirement::None)
}

/// Accessor names to probe for `module`, highest priority first.
pub fn accessor_candidates(module: &str) -> Vec<String> {
    let stripped: String = module.chars().filter(|c| c.is_alphanumeric()).collect();
    let mut candidates = vec![format!("get_{module}_tools")];
    for name in [format!("get_{stripped}_tools"), GENERIC_ACCESSOR_FN.to_string()] {
        if !candidates.contains(&name) {
            candidates.push(name);
        }
    }
    candidates
}

/// `news_api` -> `News Api`
fn display_name(module: &str) -> String {
    module
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// A legacy module adapted to the capability surface.
pub struct LegacyModule {
    module: String,
    name: String,
    description: String,
    set_host: SetHostFn,
    initialize: InitializeFn,
    accessors: Vec<(String, AccessorFn)>,
    dependencies: Vec<String>,
    requirement: EnvRequirement,
}

impl std::fmt::Debug for LegacyModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyModule")
            .field("module", &self.module)
            .field("accessors", &self.accessor_names())
            .field("dependencies", &self.dependencies)
            .field("requirement", &self.requirement)
            .finish()
    }
}

impl LegacyModule {
    /// Wrap `unit` if it follows the legacy convention.
    ///
    /// Requires both the `set_host` and `initialize` functions. Accessors that
    /// exist are kept in priority order; which one supplies the operations is
    /// decided when [`operations`](Capability::operations) is called.
    pub fn probe(module: &str, unit: &ModuleUnit) -> Option<Self> {
        let set_host = unit.set_host()?;
        let initialize = unit.initializer()?;
        let accessors = accessor_candidates(module)
            .into_iter()
            .filter_map(|name| unit.accessor(&name).map(|accessor| (name, accessor)))
            .collect();

        Some(Self {
            module: module.to_string(),
            name: display_name(module),
            description: format!("Legacy tool: {module}"),
            set_host,
            initialize,
            accessors,
            dependencies: unit.dependencies().to_vec(),
            requirement: env_requirement(module),
        })
    }

    /// Module name the wrapper was built for.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Accessors found on the unit, highest priority first.
    pub fn accessor_names(&self) -> Vec<&str> {
        self.accessors.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// The accessor currently supplying operations, if any yields a non-empty map.
    pub fn active_accessor(&self) -> Option<&str> {
        self.accessors
            .iter()
            .find(|(_, accessor)| !accessor().is_empty())
            .map(|(name, _)| name.as_str())
    }

    pub fn requirement(&self) -> EnvRequirement {
        self.requirement
    }
}

impl Capability for LegacyModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn operations(&self) -> OperationMap {
        self.accessors
            .iter()
            .map(|(_, accessor)| accessor())
            .find(|operations| !operations.is_empty())
            .unwrap_or_default()
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    fn initialize(&mut self, ctx: &InitContext) -> Result<(), ModuleError> {
        (self.set_host)(ctx.host.clone());
        (self.initialize)(ctx)
    }

    fn validate_environment(&self) -> bool {
        let valid = self.requirement.is_satisfied();
        if !valid {
            tracing::debug!(module = %self.module, requirement = ?self.requirement, "legacy module requirement not met");
        }
        valid
    }
}
