//! The registry: runs the registration pass and owns the status tables.

use crate::adapter::{Adaptation, CapabilityAdapter};
use crate::capability::{Capability, InitContext};
use crate::catalog::ModuleCatalog;
use crate::error::contain;
use crate::gate::{merge_options, ConfigurationGate, GateDecision};
use crate::scanner::{ModuleDescriptor, ModuleScanner};
use crate::status::{ModuleReport, RegistrationOutcome, RegistryStatus};
use crate::validator::validate;
use mtk_core::{ModuleOptions, ToolkitConfig};
use mtk_host::HostHandle;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

struct LiveModule {
    capability: Box<dyn Capability>,
    operations: BTreeMap<String, String>,
    resources: Vec<String>,
    dependencies: Vec<String>,
}

/// Owns every module the host process registered, and what became of the rest.
///
/// A module name is in at most one of the live, failed and disabled tables.
/// Live modules are cleaned up when the registry is shut down or dropped.
pub struct Registry {
    host: HostHandle,
    catalog: ModuleCatalog,
    scanner: ModuleScanner,
    live: BTreeMap<String, LiveModule>,
    failed: BTreeMap<String, String>,
    disabled: BTreeSet<String>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("catalog", &self.catalog)
            .field("live", &self.live.keys().collect::<Vec<_>>())
            .field("failed", &self.failed)
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl Registry {
    pub fn new(host: HostHandle, catalog: ModuleCatalog) -> Self {
        Self {
            host,
            catalog,
            scanner: ModuleScanner::new(),
            live: BTreeMap::new(),
            failed: BTreeMap::new(),
            disabled: BTreeSet::new(),
        }
    }

    /// Use a custom scanner for [`register_directory`](Self::register_directory).
    pub fn with_scanner(mut self, scanner: ModuleScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn host(&self) -> &HostHandle {
        &self.host
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    /// Scan `dir` and register what it contains.
    pub fn register_directory(
        &mut self,
        dir: &Path,
        config: Option<&ToolkitConfig>,
        globals: &ModuleOptions,
    ) -> BTreeMap<String, RegistrationOutcome> {
        let descriptors = self.scanner.scan(dir);
        self.register_all(&descriptors, config, globals)
    }

    /// Register every module in the catalog.
    pub fn register_builtin(
        &mut self,
        config: Option<&ToolkitConfig>,
        globals: &ModuleOptions,
    ) -> BTreeMap<String, RegistrationOutcome> {
        let descriptors = self.catalog.descriptors();
        self.register_all(&descriptors, config, globals)
    }

    /// Run the registration pass over `descriptors`.
    ///
    /// Each module is gated, adapted, validated, initialized and bound in
    /// turn. A failing module is recorded and the pass moves on; this never
    /// fails as a whole.
    pub fn register_all(
        &mut self,
        descriptors: &[ModuleDescriptor],
        config: Option<&ToolkitConfig>,
        globals: &ModuleOptions,
    ) -> BTreeMap<String, RegistrationOutcome> {
        let gate = ConfigurationGate::new(config);
        tracing::info!(candidates = descriptors.len(), "registering modules");

        let mut outcomes = BTreeMap::new();
        for descriptor in descriptors {
            let name = descriptor.name();
            let outcome = match gate.decide(name) {
                GateDecision::Disabled => {
                    tracing::info!(module = name, "module disabled by configuration");
                    self.record_disabled(name);
                    RegistrationOutcome::Disabled
                }
                GateDecision::Attempt(options) => {
                    match CapabilityAdapter::new(&self.catalog).adapt(descriptor) {
                        Adaptation::NotATool => RegistrationOutcome::Ignored,
                        Adaptation::Failed(message) => {
                            self.record_failure(name, message.clone());
                            RegistrationOutcome::Failed(message)
                        }
                        Adaptation::Adapted(capability) => {
                            self.register_module(name, capability, merge_options(globals, options))
                        }
                    }
                }
            };
            outcomes.insert(name.to_string(), outcome);
        }

        tracing::info!(
            registered = self.live.len(),
            failed = self.failed.len(),
            disabled = self.disabled.len(),
            operations = self.total_operations(),
            "registration pass complete"
        );
        outcomes
    }

    /// Resolve and adapt one module without registering it.
    ///
    /// Resolution failures are recorded like they are during a pass.
    pub fn load_module(&mut self, descriptor: &ModuleDescriptor) -> Option<Box<dyn Capability>> {
        match CapabilityAdapter::new(&self.catalog).adapt(descriptor) {
            Adaptation::Adapted(capability) => Some(capability),
            Adaptation::Failed(message) => {
                self.record_failure(descriptor.name(), message);
                None
            }
            Adaptation::NotATool => None,
        }
    }

    /// Validate, initialize and bind one capability under `name`.
    ///
    /// Registering a name that is already live replaces the old module after
    /// cleaning it up.
    pub fn register_module(
        &mut self,
        name: &str,
        mut capability: Box<dyn Capability>,
        options: ModuleOptions,
    ) -> RegistrationOutcome {
        if let Err(message) = validate(name, capability.as_ref()) {
            self.record_failure(name, message.clone());
            return RegistrationOutcome::Failed(message);
        }

        let ctx = InitContext::new(name, Arc::clone(&self.host), options);
        if let Err(message) = contain(|| capability.initialize(&ctx)) {
            tracing::warn!(module = name, error = %message, "module initialization failed");
            self.record_failure(name, message.clone());
            return RegistrationOutcome::Failed(message);
        }

        let host = Arc::clone(&self.host);
        let bound = contain(|| {
            let mut operations = BTreeMap::new();
            for (op_name, operation) in capability.operations() {
                operations.insert(op_name.clone(), operation.description().to_string());
                host.bind_operation(&op_name, operation)?;
            }
            let mut resources = Vec::new();
            for (pattern, provider) in capability.resources() {
                host.bind_resource(&pattern, provider)?;
                resources.push(pattern);
            }
            resources.sort();
            let dependencies = capability.dependencies();
            if !dependencies.is_empty() {
                host.extend_dependencies(&dependencies)?;
            }
            Ok((operations, resources, dependencies))
        });

        match bound {
            Ok((operations, resources, dependencies)) => {
                tracing::info!(
                    module = name,
                    capability = capability.name(),
                    operations = operations.len(),
                    resources = resources.len(),
                    "registered module"
                );
                self.record_success(
                    name,
                    LiveModule {
                        capability,
                        operations,
                        resources,
                        dependencies,
                    },
                );
                RegistrationOutcome::Registered
            }
            Err(message) => {
                tracing::warn!(module = name, error = %message, "module binding failed");
                cleanup(name, capability.as_mut());
                self.record_failure(name, message.clone());
                RegistrationOutcome::Failed(message)
            }
        }
    }

    /// Names of the registered modules, sorted.
    pub fn registered(&self) -> Vec<&str> {
        self.live.keys().map(String::as_str).collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.live.contains_key(name)
    }

    /// The live capability registered under `name`.
    pub fn capability(&self, name: &str) -> Option<&dyn Capability> {
        self.live.get(name).map(|live| live.capability.as_ref())
    }

    /// Module name -> diagnostic for every failed module.
    pub fn failures(&self) -> &BTreeMap<String, String> {
        &self.failed
    }

    pub fn disabled(&self) -> Vec<&str> {
        self.disabled.iter().map(String::as_str).collect()
    }

    /// Operations bound by registered modules.
    pub fn total_operations(&self) -> usize {
        self.live.values().map(|live| live.operations.len()).sum()
    }

    /// Distinct entries in the host's aggregate dependency list.
    pub fn total_dependencies(&self) -> usize {
        self.host
            .dependencies()
            .into_iter()
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Snapshot of the status tables.
    pub fn status(&self) -> RegistryStatus {
        let registered = self
            .live
            .iter()
            .map(|(name, live)| ModuleReport {
                name: name.clone(),
                display_name: live.capability.name().to_string(),
                description: live.capability.description().to_string(),
                operations: live.operations.clone(),
                resources: live.resources.clone(),
                dependencies: live.dependencies.clone(),
            })
            .collect();
        RegistryStatus {
            registered,
            failed: self.failed.clone(),
            disabled: self.disabled.iter().cloned().collect(),
            total_operations: self.total_operations(),
            total_dependencies: self.total_dependencies(),
        }
    }

    /// Clean up every live module and consume the registry.
    pub fn shutdown(mut self) {
        self.cleanup_all();
    }

    fn cleanup_all(&mut self) {
        if self.live.is_empty() {
            return;
        }
        tracing::info!(modules = self.live.len(), "cleaning up registered modules");
        for (name, mut live) in std::mem::take(&mut self.live) {
            cleanup(&name, live.capability.as_mut());
        }
    }

    fn record_success(&mut self, name: &str, live: LiveModule) {
        self.failed.remove(name);
        self.disabled.remove(name);
        if let Some(mut previous) = self.live.insert(name.to_string(), live) {
            tracing::debug!(module = name, "replaced previously registered module");
            cleanup(name, previous.capability.as_mut());
        }
    }

    fn record_failure(&mut self, name: &str, diagnostic: String) {
        self.retire(name);
        self.disabled.remove(name);
        self.failed.insert(name.to_string(), diagnostic);
    }

    fn record_disabled(&mut self, name: &str) {
        self.retire(name);
        self.failed.remove(name);
        self.disabled.insert(name.to_string());
    }

    fn retire(&mut self, name: &str) {
        if let Some(mut previous) = self.live.remove(name) {
            cleanup(name, previous.capability.as_mut());
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.cleanup_all();
    }
}

fn cleanup(name: &str, capability: &mut dyn Capability) {
    if let Err(message) = contain(|| capability.cleanup()) {
        tracing::warn!(module = name, error = %message, "module cleanup failed");
    }
}
