//! A resolved module unit: the capability types and free functions it defines.

use crate::capability::{Capability, InitContext};
use crate::error::ModuleError;
use mtk_host::{HostHandle, OperationMap};
use std::sync::Arc;

/// Function name a legacy module uses to receive the host handle.
pub const SET_HOST_FN: &str = "set_host";
/// Function name of a legacy module's initialization hook.
pub const INITIALIZE_FN: &str = "initialize";
/// Generic accessor probed after the module-specific ones.
pub const GENERIC_ACCESSOR_FN: &str = "get_tools";

pub type CapabilityFactory = Arc<dyn Fn() -> Box<dyn Capability> + Send + Sync>;
pub type SetHostFn = Arc<dyn Fn(HostHandle) + Send + Sync>;
pub type InitializeFn = Arc<dyn Fn(&InitContext) -> Result<(), ModuleError> + Send + Sync>;
pub type AccessorFn = Arc<dyn Fn() -> OperationMap + Send + Sync>;

/// A named free function defined by a module unit.
#[derive(Clone)]
pub enum UnitFunction {
    SetHost(SetHostFn),
    Initialize(InitializeFn),
    Accessor(AccessorFn),
}

impl std::fmt::Debug for UnitFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::SetHost(_) => "SetHost",
            Self::Initialize(_) => "Initialize",
            Self::Accessor(_) => "Accessor",
        };
        f.write_str(kind)
    }
}

/// A concrete capability type defined by a unit, instantiated with no arguments.
#[derive(Clone)]
pub struct CapabilityType {
    type_name: String,
    factory: CapabilityFactory,
}

impl std::fmt::Debug for CapabilityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityType")
            .field("type_name", &self.type_name)
            .finish()
    }
}

impl CapabilityType {
    pub fn new<C, F>(type_name: impl Into<String>, factory: F) -> Self
    where
        C: Capability + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            factory: Arc::new(move || Box::new(factory()) as Box<dyn Capability>),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn instantiate(&self) -> Box<dyn Capability> {
        (self.factory)()
    }
}

/// What a module exposes once resolved.
///
/// Either capability types (current-style modules), a set of free functions
/// (legacy modules), both, or neither (a helper unit that is not a tool).
#[derive(Clone, Debug, Default)]
pub struct ModuleUnit {
    capability_types: Vec<CapabilityType>,
    functions: Vec<(String, UnitFunction)>,
    dependencies: Vec<String>,
}

impl ModuleUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capability type.
    pub fn with_capability<C, F>(mut self, type_name: impl Into<String>, factory: F) -> Self
    where
        C: Capability + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.capability_types
            .push(CapabilityType::new(type_name, factory));
        self
    }

    /// Define a free function. A later definition under the same name shadows
    /// the earlier one.
    pub fn with_function(mut self, name: impl Into<String>, function: UnitFunction) -> Self {
        self.functions.push((name.into(), function));
        self
    }

    pub fn with_set_host<F>(self, f: F) -> Self
    where
        F: Fn(HostHandle) + Send + Sync + 'static,
    {
        self.with_function(SET_HOST_FN, UnitFunction::SetHost(Arc::new(f)))
    }

    pub fn with_initialize<F>(self, f: F) -> Self
    where
        F: Fn(&InitContext) -> Result<(), ModuleError> + Send + Sync + 'static,
    {
        self.with_function(INITIALIZE_FN, UnitFunction::Initialize(Arc::new(f)))
    }

    pub fn with_accessor<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> OperationMap + Send + Sync + 'static,
    {
        self.with_function(name, UnitFunction::Accessor(Arc::new(f)))
    }

    /// Module-level dependency list, used by legacy modules.
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn capability_types(&self) -> &[CapabilityType] {
        &self.capability_types
    }

    pub fn function(&self, name: &str) -> Option<&UnitFunction> {
        self.functions
            .iter()
            .rev()
            .find(|(fn_name, _)| fn_name == name)
            .map(|(_, function)| function)
    }

    pub fn set_host(&self) -> Option<SetHostFn> {
        match self.function(SET_HOST_FN)? {
            UnitFunction::SetHost(f) => Some(Arc::clone(f)),
            _ => None,
        }
    }

    pub fn initializer(&self) -> Option<InitializeFn> {
        match self.function(INITIALIZE_FN)? {
            UnitFunction::Initialize(f) => Some(Arc::clone(f)),
            _ => None,
        }
    }

    pub fn accessor(&self, name: &str) -> Option<AccessorFn> {
        match self.function(name)? {
            UnitFunction::Accessor(f) => Some(Arc::clone(f)),
            _ => None,
        }
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}
