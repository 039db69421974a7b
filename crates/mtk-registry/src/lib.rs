//! mtk-registry: Discovers integration modules, adapts them to a uniform
//! capability surface, gates them by configuration and binds their operations
//! into the host runtime.
//!
//! The pipeline runs once at startup:
//! scanner → configuration gate → capability adapter → environment validator
//! → registrar, with every outcome recorded in the [`Registry`]'s status
//! tables. A failing module is recorded and skipped; it never aborts the pass.

pub mod adapter;
pub mod capability;
pub mod catalog;
pub mod diagnostics;
mod error;
pub mod gate;
pub mod legacy;
pub mod registry;
pub mod scanner;
pub mod status;
pub mod unit;
mod validator;

pub use adapter::{Adaptation, CapabilityAdapter};
pub use capability::{Capability, InitContext};
pub use catalog::{ModuleCatalog, ModuleResolver};
pub use diagnostics::bind_diagnostics;
pub use error::ModuleError;
pub use gate::{merge_options, ConfigurationGate, GateDecision};
pub use legacy::{EnvRequirement, LegacyModule};
pub use registry::Registry;
pub use scanner::{ModuleDescriptor, ModuleLocation, ModuleScanner};
pub use status::{ModuleReport, RegistrationOutcome, RegistryStatus};
pub use unit::{CapabilityType, ModuleUnit, UnitFunction};
pub use validator::VALIDATION_FAILURE;
