//! mtk-core: Configuration model and shared error type.

pub mod config;
mod error;

pub use config::{ConfigStore, ModuleOptions, ServerSettings, ToolkitConfig};
pub use error::CoreError;
