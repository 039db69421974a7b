//! Built-in integration modules.

pub mod filesystem;
pub mod news_api;
#[cfg(feature = "shell")]
pub mod shell;
pub mod time_tools;
pub mod web_fetch;

use mtk_registry::{ModuleCatalog, ModuleError, ModuleUnit};

/// Catalog of every module compiled into this build.
pub fn builtin_catalog() -> ModuleCatalog {
    ModuleCatalog::new()
        .with("filesystem", || {
            Ok(ModuleUnit::new().with_capability("Filesystem", filesystem::Filesystem::new))
        })
        .with("time_tools", || {
            Ok(ModuleUnit::new().with_capability("TimeTools", time_tools::TimeTools::default))
        })
        .with("web_fetch", web_fetch::unit)
        .with("news_api", news_api::unit)
        .with("shell", shell_unit)
}

#[cfg(feature = "shell")]
fn shell_unit() -> Result<ModuleUnit, ModuleError> {
    Ok(ModuleUnit::new().with_capability("Shell", shell::Shell::default))
}

#[cfg(not(feature = "shell"))]
fn shell_unit() -> Result<ModuleUnit, ModuleError> {
    Err(ModuleError::Resolution(
        "shell module requires the `shell` cargo feature".to_string(),
    ))
}
