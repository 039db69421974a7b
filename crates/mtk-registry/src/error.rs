//! Error types for the mtk-registry crate.

use mtk_host::HostError;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Errors raised by a module or while registering it.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// The module could not be resolved (missing dependency, disabled feature).
    #[error("{0}")]
    Resolution(String),

    /// The module's initialization hook failed.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// The module's cleanup hook failed.
    #[error("cleanup failed: {0}")]
    Cleanup(String),

    /// Module options could not be decoded.
    #[error("invalid options: {0}")]
    Options(#[from] serde_json::Error),

    /// The host runtime rejected a binding.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Run a module hook, turning both errors and panics into a diagnostic string.
pub(crate) fn contain<T>(hook: impl FnOnce() -> Result<T, ModuleError>) -> Result<T, String> {
    match catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contain_passes_values_and_errors() {
        assert_eq!(contain(|| Ok(3)), Ok(3));
        let err = contain::<()>(|| Err(ModuleError::Initialization("no client".to_string())));
        assert_eq!(err, Err("initialization failed: no client".to_string()));
    }

    #[test]
    fn test_contain_catches_panics() {
        let err = contain::<()>(|| panic!("boom"));
        assert_eq!(err, Err("panicked: boom".to_string()));
    }
}
