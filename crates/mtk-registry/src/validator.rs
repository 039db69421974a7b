//! Environment validation step.

use crate::capability::Capability;
use crate::error::contain;

/// Diagnostic recorded for a module whose environment check fails.
pub const VALIDATION_FAILURE: &str = "Failed environment validation";

/// Ask a capability whether its prerequisites are met.
///
/// A panicking check counts as a failed one.
pub(crate) fn validate(module: &str, capability: &dyn Capability) -> Result<(), String> {
    match contain(|| Ok(capability.validate_environment())) {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::warn!(module, "environment validation failed");
            Err(VALIDATION_FAILURE.to_string())
        }
        Err(message) => {
            tracing::warn!(module, error = %message, "environment validation panicked");
            Err(format!("{VALIDATION_FAILURE}: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtk_host::OperationMap;

    struct Check(Option<bool>);

    impl Capability for Check {
        fn name(&self) -> &str {
            "Check"
        }
        fn description(&self) -> &str {
            "environment check"
        }
        fn operations(&self) -> OperationMap {
            OperationMap::new()
        }
        fn validate_environment(&self) -> bool {
            self.0.expect("check exploded")
        }
    }

    #[test]
    fn test_validate() {
        assert!(validate("ok", &Check(Some(true))).is_ok());
        assert_eq!(validate("no", &Check(Some(false))), Err(VALIDATION_FAILURE.to_string()));
        let err = validate("boom", &Check(None)).unwrap_err();
        assert!(err.starts_with(VALIDATION_FAILURE));
        assert!(err.contains("check exploded"));
    }
}
