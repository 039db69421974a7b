//! Error types for the mtk-host crate.

/// Errors that can occur while an operation runs.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// Invalid parameters passed to the operation
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Operation execution failed
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Permission denied for operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// I/O error during operation execution
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the host runtime's binding tables.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("host {0} table lock poisoned")]
    LockPoisoned(&'static str),
    #[error("no operation bound under '{0}'")]
    UnknownOperation(String),
    #[error("no resource provider matches '{0}'")]
    UnknownResource(String),
}
