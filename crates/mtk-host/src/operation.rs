//! Operation trait definition and common types.

use crate::error::OperationError;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Operation name -> callable, as exposed by one module.
pub type OperationMap = HashMap<String, Arc<dyn Operation>>;

/// Context provided to operations during a call.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Identifier of this call, for log correlation.
    pub call_id: String,
    /// Current working directory.
    pub working_dir: PathBuf,
    /// Execution timeout.
    pub timeout: Duration,
}

impl Default for CallContext {
    fn default() -> Self {
        Self {
            call_id: ulid::Ulid::new().to_string(),
            working_dir: std::env::current_dir().unwrap_or_default(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Result of an operation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutput {
    /// Output text.
    pub output: String,
    /// Optional metadata (e.g., byte count, status code).
    pub metadata: Value,
    /// Whether the result represents an error.
    pub is_error: bool,
}

impl OperationOutput {
    /// Create a successful result.
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            metadata: Value::Null,
            is_error: false,
        }
    }

    /// Create a successful result with metadata.
    pub fn success_with_metadata(output: impl Into<String>, metadata: Value) -> Self {
        Self {
            output: output.into(),
            metadata,
            is_error: false,
        }
    }

    /// Create a successful result whose text is pretty-printed JSON.
    pub fn json(value: Value) -> Self {
        let output = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        Self {
            output,
            metadata: value,
            is_error: false,
        }
    }

    /// Create an error result.
    pub fn error(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            metadata: Value::Null,
            is_error: true,
        }
    }
}

/// A single named unit of functionality bound into the host runtime.
///
/// The name lives in the [`OperationMap`] key, not on the operation, so the
/// same implementation can be bound under more than one name.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Description of what the operation does.
    fn description(&self) -> &str;

    /// JSON Schema describing the operation's parameters.
    fn parameters_schema(&self) -> Value {
        default_schema()
    }

    /// Run the operation with the given arguments.
    async fn call(&self, args: Value, ctx: &CallContext) -> Result<OperationOutput, OperationError>;
}

// Compile-time check: Operation must be object-safe
const _: () = {
    fn _assert_object_safe(_: &dyn Operation) {}
};

fn default_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "additionalProperties": true,
    })
}

type Handler = Arc<
    dyn Fn(Value, CallContext) -> BoxFuture<'static, Result<OperationOutput, OperationError>>
        + Send
        + Sync,
>;

/// Operation backed by an async closure.
#[derive(Clone)]
pub struct FnOperation {
    description: String,
    schema: Value,
    handler: Handler,
}

impl FnOperation {
    pub fn new<F, Fut>(description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OperationOutput, OperationError>> + Send + 'static,
    {
        Self {
            description: description.into(),
            schema: default_schema(),
            handler: Arc::new(move |args, ctx| handler(args, ctx).boxed()),
        }
    }

    /// Replace the permissive default parameter schema.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }
}

impl std::fmt::Debug for FnOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnOperation")
            .field("description", &self.description)
            .finish()
    }
}

#[async_trait]
impl Operation for FnOperation {
    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn call(&self, args: Value, ctx: &CallContext) -> Result<OperationOutput, OperationError> {
        (self.handler)(args, ctx.clone()).await
    }
}

/// Shorthand for an `Arc<dyn Operation>` built from an async closure.
pub fn operation_fn<F, Fut>(description: impl Into<String>, handler: F) -> Arc<dyn Operation>
where
    F: Fn(Value, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<OperationOutput, OperationError>> + Send + 'static,
{
    Arc::new(FnOperation::new(description, handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_operation_calls_closure() {
        let op = operation_fn("Echo input", |args, _ctx| async move {
            Ok(OperationOutput::success(args["text"].as_str().unwrap_or_default().to_string()))
        });

        let result = op
            .call(serde_json::json!({"text": "hi"}), &CallContext::default())
            .await
            .unwrap();
        assert_eq!(result.output, "hi");
        assert!(!result.is_error);
        assert_eq!(op.description(), "Echo input");
    }

    #[test]
    fn test_fn_operation_schema_override() {
        let op = FnOperation::new("noop", |_args, _ctx| async { Ok(OperationOutput::success("")) })
            .with_schema(serde_json::json!({"type": "object", "properties": {"x": {"type": "integer"}}}));
        assert!(op.parameters_schema()["properties"]["x"].is_object());
    }

    #[test]
    fn test_json_output_pretty_prints() {
        let out = OperationOutput::json(serde_json::json!({"a": 1}));
        assert!(out.output.contains("\"a\": 1"));
        assert_eq!(out.metadata["a"], 1);
    }
}
