//! Host runtime contract and the in-process tool server implementing it.

use crate::error::{HostError, OperationError};
use crate::operation::{CallContext, Operation, OperationOutput};
use crate::resource::{pattern_matches, pattern_specificity, ResourceContent, ResourceProvider};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};

/// Shared reference to the host runtime handed to modules.
pub type HostHandle = Arc<dyn HostRuntime>;

/// The narrow surface the registry needs from whatever serves requests.
pub trait HostRuntime: Send + Sync {
    /// Bind an operation under `name`. A later binding for the same name wins.
    fn bind_operation(&self, name: &str, operation: Arc<dyn Operation>) -> Result<(), HostError>;

    /// Bind a resource provider under a URI pattern. A later binding wins.
    fn bind_resource(
        &self,
        pattern: &str,
        provider: Arc<dyn ResourceProvider>,
    ) -> Result<(), HostError>;

    /// Append to the aggregate dependency list. Duplicates are kept.
    fn extend_dependencies(&self, dependencies: &[String]) -> Result<(), HostError>;

    /// Snapshot of the aggregate dependency list.
    fn dependencies(&self) -> Vec<String>;
}

/// In-process host runtime.
///
/// Stores operations by name and resource providers by URI pattern. Tables
/// sit behind locks because the server is shared between the registry, legacy
/// modules holding a [`HostHandle`], and the serving loop.
#[derive(Default)]
pub struct ToolServer {
    operations: RwLock<HashMap<String, Arc<dyn Operation>>>,
    resources: RwLock<HashMap<String, Arc<dyn ResourceProvider>>>,
    dependencies: RwLock<Vec<String>>,
}

impl std::fmt::Debug for ToolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServer")
            .field("operations", &self.operation_names())
            .field("dependencies", &self.dependencies())
            .finish()
    }
}

impl ToolServer {
    /// Create an empty server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an operation by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.read().ok()?.get(name).cloned()
    }

    /// Check if an operation is bound.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All bound operation names, sorted.
    pub fn operation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .operations
            .read()
            .map(|ops| ops.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// All bound resource patterns, sorted.
    pub fn resource_patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = self
            .resources
            .read()
            .map(|res| res.keys().cloned().collect())
            .unwrap_or_default();
        patterns.sort();
        patterns
    }

    /// Number of bound operations.
    pub fn len(&self) -> usize {
        self.operations.read().map(|ops| ops.len()).unwrap_or(0)
    }

    /// Whether no operations are bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of distinct entries in the aggregate dependency list.
    pub fn distinct_dependencies(&self) -> usize {
        self.dependencies().into_iter().collect::<BTreeSet<_>>().len()
    }

    /// Operation definitions in the shape `tools/list` returns, sorted by name.
    pub fn definitions(&self) -> Vec<Value> {
        let ops = match self.operations.read() {
            Ok(ops) => ops,
            Err(_) => return Vec::new(),
        };
        let mut names: Vec<&String> = ops.keys().collect();
        names.sort();
        let definitions = names
            .into_iter()
            .map(|name| {
                let op = &ops[name];
                serde_json::json!({
                    "name": name,
                    "description": op.description(),
                    "inputSchema": op.parameters_schema(),
                })
            })
            .collect();
        definitions
    }

    /// Resource template definitions for `resources/templates/list`.
    pub fn resource_definitions(&self) -> Vec<Value> {
        let resources = match self.resources.read() {
            Ok(resources) => resources,
            Err(_) => return Vec::new(),
        };
        let mut patterns: Vec<&String> = resources.keys().collect();
        patterns.sort();
        let definitions = patterns
            .into_iter()
            .map(|pattern| {
                serde_json::json!({
                    "uriTemplate": pattern,
                    "name": pattern,
                    "description": resources[pattern].description(),
                })
            })
            .collect();
        definitions
    }

    /// Call a bound operation.
    pub async fn call(
        &self,
        name: &str,
        args: Value,
        ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let op = self.get(name).ok_or_else(|| {
            OperationError::InvalidParameters(HostError::UnknownOperation(name.to_string()).to_string())
        })?;
        tracing::debug!(operation = name, call_id = %ctx.call_id, "calling operation");
        // A panicking operation fails its call, not the serving loop.
        match AssertUnwindSafe(op.call(args, ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(operation = name, call_id = %ctx.call_id, error = %message, "operation panicked");
                Err(OperationError::ExecutionError(format!(
                    "operation '{name}' panicked: {message}"
                )))
            }
        }
    }

    /// Read a resource through the most specific matching provider.
    pub async fn read_resource(&self, uri: &str) -> Result<ResourceContent, OperationError> {
        let provider = self.resource_for(uri).ok_or_else(|| {
            OperationError::InvalidParameters(HostError::UnknownResource(uri.to_string()).to_string())
        })?;
        match AssertUnwindSafe(provider.read(uri)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(uri, error = %message, "resource provider panicked");
                Err(OperationError::ExecutionError(format!(
                    "resource provider for '{uri}' panicked: {message}"
                )))
            }
        }
    }

    fn resource_for(&self, uri: &str) -> Option<Arc<dyn ResourceProvider>> {
        let resources = self.resources.read().ok()?;
        let provider = resources
            .iter()
            .filter(|(pattern, _)| pattern_matches(pattern, uri))
            .max_by_key(|(pattern, _)| pattern_specificity(pattern))
            .map(|(_, provider)| Arc::clone(provider));
        provider
    }
}

impl HostRuntime for ToolServer {
    fn bind_operation(&self, name: &str, operation: Arc<dyn Operation>) -> Result<(), HostError> {
        let mut ops = self
            .operations
            .write()
            .map_err(|_| HostError::LockPoisoned("operation"))?;
        if ops.insert(name.to_string(), operation).is_some() {
            tracing::debug!(operation = name, "replaced existing operation binding");
        }
        Ok(())
    }

    fn bind_resource(
        &self,
        pattern: &str,
        provider: Arc<dyn ResourceProvider>,
    ) -> Result<(), HostError> {
        let mut resources = self
            .resources
            .write()
            .map_err(|_| HostError::LockPoisoned("resource"))?;
        resources.insert(pattern.to_string(), provider);
        Ok(())
    }

    fn extend_dependencies(&self, dependencies: &[String]) -> Result<(), HostError> {
        let mut deps = self
            .dependencies
            .write()
            .map_err(|_| HostError::LockPoisoned("dependency"))?;
        deps.extend(dependencies.iter().cloned());
        Ok(())
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies
            .read()
            .map(|deps| deps.clone())
            .unwrap_or_default()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::operation_fn;
    use async_trait::async_trait;

    struct StaticResource;

    #[async_trait]
    impl ResourceProvider for StaticResource {
        async fn read(&self, uri: &str) -> Result<ResourceContent, OperationError> {
            Ok(ResourceContent {
                uri: uri.to_string(),
                mime_type: "text/plain".to_string(),
                text: "static".to_string(),
            })
        }
    }

    fn constant(text: &'static str) -> Arc<dyn Operation> {
        operation_fn(format!("returns {text}"), move |_args, _ctx| async move {
            Ok(OperationOutput::success(text))
        })
    }

    #[tokio::test]
    async fn test_bind_and_call() {
        let server = ToolServer::new();
        server.bind_operation("ping", constant("pong")).unwrap();

        assert!(server.has("ping"));
        assert_eq!(server.len(), 1);
        let out = server
            .call("ping", Value::Null, &CallContext::default())
            .await
            .unwrap();
        assert_eq!(out.output, "pong");
    }

    #[tokio::test]
    async fn test_panicking_operation_fails_the_call() {
        let server = ToolServer::new();
        server
            .bind_operation(
                "boom",
                operation_fn("always panics", |_args, _ctx| async move {
                    if true {
                        panic!("offset split inside a char");
                    }
                    Ok(OperationOutput::success("unreachable"))
                }),
            )
            .unwrap();
        server.bind_operation("ping", constant("pong")).unwrap();

        let err = server
            .call("boom", Value::Null, &CallContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::ExecutionError(_)));
        assert!(err.to_string().contains("offset split inside a char"));

        let out = server
            .call("ping", Value::Null, &CallContext::default())
            .await
            .unwrap();
        assert_eq!(out.output, "pong");
    }

    #[tokio::test]
    async fn test_rebinding_last_wins() {
        let server = ToolServer::new();
        server.bind_operation("op", constant("first")).unwrap();
        server.bind_operation("op", constant("second")).unwrap();

        assert_eq!(server.len(), 1);
        let out = server
            .call("op", Value::Null, &CallContext::default())
            .await
            .unwrap();
        assert_eq!(out.output, "second");
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let server = ToolServer::new();
        let err = server
            .call("missing", Value::Null, &CallContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_dependencies_keep_duplicates() {
        let server = ToolServer::new();
        server
            .extend_dependencies(&["reqwest".to_string(), "chrono".to_string()])
            .unwrap();
        server.extend_dependencies(&["reqwest".to_string()]).unwrap();

        assert_eq!(server.dependencies().len(), 3);
        assert_eq!(server.distinct_dependencies(), 2);
    }

    #[test]
    fn test_definitions_sorted() {
        let server = ToolServer::new();
        server.bind_operation("b", constant("b")).unwrap();
        server.bind_operation("a", constant("a")).unwrap();

        let defs = server.definitions();
        assert_eq!(defs[0]["name"], "a");
        assert_eq!(defs[1]["name"], "b");
        assert_eq!(defs[0]["inputSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_read_resource_by_pattern() {
        let server = ToolServer::new();
        server
            .bind_resource("file://{path}", Arc::new(StaticResource))
            .unwrap();

        let content = server.read_resource("file:///etc/hosts").await.unwrap();
        assert_eq!(content.text, "static");
        assert!(server.read_resource("http://nope").await.is_err());
        assert_eq!(server.resource_patterns(), vec!["file://{path}"]);
    }
}
