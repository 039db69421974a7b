//! Resource providers bound under URI patterns such as `file://{path}`.

use crate::error::OperationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// URI pattern -> provider, as exposed by one module.
pub type ResourceMap = HashMap<String, Arc<dyn ResourceProvider>>;

/// Content returned from a resource read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

/// Something that can serve reads for URIs matching its bound pattern.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Short description surfaced in `resources/templates/list`.
    fn description(&self) -> &str {
        ""
    }

    async fn read(&self, uri: &str) -> Result<ResourceContent, OperationError>;
}

/// Whether `uri` falls under `pattern`.
///
/// Everything before the first `{` placeholder must match as a prefix; a
/// pattern without placeholders must match exactly.
pub fn pattern_matches(pattern: &str, uri: &str) -> bool {
    match pattern.find('{') {
        Some(idx) => uri.len() > idx && uri.starts_with(&pattern[..idx]),
        None => pattern == uri,
    }
}

/// Length of the literal prefix, used to prefer the most specific pattern.
pub(crate) fn pattern_specificity(pattern: &str) -> usize {
    pattern.find('{').unwrap_or(pattern.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_with_placeholder() {
        assert!(pattern_matches("file://{path}", "file:///tmp/a.txt"));
        assert!(!pattern_matches("file://{path}", "file://"));
        assert!(!pattern_matches("file://{path}", "http://x"));
    }

    #[test]
    fn test_pattern_literal() {
        assert!(pattern_matches("status://registry", "status://registry"));
        assert!(!pattern_matches("status://registry", "status://registry/x"));
    }

    #[test]
    fn test_specificity() {
        assert!(pattern_specificity("file://docs/{path}") > pattern_specificity("file://{path}"));
    }
}
