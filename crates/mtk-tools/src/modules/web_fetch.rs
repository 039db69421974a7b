//! Web fetch module, written against the legacy functional convention.
//!
//! The unit defines `set_host`, `initialize` and `get_web_fetch_tools` rather
//! than a capability type. With `expose_resources` set, `initialize` binds
//! `http://` and `https://` resource providers through the stored host handle.

use crate::params::{parse_args, schema_of};
use async_trait::async_trait;
use mtk_host::{
    CallContext, HostHandle, Operation, OperationError, OperationMap, OperationOutput,
    ResourceContent, ResourceProvider,
};
use mtk_registry::{InitContext, ModuleError, ModuleUnit};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;

const DEFAULT_MAX_BYTES: usize = 100 * 1024; // 100KB
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct WebFetchOptions {
    timeout_secs: u64,
    max_bytes: usize,
    user_agent: String,
    expose_resources: bool,
}

impl Default for WebFetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_bytes: DEFAULT_MAX_BYTES,
            user_agent: format!("mcp-toolkit/{}", env!("CARGO_PKG_VERSION")),
            expose_resources: false,
        }
    }
}

#[derive(Default)]
struct WebFetchState {
    host: Option<HostHandle>,
    client: Option<reqwest::Client>,
    max_bytes: usize,
}

type SharedState = Arc<RwLock<WebFetchState>>;

/// Resolve the `web_fetch` unit.
pub fn unit() -> Result<ModuleUnit, ModuleError> {
    let state = SharedState::default();
    let for_host = Arc::clone(&state);
    let for_init = Arc::clone(&state);
    let for_tools = Arc::clone(&state);

    Ok(ModuleUnit::new()
        .with_set_host(move |host| {
            if let Ok(mut state) = for_host.write() {
                state.host = Some(host);
            }
        })
        .with_initialize(move |ctx| initialize(&for_init, ctx))
        .with_accessor("get_web_fetch_tools", move || tools(&for_tools))
        .with_dependencies(["reqwest"]))
}

fn initialize(state: &SharedState, ctx: &InitContext) -> Result<(), ModuleError> {
    let options: WebFetchOptions = ctx.options_as()?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(options.timeout_secs))
        .user_agent(options.user_agent.as_str())
        .build()
        .map_err(|e| ModuleError::Initialization(format!("Failed to create HTTP client: {e}")))?;

    let host = {
        let mut guard = state
            .write()
            .map_err(|_| ModuleError::Initialization("web_fetch state lock poisoned".to_string()))?;
        guard.client = Some(client);
        guard.max_bytes = options.max_bytes;
        // Not retained: bound providers hold this state.
        guard.host.take()
    };

    if options.expose_resources {
        let host = host.ok_or_else(|| {
            ModuleError::Initialization("host handle was not provided before initialize".to_string())
        })?;
        for pattern in ["http://{url}", "https://{url}"] {
            host.bind_resource(pattern, Arc::new(WebResource(Arc::clone(state))))?;
        }
    }

    tracing::debug!(
        timeout_secs = options.timeout_secs,
        max_bytes = options.max_bytes,
        "web_fetch initialized"
    );
    Ok(())
}

fn tools(state: &SharedState) -> OperationMap {
    let mut ops = OperationMap::new();
    ops.insert("fetch_url".to_string(), Arc::new(FetchUrl(Arc::clone(state))));
    ops
}

struct Fetched {
    status: u16,
    content_type: String,
    body: String,
    total_bytes: usize,
}

async fn fetch(state: &SharedState, url: &str) -> Result<Fetched, OperationError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(OperationError::InvalidParameters(format!(
            "Only http and https URLs are supported: {url}"
        )));
    }

    let (client, max_bytes) = {
        let guard = state
            .read()
            .map_err(|_| OperationError::ExecutionError("web_fetch state lock poisoned".to_string()))?;
        let client = guard
            .client
            .clone()
            .ok_or_else(|| OperationError::ExecutionError("web_fetch is not initialized".to_string()))?;
        (client, guard.max_bytes)
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| OperationError::ExecutionError(format!("HTTP request failed: {e}")))?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| OperationError::ExecutionError(format!("Failed to read response: {e}")))?;

    let mut body = String::from_utf8_lossy(&bytes).to_string();
    let total_bytes = body.len();
    if body.len() > max_bytes {
        let mut cut = max_bytes;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str(&format!("\n\n... (truncated at {max_bytes} bytes)"));
    }

    Ok(Fetched {
        status,
        content_type,
        body,
        total_bytes,
    })
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FetchUrlParams {
    /// URL to fetch.
    pub url: String,
}

struct FetchUrl(SharedState);

#[async_trait]
impl Operation for FetchUrl {
    fn description(&self) -> &str {
        "Fetch the contents of a URL and return the response body as text."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_of::<FetchUrlParams>()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let params: FetchUrlParams = parse_args(args)?;
        let fetched = fetch(&self.0, &params.url).await?;
        if !(200..300).contains(&fetched.status) {
            return Ok(OperationOutput::error(format!(
                "HTTP {} for {}",
                fetched.status, params.url
            )));
        }
        Ok(OperationOutput::success_with_metadata(
            fetched.body,
            serde_json::json!({
                "status": fetched.status,
                "content_type": fetched.content_type,
                "bytes": fetched.total_bytes,
            }),
        ))
    }
}

struct WebResource(SharedState);

#[async_trait]
impl ResourceProvider for WebResource {
    fn description(&self) -> &str {
        "Body of a web page"
    }

    async fn read(&self, uri: &str) -> Result<ResourceContent, OperationError> {
        let fetched = fetch(&self.0, uri).await?;
        if !(200..300).contains(&fetched.status) {
            return Err(OperationError::ExecutionError(format!(
                "HTTP {} for {uri}",
                fetched.status
            )));
        }
        let mime_type = fetched
            .content_type
            .split(';')
            .next()
            .unwrap_or("text/plain")
            .trim()
            .to_string();
        Ok(ResourceContent {
            uri: uri.to_string(),
            mime_type,
            text: fetched.body,
        })
    }
}
