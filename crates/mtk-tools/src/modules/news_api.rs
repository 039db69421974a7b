//! News API module (legacy convention).
//!
//! Exposes its operations through `get_newsapi_tools`, the punctuation-stripped
//! accessor name, and needs `NEWS_API_KEY` in the environment to be accepted.

use crate::params::{parse_args, schema_of};
use async_trait::async_trait;
use mtk_host::{CallContext, Operation, OperationError, OperationMap, OperationOutput};
use mtk_registry::{InitContext, ModuleError, ModuleUnit};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";
const API_KEY_ENV: &str = "NEWS_API_KEY";
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewsApiOptions {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Clone)]
struct NewsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

type SharedClient = Arc<RwLock<Option<NewsClient>>>;

/// Resolve the `news_api` unit.
pub fn unit() -> Result<ModuleUnit, ModuleError> {
    let client = SharedClient::default();
    let for_init = Arc::clone(&client);
    let for_tools = Arc::clone(&client);

    Ok(ModuleUnit::new()
        .with_set_host(|_host| tracing::debug!("news_api received host handle"))
        .with_initialize(move |ctx| initialize(&for_init, ctx))
        .with_accessor("get_newsapi_tools", move || tools(&for_tools))
        .with_dependencies(["reqwest"]))
}

fn initialize(client: &SharedClient, ctx: &InitContext) -> Result<(), ModuleError> {
    let options: NewsApiOptions = ctx.options_as()?;
    let api_key = options
        .api_key
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ModuleError::Initialization(format!("{API_KEY_ENV} is not set")))?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(options.timeout_secs.unwrap_or(30)))
        .user_agent(format!("mcp-toolkit/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ModuleError::Initialization(format!("Failed to create HTTP client: {e}")))?;

    let base_url = options
        .base_url
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string();

    let mut guard = client
        .write()
        .map_err(|_| ModuleError::Initialization("news_api client lock poisoned".to_string()))?;
    *guard = Some(NewsClient {
        http,
        base_url,
        api_key,
    });
    Ok(())
}

fn tools(client: &SharedClient) -> OperationMap {
    let mut ops = OperationMap::new();
    ops.insert("news_top_headlines".to_string(), Arc::new(TopHeadlines(Arc::clone(client))));
    ops.insert("news_search".to_string(), Arc::new(SearchNews(Arc::clone(client))));
    ops
}

fn current(client: &SharedClient) -> Result<NewsClient, OperationError> {
    client
        .read()
        .map_err(|_| OperationError::ExecutionError("news_api client lock poisoned".to_string()))?
        .clone()
        .ok_or_else(|| OperationError::ExecutionError("news_api is not initialized".to_string()))
}

fn page_size(requested: Option<u32>) -> u32 {
    requested.unwrap_or(10).clamp(1, MAX_PAGE_SIZE)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    status: String,
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    articles: Vec<Article>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<ArticleSource>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArticleSource {
    #[serde(default)]
    name: Option<String>,
}

async fn query(
    client: &NewsClient,
    endpoint: &str,
    params: &[(&str, String)],
) -> Result<OperationOutput, OperationError> {
    let url = format!("{}/{endpoint}", client.base_url);
    tracing::debug!(endpoint, "querying news api");
    let response = client
        .http
        .get(&url)
        .header("X-Api-Key", &client.api_key)
        .query(params)
        .send()
        .await
        .map_err(|e| OperationError::ExecutionError(format!("HTTP request failed: {e}")))?;

    let body: ApiResponse = response
        .json()
        .await
        .map_err(|e| OperationError::ExecutionError(format!("Unexpected response: {e}")))?;

    if body.status != "ok" {
        return Ok(OperationOutput::error(format!(
            "News API error: {}",
            body.message.unwrap_or_else(|| body.status.clone())
        )));
    }

    let lines: Vec<String> = body
        .articles
        .iter()
        .map(|article| {
            let title = article.title.as_deref().unwrap_or("(untitled)");
            let source = article
                .source
                .as_ref()
                .and_then(|s| s.name.as_deref())
                .unwrap_or("unknown source");
            let url = article.url.as_deref().unwrap_or("");
            format!("- {title} [{source}] {url}")
        })
        .collect();
    let output = if lines.is_empty() {
        "(no articles)".to_string()
    } else {
        lines.join("\n")
    };

    Ok(OperationOutput::success_with_metadata(
        output,
        serde_json::json!({
            "total_results": body.total_results,
            "articles": body.articles,
        }),
    ))
}

// -- news_top_headlines --

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TopHeadlinesParams {
    /// Two-letter country code. Default: us.
    #[serde(default)]
    pub country: Option<String>,
    /// Category such as business, science or technology.
    #[serde(default)]
    pub category: Option<String>,
    /// Keywords to filter headlines by.
    #[serde(default)]
    pub query: Option<String>,
    /// Number of articles, 1-100. Default: 10.
    #[serde(default)]
    pub page_size: Option<u32>,
}

struct TopHeadlines(SharedClient);

#[async_trait]
impl Operation for TopHeadlines {
    fn description(&self) -> &str {
        "Get top news headlines by country, category or keyword"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_of::<TopHeadlinesParams>()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let params: TopHeadlinesParams = parse_args(args)?;
        let client = current(&self.0)?;

        let mut query_params = vec![
            ("country", params.country.unwrap_or_else(|| "us".to_string())),
            ("pageSize", page_size(params.page_size).to_string()),
        ];
        if let Some(category) = params.category {
            query_params.push(("category", category));
        }
        if let Some(q) = params.query {
            query_params.push(("q", q));
        }
        query(&client, "top-headlines", &query_params).await
    }
}

// -- news_search --

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchNewsParams {
    /// Keywords or phrase to search for.
    pub query: String,
    /// Two-letter language code.
    #[serde(default)]
    pub language: Option<String>,
    /// relevancy, popularity or publishedAt. Default: publishedAt.
    #[serde(default)]
    pub sort_by: Option<String>,
    /// Oldest article date (ISO 8601).
    #[serde(default)]
    pub from: Option<String>,
    /// Newest article date (ISO 8601).
    #[serde(default)]
    pub to: Option<String>,
    /// Number of articles, 1-100. Default: 10.
    #[serde(default)]
    pub page_size: Option<u32>,
}

struct SearchNews(SharedClient);

#[async_trait]
impl Operation for SearchNews {
    fn description(&self) -> &str {
        "Search all news articles by keyword"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_of::<SearchNewsParams>()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let params: SearchNewsParams = parse_args(args)?;
        if params.query.trim().is_empty() {
            return Err(OperationError::InvalidParameters("query must not be empty".to_string()));
        }
        let client = current(&self.0)?;

        let mut query_params = vec![
            ("q", params.query),
            ("sortBy", params.sort_by.unwrap_or_else(|| "publishedAt".to_string())),
            ("pageSize", page_size(params.page_size).to_string()),
        ];
        for (key, value) in [("language", params.language), ("from", params.from), ("to", params.to)] {
            if let Some(value) = value {
                query_params.push((key, value));
            }
        }
        query(&client, "everything", &query_params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;
    use mtk_host::ToolServer;
    use mtk_registry::{Capability, EnvRequirement, LegacyModule};

    fn ctx(options: serde_json::Value) -> InitContext {
        let options = match options {
            serde_json::Value::Object(map) => map,
            _ => Default::default(),
        };
        InitContext::new("news_api", Arc::new(ToolServer::new()), options)
    }

    #[test]
    fn test_probed_through_stripped_accessor() {
        let unit = unit().unwrap();
        let module = LegacyModule::probe("news_api", &unit).unwrap();
        assert_eq!(module.accessor_names(), vec!["get_newsapi_tools"]);
        assert_eq!(module.requirement(), EnvRequirement::Variable("NEWS_API_KEY"));

        let mut names: Vec<String> = module.operations().into_keys().collect();
        names.sort();
        assert_eq!(names, vec!["news_search", "news_top_headlines"]);
    }

    #[test]
    fn test_page_size_clamped() {
        assert_eq!(page_size(None), 10);
        assert_eq!(page_size(Some(0)), 1);
        assert_eq!(page_size(Some(500)), 100);
    }

    #[tokio::test]
    async fn test_search_formats_articles() {
        let body = serde_json::json!({
            "status": "ok",
            "totalResults": 1,
            "articles": [{
                "title": "Rust 2.0 announced",
                "url": "https://example.com/rust",
                "source": {"name": "Example"}
            }]
        })
        .to_string();
        let base_url = serve_once("200 OK", "application/json", &body).await;

        let unit = unit().unwrap();
        let mut module = LegacyModule::probe("news_api", &unit).unwrap();
        module
            .initialize(&ctx(serde_json::json!({"api_key": "test-key", "base_url": base_url})))
            .unwrap();

        let out = module.operations()["news_search"]
            .call(serde_json::json!({"query": "rust"}), &CallContext::default())
            .await
            .unwrap();
        assert!(!out.is_error);
        assert_eq!(out.output, "- Rust 2.0 announced [Example] https://example.com/rust");
        assert_eq!(out.metadata["total_results"], 1);
    }

    #[tokio::test]
    async fn test_api_error_is_in_band() {
        let body = r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#;
        let base_url = serve_once("401 Unauthorized", "application/json", body).await;

        let unit = unit().unwrap();
        let mut module = LegacyModule::probe("news_api", &unit).unwrap();
        module
            .initialize(&ctx(serde_json::json!({"api_key": "bad", "base_url": base_url})))
            .unwrap();

        let out = module.operations()["news_top_headlines"]
            .call(serde_json::json!({}), &CallContext::default())
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.output.contains("Your API key is invalid."));
    }

    #[tokio::test]
    async fn test_call_before_initialize_fails() {
        let ops = tools(&SharedClient::default());
        let err = ops["news_search"]
            .call(serde_json::json!({"query": "x"}), &CallContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }
}
