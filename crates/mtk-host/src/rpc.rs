//! Newline-delimited JSON-RPC serving loop over stdio.

use crate::operation::CallContext;
use crate::server::ToolServer;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

/// Identity reported in the `initialize` response.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "mcp-toolkit".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Errors that end the serving loop.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("IO error on transport: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error on transport: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serve requests from process stdin/stdout until stdin closes.
pub async fn serve_stdio(server: Arc<ToolServer>, info: ServerInfo) -> Result<(), RpcError> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(server, info, stdin, stdout).await
}

/// Serve requests read from `reader`, writing responses to `writer`.
///
/// Requests are handled one at a time in arrival order. Returns when the
/// reader reaches EOF.
pub async fn serve<R, W>(
    server: Arc<ToolServer>,
    info: ServerInfo,
    mut reader: R,
    mut writer: W,
) -> Result<(), RpcError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader.read_line(&mut line).await?;
        if bytes == 0 {
            tracing::info!("transport closed");
            return Ok(());
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let message: Value = match serde_json::from_str(trimmed) {
            Ok(message) => message,
            Err(err) => {
                write_message(
                    &mut writer,
                    &error_response(Value::Null, PARSE_ERROR, &format!("parse error: {err}")),
                )
                .await?;
                continue;
            }
        };

        if let Some(response) = handle_message(&server, &info, message).await {
            write_message(&mut writer, &response).await?;
        }
    }
}

async fn handle_message(server: &ToolServer, info: &ServerInfo, message: Value) -> Option<Value> {
    let method = message.get("method").and_then(Value::as_str)?.to_string();
    // Notifications carry no id and get no response.
    let id = message.get("id").cloned()?;
    let params = message.get("params").cloned().unwrap_or(Value::Null);

    let result = match method.as_str() {
        "initialize" => Ok(serde_json::json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "resources": {},
            },
            "serverInfo": {
                "name": info.name,
                "version": info.version,
            }
        })),
        "ping" => Ok(serde_json::json!({})),
        "tools/list" => Ok(serde_json::json!({ "tools": server.definitions() })),
        "tools/call" => call_tool(server, params).await,
        "resources/templates/list" => Ok(serde_json::json!({
            "resourceTemplates": server.resource_definitions(),
        })),
        "resources/read" => read_resource(server, params).await,
        other => Err((METHOD_NOT_FOUND, format!("method '{other}' not found"))),
    };

    Some(match result {
        Ok(result) => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result,
        }),
        Err((code, message)) => error_response(id, code, &message),
    })
}

async fn call_tool(server: &ToolServer, params: Value) -> Result<Value, (i64, String)> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| (INVALID_PARAMS, "tools/call requires a tool name".to_string()))?;
    if !server.has(name) {
        return Err((INVALID_PARAMS, format!("unknown tool '{name}'")));
    }
    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));

    let ctx = CallContext::default();
    // Operation failures are reported in-band so the client sees them as tool output.
    let (text, structured, is_error) = match server.call(name, arguments, &ctx).await {
        Ok(output) => (output.output, output.metadata, output.is_error),
        Err(err) => (err.to_string(), Value::Null, true),
    };

    let mut result = serde_json::json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    });
    if structured.is_object() {
        result["structuredContent"] = structured;
    }
    Ok(result)
}

async fn read_resource(server: &ToolServer, params: Value) -> Result<Value, (i64, String)> {
    let uri = params
        .get("uri")
        .and_then(Value::as_str)
        .ok_or_else(|| (INVALID_PARAMS, "resources/read requires a uri".to_string()))?;
    let content = server
        .read_resource(uri)
        .await
        .map_err(|err| (INTERNAL_ERROR, err.to_string()))?;
    let content = serde_json::to_value(content).map_err(|err| (INTERNAL_ERROR, err.to_string()))?;
    Ok(serde_json::json!({ "contents": [content] }))
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message,
        }
    })
}

async fn write_message<W>(writer: &mut W, message: &Value) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(message)?;
    writer.write_all(&payload).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
