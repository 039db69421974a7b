//! Read-only diagnostic operations over a registry status snapshot.

use crate::status::RegistryStatus;
use chrono::{DateTime, Utc};
use mtk_host::{operation_fn, HostError, HostRuntime, OperationOutput};
use serde_json::json;
use std::sync::Arc;

pub const HEALTH_CHECK: &str = "health_check";
pub const LIST_TOOLS: &str = "list_tools";

/// Bind `health_check` and `list_tools` into the host.
///
/// Both report the status captured after the registration pass; the registry
/// does not change while the host serves requests.
pub fn bind_diagnostics(host: &dyn HostRuntime, status: RegistryStatus) -> Result<(), HostError> {
    let status = Arc::new(status);
    let started_at = Utc::now();

    let snapshot = Arc::clone(&status);
    host.bind_operation(
        HEALTH_CHECK,
        operation_fn("Check server health and registered tool status", move |_args, _ctx| {
            let status = Arc::clone(&snapshot);
            async move { Ok(OperationOutput::json(health_report(&status, started_at, Utc::now()))) }
        }),
    )?;

    let snapshot = Arc::clone(&status);
    host.bind_operation(
        LIST_TOOLS,
        operation_fn("List registered tools, their operations and failures", move |_args, _ctx| {
            let status = Arc::clone(&snapshot);
            async move { Ok(OperationOutput::json(tools_report(&status))) }
        }),
    )?;

    tracing::debug!("bound diagnostic operations");
    Ok(())
}

fn health_report(
    status: &RegistryStatus,
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> serde_json::Value {
    let uptime = (now - started_at).num_milliseconds().max(0) as f64 / 1000.0;
    json!({
        "status": "ok",
        "timestamp": now.to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": uptime,
        "tools": {
            "registered": status.registered_names(),
            "failed": status.failed,
            "disabled": status.disabled,
            "total_operations": status.total_operations,
            "total_dependencies": status.total_dependencies,
        }
    })
}

fn tools_report(status: &RegistryStatus) -> serde_json::Value {
    let registered: serde_json::Map<String, serde_json::Value> = status
        .registered
        .iter()
        .map(|report| {
            (
                report.name.clone(),
                json!({
                    "name": report.display_name,
                    "description": report.description,
                    "operations": report.operations,
                    "resources": report.resources,
                    "dependencies": report.dependencies,
                }),
            )
        })
        .collect();
    json!({
        "registered_tools": registered,
        "failed_tools": status.failed,
        "disabled_tools": status.disabled,
        "total_operations": status.total_operations,
        "total_dependencies": status.total_dependencies,
    })
}
