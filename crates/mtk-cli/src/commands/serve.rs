use crate::cli::Cli;
use mtk_host::{serve_stdio, ServerInfo};

pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    let toolkit = super::load_toolkit(cli)?;
    let info = ServerInfo {
        name: toolkit.config.server.name.clone(),
        ..ServerInfo::default()
    };

    tracing::info!(
        name = %info.name,
        operations = toolkit.server.len(),
        "serving on stdio"
    );
    let served = serve_stdio(toolkit.server.clone(), info).await;

    toolkit.registry.shutdown();
    tracing::info!("server stopped");
    served.map_err(|e| anyhow::anyhow!("stdio transport failed: {e}"))
}
