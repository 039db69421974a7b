//! Subcommand implementations.

pub mod call;
pub mod config;
pub mod serve;
pub mod status;

use crate::cli::Cli;
use mtk_core::{ConfigStore, ModuleOptions, ToolkitConfig};
use mtk_host::{HostHandle, ToolServer};
use mtk_registry::{bind_diagnostics, Registry};
use std::sync::Arc;

/// A host with every enabled module registered and diagnostics bound.
pub struct Toolkit {
    pub config: ToolkitConfig,
    pub server: Arc<ToolServer>,
    pub registry: Registry,
}

pub fn config_store(cli: &Cli) -> ConfigStore {
    match &cli.config {
        Some(path) => ConfigStore::at(path),
        None => ConfigStore::new(),
    }
}

/// Load configuration, seeding the stock file when nothing is enabled yet.
pub fn load_config(store: &ConfigStore) -> anyhow::Result<ToolkitConfig> {
    let config = store.load();
    if !config.enabled_tools.is_empty() {
        return Ok(config);
    }
    if store.create_default()? {
        return Ok(store.load());
    }
    Ok(config)
}

/// Options handed to every module underneath its configured options.
fn global_options(cli: &Cli) -> ModuleOptions {
    let dirs: Vec<serde_json::Value> = cli
        .allowed_dirs
        .iter()
        .map(|dir| dir.trim())
        .filter(|dir| !dir.is_empty())
        .map(|dir| serde_json::Value::String(dir.to_string()))
        .collect();

    let mut globals = ModuleOptions::new();
    if !dirs.is_empty() {
        globals.insert("allowed_dirs".to_string(), serde_json::Value::Array(dirs));
    }
    globals
}

/// Run the registration pass and bind the diagnostic operations.
pub fn load_toolkit(cli: &Cli) -> anyhow::Result<Toolkit> {
    let config = load_config(&config_store(cli))?;
    let server = Arc::new(ToolServer::new());
    let host: HostHandle = server.clone();
    let mut registry = Registry::new(host, mtk_tools::builtin_catalog());

    let globals = global_options(cli);
    let outcomes = match &cli.modules_dir {
        Some(dir) => registry.register_directory(dir, Some(&config), &globals),
        None => registry.register_builtin(Some(&config), &globals),
    };

    let registered: Vec<&str> = outcomes
        .iter()
        .filter(|(_, outcome)| outcome.is_registered())
        .map(|(name, _)| name.as_str())
        .collect();
    tracing::info!(count = registered.len(), modules = %registered.join(", "), "registered modules");
    for (name, outcome) in &outcomes {
        if let Some(diagnostic) = outcome.diagnostic() {
            tracing::warn!(module = %name, error = %diagnostic, "module failed to register");
        }
    }

    bind_diagnostics(&*server, registry.status())?;

    Ok(Toolkit {
        config,
        server,
        registry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_global_options_from_allowed_dirs() {
        let cli = Cli::try_parse_from(["mtk", "--allowed-dir", "/a, ,/b"]).unwrap();
        let globals = global_options(&cli);
        assert_eq!(globals["allowed_dirs"], serde_json::json!(["/a", "/b"]));
    }

    #[test]
    fn test_no_globals_without_allowed_dirs() {
        let cli = Cli::try_parse_from(["mtk", "--allowed-dir", ""]).unwrap();
        assert!(global_options(&cli).is_empty());
    }

    #[test]
    fn test_load_config_seeds_stock_file() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::at(dir.path().join("config.yaml"));
        let config = load_config(&store).unwrap();
        assert!(store.exists());
        assert_eq!(config, ToolkitConfig::stock());
    }

    #[test]
    fn test_load_config_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  name: custom\n").unwrap();
        let config = load_config(&ConfigStore::at(&path)).unwrap();
        assert!(config.enabled_tools.is_empty());
        assert_eq!(config.server.name, "custom");
    }
}
