//! Toolkit configuration: which modules are enabled and what options they get.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Option bag handed to a module's initialization hook.
pub type ModuleOptions = Map<String, Value>;

/// Serialized settings from ~/.mtk/config.yaml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Module name -> enabled flag. Empty means every module is enabled.
    pub enabled_tools: BTreeMap<String, bool>,
    /// Module name -> options passed to that module's initialization hook.
    pub tool_config: BTreeMap<String, ModuleOptions>,
    pub server: ServerSettings,
}

/// Settings for the serving process itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub name: String,
    /// Tracing filter directive, e.g. "info" or "mtk_registry=debug".
    pub log_level: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: "mcp-toolkit".to_string(),
            log_level: None,
        }
    }
}

impl ToolkitConfig {
    /// Whether a module should be attempted.
    ///
    /// With no `enabled_tools` entries at all every module is enabled. Once any
    /// entry exists, only modules explicitly marked `true` are.
    pub fn is_tool_enabled(&self, name: &str) -> bool {
        if self.enabled_tools.is_empty() {
            return true;
        }
        self.enabled_tools.get(name).copied().unwrap_or(false)
    }

    /// Options configured for a module, empty when none are set.
    pub fn tool_options(&self, name: &str) -> ModuleOptions {
        self.tool_config.get(name).cloned().unwrap_or_default()
    }

    /// Names of the modules explicitly marked enabled.
    pub fn enabled_tools(&self) -> Vec<String> {
        self.enabled_tools
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Stock configuration written by `mtk config init`.
    pub fn stock() -> Self {
        let enabled_tools = [
            ("filesystem", true),
            ("time_tools", true),
            ("web_fetch", true),
            ("news_api", true),
            ("shell", false),
        ]
        .into_iter()
        .map(|(name, enabled)| (name.to_string(), enabled))
        .collect();

        let mut tool_config = BTreeMap::new();
        tool_config.insert(
            "filesystem".to_string(),
            options(serde_json::json!({
                "allowed_dirs": ["~/documents", "~/downloads"],
                "allow_file_deletion": false,
            })),
        );
        tool_config.insert(
            "web_fetch".to_string(),
            options(serde_json::json!({ "timeout_secs": 30 })),
        );

        Self {
            enabled_tools,
            tool_config,
            server: ServerSettings::default(),
        }
    }

    /// Parse configuration text, choosing the format from the file extension.
    pub fn parse(content: &str, path: &Path) -> Result<Self, CoreError> {
        match ConfigFormat::from_path(path) {
            ConfigFormat::Yaml => {
                if content.trim().is_empty() {
                    return Ok(Self::default());
                }
                Ok(serde_yaml::from_str(content)?)
            }
            ConfigFormat::Json => Ok(serde_json::from_str(content)?),
        }
    }

    /// Render configuration in the format implied by the path.
    pub fn render(&self, path: &Path) -> Result<String, CoreError> {
        match ConfigFormat::from_path(path) {
            ConfigFormat::Yaml => Ok(serde_yaml::to_string(self)?),
            ConfigFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

fn options(value: Value) -> ModuleOptions {
    match value {
        Value::Object(map) => map,
        _ => ModuleOptions::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// YAML for `.yaml`/`.yml`, JSON for anything else.
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Helper struct for storing the location to read/write toolkit settings
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".mtk");
        path.push("config.yaml");
        Self { path }
    }

    /// Store rooted at an explicit file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the saved config, surfacing read and parse errors.
    ///
    /// A missing file is not an error and yields the empty default.
    pub fn try_load(&self) -> Result<ToolkitConfig, CoreError> {
        if !self.path.exists() {
            return Ok(ToolkitConfig::default());
        }
        let content = fs::read_to_string(&self.path)?;
        ToolkitConfig::parse(&content, &self.path)
    }

    /// Load the saved config, or fallback to Default
    pub fn load(&self) -> ToolkitConfig {
        if !self.path.exists() {
            tracing::warn!(
                path = %self.path.display(),
                "configuration file not found, using default settings"
            );
            return ToolkitConfig::default();
        }
        match self.try_load() {
            Ok(config) => {
                tracing::info!(path = %self.path.display(), "loaded configuration");
                config
            }
            Err(err) => {
                tracing::error!(path = %self.path.display(), error = %err, "error loading configuration");
                ToolkitConfig::default()
            }
        }
    }

    /// Save the config back to disk
    pub fn save(&self, config: &ToolkitConfig) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = config.render(&self.path)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Write the stock configuration if no file exists yet.
    ///
    /// Returns whether a file was created.
    pub fn create_default(&self) -> Result<bool, CoreError> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&ToolkitConfig::stock())?;
        tracing::info!(path = %self.path.display(), "created default configuration");
        Ok(true)
    }
}
