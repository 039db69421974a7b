//! Filesystem module: read, write, list and search files under allowed directories.

use crate::params::{parse_args, schema_of};
use crate::path_guard::AllowedDirs;
use async_trait::async_trait;
use ignore::WalkBuilder;
use mtk_host::{
    CallContext, Operation, OperationError, OperationMap, OperationOutput, ResourceContent,
    ResourceMap, ResourceProvider,
};
use mtk_registry::{Capability, InitContext, ModuleError};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

const DEFAULT_LIMIT: usize = 2000;
const MAX_OUTPUT_BYTES: usize = 50 * 1024; // 50KB
const MAX_RESULTS: usize = 1000;

pub const FILE_RESOURCE: &str = "file://{path}";

#[derive(Debug, Default, Deserialize)]
struct FilesystemOptions {
    #[serde(default)]
    allowed_dirs: Vec<String>,
    #[serde(default)]
    allow_file_deletion: bool,
}

/// Capability type for the `filesystem` module.
pub struct Filesystem {
    dirs: Arc<AllowedDirs>,
    allow_deletion: bool,
}

impl Default for Filesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem {
    /// Confined to the current directory until initialized.
    pub fn new() -> Self {
        Self::with_dirs(AllowedDirs::current())
    }

    pub fn with_dirs(dirs: AllowedDirs) -> Self {
        Self {
            dirs: Arc::new(dirs),
            allow_deletion: false,
        }
    }

    pub fn allowed_dirs(&self) -> &AllowedDirs {
        &self.dirs
    }
}

impl Capability for Filesystem {
    fn name(&self) -> &str {
        "Filesystem"
    }

    fn description(&self) -> &str {
        "Read, write, list and search files within allowed directories"
    }

    fn operations(&self) -> OperationMap {
        let dirs = &self.dirs;
        let mut ops = OperationMap::new();
        ops.insert("read_file".to_string(), Arc::new(ReadFile(Arc::clone(dirs))));
        ops.insert("write_file".to_string(), Arc::new(WriteFile(Arc::clone(dirs))));
        ops.insert("list_directory".to_string(), Arc::new(ListDirectory(Arc::clone(dirs))));
        ops.insert("search_files".to_string(), Arc::new(SearchFiles(Arc::clone(dirs))));
        if self.allow_deletion {
            ops.insert("delete_file".to_string(), Arc::new(DeleteFile(Arc::clone(dirs))));
        }
        ops
    }

    fn resources(&self) -> ResourceMap {
        let mut resources = ResourceMap::new();
        resources.insert(
            FILE_RESOURCE.to_string(),
            Arc::new(FileResource(Arc::clone(&self.dirs))),
        );
        resources
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["ignore".to_string(), "glob".to_string()]
    }

    fn initialize(&mut self, ctx: &InitContext) -> Result<(), ModuleError> {
        let options: FilesystemOptions = ctx.options_as()?;
        let dirs = if options.allowed_dirs.is_empty() {
            AllowedDirs::current()
        } else {
            AllowedDirs::new(&options.allowed_dirs)
        };
        if dirs.is_empty() {
            return Err(ModuleError::Initialization(
                "none of the allowed directories exist".to_string(),
            ));
        }
        tracing::info!(
            roots = ?dirs.roots(),
            allow_deletion = options.allow_file_deletion,
            "filesystem module confined"
        );
        self.dirs = Arc::new(dirs);
        self.allow_deletion = options.allow_file_deletion;
        Ok(())
    }
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

// -- read_file --

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReadFileParams {
    /// File path, absolute or relative to the first allowed directory.
    pub path: String,
    /// Line offset (0-indexed). Default: 0.
    #[serde(default)]
    pub offset: Option<usize>,
    /// Maximum number of lines to return. Default: 2000.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

struct ReadFile(Arc<AllowedDirs>);

#[async_trait]
impl Operation for ReadFile {
    fn description(&self) -> &str {
        "Read the contents of a file. Supports line offset and limit."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_of::<ReadFileParams>()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let params: ReadFileParams = parse_args(args)?;
        let path = self.0.resolve_existing(Path::new(&params.path))?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| OperationError::ExecutionError(format!("Failed to read file: {e}")))?;

        let lines: Vec<&str> = content.lines().collect();
        let total_lines = lines.len();
        let offset = params.offset.unwrap_or(0);

        if offset >= total_lines {
            return Ok(OperationOutput::success_with_metadata(
                format!("(empty: offset {offset} exceeds {total_lines} total lines)"),
                serde_json::json!({"total_lines": total_lines}),
            ));
        }

        let end = offset.saturating_add(params.limit).min(total_lines);
        let mut output = lines[offset..end].join("\n");
        if output.len() > MAX_OUTPUT_BYTES {
            let mut cut = MAX_OUTPUT_BYTES;
            while !output.is_char_boundary(cut) {
                cut -= 1;
            }
            output.truncate(cut);
            output.push_str(&format!(
                "\n\n... (truncated at 50KB, showing {end}/{total_lines} lines)"
            ));
        } else if end < total_lines {
            output.push_str(&format!(
                "\n\n({end}/{total_lines} lines shown, use offset to see more)"
            ));
        }

        Ok(OperationOutput::success_with_metadata(
            output,
            serde_json::json!({
                "path": path.display().to_string(),
                "total_lines": total_lines,
                "offset": offset,
                "lines_shown": end - offset,
            }),
        ))
    }
}

// -- write_file --

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct WriteFileParams {
    /// File path to write.
    pub path: String,
    /// Content to write to the file.
    pub content: String,
}

struct WriteFile(Arc<AllowedDirs>);

#[async_trait]
impl Operation for WriteFile {
    fn description(&self) -> &str {
        "Create or overwrite a file with the given content. Creates parent directories if needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_of::<WriteFileParams>()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let params: WriteFileParams = parse_args(args)?;
        let path = self.0.resolve_for_write(Path::new(&params.path))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                OperationError::ExecutionError(format!("Failed to create directories: {e}"))
            })?;
        }

        let bytes = params.content.len();
        tokio::fs::write(&path, &params.content)
            .await
            .map_err(|e| OperationError::ExecutionError(format!("Failed to write file: {e}")))?;

        tracing::debug!(path = %path.display(), bytes, "wrote file");
        Ok(OperationOutput::success_with_metadata(
            format!("Wrote {bytes} bytes to {}", self.0.display_relative(&path)),
            serde_json::json!({"bytes": bytes}),
        ))
    }
}

// -- list_directory --

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListDirectoryParams {
    /// Directory to list. Default: the first allowed directory.
    #[serde(default)]
    pub path: Option<String>,
}

struct ListDirectory(Arc<AllowedDirs>);

#[async_trait]
impl Operation for ListDirectory {
    fn description(&self) -> &str {
        "List the entries of a directory, marking each as [DIR] or [FILE]."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_of::<ListDirectoryParams>()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let params: ListDirectoryParams = parse_args(args)?;
        let path = self.0.resolve_existing(Path::new(params.path.as_deref().unwrap_or(".")))?;
        if !path.is_dir() {
            return Err(OperationError::InvalidParameters(format!(
                "'{}' is not a directory",
                path.display()
            )));
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            entries.push((entry.file_name().to_string_lossy().to_string(), is_dir));
        }
        entries.sort();

        let count = entries.len();
        let output = if entries.is_empty() {
            "(empty directory)".to_string()
        } else {
            entries
                .iter()
                .map(|(name, is_dir)| {
                    if *is_dir {
                        format!("[DIR] {name}")
                    } else {
                        format!("[FILE] {name}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(OperationOutput::success_with_metadata(
            output,
            serde_json::json!({"count": count}),
        ))
    }
}

// -- search_files --

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchFilesParams {
    /// Glob pattern relative to the search root (e.g. `**/*.rs`).
    pub pattern: String,
    /// Directory to search. Default: the first allowed directory.
    #[serde(default)]
    pub path: Option<String>,
    /// Only report files whose contents match this regex.
    #[serde(default)]
    pub contains: Option<String>,
}

struct SearchFiles(Arc<AllowedDirs>);

#[async_trait]
impl Operation for SearchFiles {
    fn description(&self) -> &str {
        "Find files matching a glob pattern, optionally filtered by a content regex. Respects .gitignore."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_of::<SearchFilesParams>()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let params: SearchFilesParams = parse_args(args)?;
        let root = self.0.resolve_existing(Path::new(params.path.as_deref().unwrap_or(".")))?;

        let glob_pattern = glob::Pattern::new(&params.pattern)
            .map_err(|e| OperationError::InvalidParameters(format!("Invalid glob pattern: {e}")))?;
        let contains = params
            .contains
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| OperationError::InvalidParameters(format!("Invalid regex: {e}")))?;

        let walker = WalkBuilder::new(&root).git_ignore(true).hidden(false).build();

        let mut matches: Vec<String> = Vec::new();
        for entry in walker.flatten() {
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let rel_str = rel.to_string_lossy();
            if !glob_pattern.matches(&rel_str) {
                continue;
            }
            if let Some(re) = &contains {
                // Unreadable and binary files never match a content filter.
                match std::fs::read_to_string(entry.path()) {
                    Ok(content) if re.is_match(&content) => {}
                    _ => continue,
                }
            }
            matches.push(rel_str.to_string());
            if matches.len() >= MAX_RESULTS {
                break;
            }
        }

        matches.sort();
        let truncated = matches.len() >= MAX_RESULTS;
        let count = matches.len();
        let mut output = matches.join("\n");
        if truncated {
            output.push_str(&format!("\n\n... (truncated at {MAX_RESULTS} results)"));
        }
        if output.is_empty() {
            output = "(no matching files)".to_string();
        }

        Ok(OperationOutput::success_with_metadata(
            output,
            serde_json::json!({"count": count, "truncated": truncated}),
        ))
    }
}

// -- delete_file --

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteFileParams {
    /// File to delete. Directories are refused.
    pub path: String,
}

struct DeleteFile(Arc<AllowedDirs>);

#[async_trait]
impl Operation for DeleteFile {
    fn description(&self) -> &str {
        "Delete a single file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_of::<DeleteFileParams>()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let params: DeleteFileParams = parse_args(args)?;
        let path = self.0.resolve_existing(Path::new(&params.path))?;
        if path.is_dir() {
            return Err(OperationError::InvalidParameters(format!(
                "'{}' is a directory",
                params.path
            )));
        }
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| OperationError::ExecutionError(format!("Failed to delete file: {e}")))?;
        tracing::info!(path = %path.display(), "deleted file");
        Ok(OperationOutput::success(format!("Deleted {}", self.0.display_relative(&path))))
    }
}

// -- file:// resource --

struct FileResource(Arc<AllowedDirs>);

#[async_trait]
impl ResourceProvider for FileResource {
    fn description(&self) -> &str {
        "Contents of a file within the allowed directories"
    }

    async fn read(&self, uri: &str) -> Result<ResourceContent, OperationError> {
        let raw = uri
            .strip_prefix("file://")
            .ok_or_else(|| OperationError::InvalidParameters(format!("not a file URI: {uri}")))?;
        let path = self.0.resolve_existing(Path::new(raw))?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| OperationError::ExecutionError(format!("Failed to read file: {e}")))?;
        Ok(ResourceContent {
            uri: uri.to_string(),
            mime_type: mime_type(&path).to_string(),
            text,
        })
    }
}

fn mime_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => "application/json",
        Some("yaml" | "yml") => "application/yaml",
        Some("md") => "text/markdown",
        Some("html" | "htm") => "text/html",
        Some("csv") => "text/csv",
        Some("toml") => "application/toml",
        _ => "text/plain",
    }
}
