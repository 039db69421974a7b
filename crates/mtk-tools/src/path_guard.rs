//! Confines filesystem paths to a set of allowed directories.

use mtk_host::OperationError;
use std::path::{Component, Path, PathBuf};

/// Canonical roots a filesystem module may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedDirs {
    roots: Vec<PathBuf>,
}

impl AllowedDirs {
    /// Canonicalize `dirs`, expanding a leading `~`. Directories that do not
    /// exist are skipped with a warning.
    pub fn new<I, S>(dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roots = Vec::new();
        for dir in dirs {
            let expanded = expand_home(dir.as_ref());
            match expanded.canonicalize() {
                Ok(root) if root.is_dir() => {
                    if !roots.contains(&root) {
                        roots.push(root);
                    }
                }
                Ok(root) => {
                    tracing::warn!(dir = %root.display(), "allowed path is not a directory, skipping");
                }
                Err(err) => {
                    tracing::warn!(dir = %expanded.display(), error = %err, "cannot resolve allowed directory, skipping");
                }
            }
        }
        Self { roots }
    }

    /// Only the current working directory.
    pub fn current() -> Self {
        match std::env::current_dir() {
            Ok(dir) => Self::new([dir.to_string_lossy()]),
            Err(_) => Self { roots: Vec::new() },
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The root relative paths are resolved against.
    fn primary(&self) -> Result<&Path, OperationError> {
        self.roots
            .first()
            .map(PathBuf::as_path)
            .ok_or_else(|| OperationError::PermissionDenied("no allowed directories configured".to_string()))
    }

    /// Resolve an existing path and ensure it is inside an allowed root.
    pub fn resolve_existing(&self, path: &Path) -> Result<PathBuf, OperationError> {
        let candidate = absolutize(path, self.primary()?);
        let canonical = candidate
            .canonicalize()
            .map_err(|e| OperationError::ExecutionError(format!("Cannot resolve path: {e}")))?;
        self.ensure_allowed(path, &canonical)?;
        Ok(canonical)
    }

    /// Resolve a possibly new path and ensure it is inside an allowed root.
    pub fn resolve_for_write(&self, path: &Path) -> Result<PathBuf, OperationError> {
        let candidate = absolutize(path, self.primary()?);
        let resolved = if candidate.exists() {
            candidate
                .canonicalize()
                .map_err(|e| OperationError::ExecutionError(format!("Cannot resolve path: {e}")))?
        } else {
            let (existing_base, tail) = split_existing_ancestor(&candidate)?;
            existing_base.join(tail)
        };
        self.ensure_allowed(path, &resolved)?;
        Ok(resolved)
    }

    /// Display form of `path` relative to the root containing it.
    pub fn display_relative(&self, path: &Path) -> String {
        self.roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
            .map(|rel| rel.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string())
    }

    fn ensure_allowed(&self, original: &Path, resolved: &Path) -> Result<(), OperationError> {
        if self.roots.iter().any(|root| resolved.starts_with(root)) {
            return Ok(());
        }
        Err(OperationError::PermissionDenied(format!(
            "Path '{}' is outside the allowed directories",
            original.display()
        )))
    }
}

fn expand_home(dir: &str) -> PathBuf {
    if dir == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(dir));
    }
    match (dir.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(dir),
    }
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}

fn split_existing_ancestor(path: &Path) -> Result<(PathBuf, PathBuf), OperationError> {
    let unresolvable = || OperationError::ExecutionError(format!("Cannot resolve path: {}", path.display()));
    let mut existing = path.to_path_buf();
    let mut tail = PathBuf::new();

    while !existing.exists() {
        let name = existing.file_name().ok_or_else(unresolvable)?;
        tail = if tail.as_os_str().is_empty() {
            PathBuf::from(name)
        } else {
            PathBuf::from(name).join(&tail)
        };
        existing = existing.parent().ok_or_else(unresolvable)?.to_path_buf();
    }

    let canonical_existing = existing
        .canonicalize()
        .map_err(|e| OperationError::ExecutionError(format!("Cannot resolve path: {e}")))?;
    Ok((canonical_existing, tail))
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::RootDir => out.push(component.as_os_str()),
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::Normal(seg) => out.push(seg),
        }
    }
    out
}
