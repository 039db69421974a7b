//! Enumerates candidate module units in a modules directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Names starting with this marker are private helpers, never modules.
pub const PRIVATE_PREFIX: &str = "_";

/// Unit names reserved for infrastructure rather than tools.
pub const EXCLUDED_UNITS: &[&str] = &["mod", "lib", "capability", "registry"];

/// Where a discovered module came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleLocation {
    File(PathBuf),
    Builtin,
}

/// A discovered candidate module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    name: String,
    location: ModuleLocation,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, location: ModuleLocation) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    pub fn builtin(name: impl Into<String>) -> Self {
        Self::new(name, ModuleLocation::Builtin)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &ModuleLocation {
        &self.location
    }
}

/// Lists module units in a directory.
///
/// Only regular files directly inside the directory are considered; the unit
/// name is the file stem.
#[derive(Debug, Clone, Default)]
pub struct ModuleScanner {
    extension: Option<String>,
}

impl ModuleScanner {
    /// Scanner accepting files with any extension.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept files with this extension (without the leading dot).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into().trim_start_matches('.').to_string());
        self
    }

    /// Unit name for a file name, or `None` when the file is not a candidate.
    pub fn candidate_name(&self, file_name: &str) -> Option<String> {
        if file_name.starts_with(PRIVATE_PREFIX) {
            return None;
        }
        let path = Path::new(file_name);
        if let Some(wanted) = &self.extension {
            if path.extension().and_then(|ext| ext.to_str()) != Some(wanted.as_str()) {
                return None;
            }
        }
        let stem = path.file_stem()?.to_str()?;
        if stem.is_empty() || EXCLUDED_UNITS.contains(&stem) {
            return None;
        }
        Some(stem.to_string())
    }

    /// Scan `dir` for candidate modules, sorted by name.
    ///
    /// A missing or unreadable directory yields an empty list. Files sharing
    /// a stem are reported once, under the first file name in sort order.
    pub fn scan(&self, dir: &Path) -> Vec<ModuleDescriptor> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "cannot read modules directory");
                return Vec::new();
            }
        };

        let mut files: Vec<(String, PathBuf)> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let file_name = entry.file_name().to_str()?.to_string();
                Some((file_name, entry.path()))
            })
            .collect();
        // read_dir order is platform-dependent; the first file name wins a shared stem.
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut seen = BTreeSet::new();
        let mut descriptors = Vec::new();
        for (file_name, path) in files {
            if let Some(name) = self.candidate_name(&file_name) {
                if seen.insert(name.clone()) {
                    descriptors.push(ModuleDescriptor::new(name, ModuleLocation::File(path)));
                }
            }
        }
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!(dir = %dir.display(), count = descriptors.len(), "scanned modules directory");
        descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(descriptors: &[ModuleDescriptor]) -> Vec<&str> {
        descriptors.iter().map(ModuleDescriptor::name).collect()
    }

    #[test]
    fn test_scan_skips_private_and_infrastructure() {
        let dir = TempDir::new().unwrap();
        for file in ["beta.rs", "alpha.rs", "_helpers.rs", "mod.rs", "registry.rs"] {
            fs::write(dir.path().join(file), "").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();

        let found = ModuleScanner::new().scan(dir.path());
        assert_eq!(names(&found), vec!["alpha", "beta"]);
        assert_eq!(
            found[0].location(),
            &ModuleLocation::File(dir.path().join("alpha.rs"))
        );
    }

    #[test]
    fn test_extension_filter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("alpha.rs"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();

        let found = ModuleScanner::new().with_extension(".rs").scan(dir.path());
        assert_eq!(names(&found), vec!["alpha"]);
    }

    #[test]
    fn test_same_stem_reported_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("alpha.rs"), "").unwrap();
        fs::write(dir.path().join("alpha.toml"), "").unwrap();

        fs::write(dir.path().join("alpha.json"), "").unwrap();

        let found = ModuleScanner::new().scan(dir.path());
        assert_eq!(names(&found), vec!["alpha"]);
        assert_eq!(
            found[0].location(),
            &ModuleLocation::File(dir.path().join("alpha.json"))
        );
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(ModuleScanner::new()
            .scan(&dir.path().join("does-not-exist"))
            .is_empty());
    }

    #[test]
    fn test_candidate_name() {
        let scanner = ModuleScanner::new();
        assert_eq!(scanner.candidate_name("news_api.rs").as_deref(), Some("news_api"));
        assert_eq!(scanner.candidate_name("_private.rs"), None);
        assert_eq!(scanner.candidate_name("lib.rs"), None);
        assert_eq!(scanner.candidate_name("capability"), None);
    }
}
