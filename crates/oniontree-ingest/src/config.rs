use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Import root; each immediate subdirectory is a tag.
    pub root: PathBuf,
    /// Empty the managed tables before importing.
    pub truncate: bool,
    /// Descriptor file extensions (lowercase, without dot).
    pub extensions: Vec<String>,
    /// Enumerate files in name order instead of directory order.
    pub sorted: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data/tagged"),
            truncate: false,
            extensions: vec!["yaml".to_string(), "yml".to_string()],
            sorted: false,
        }
    }
}

impl ImportConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Whether `path` has one of the configured descriptor extensions.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| *allowed == ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_command_line() {
        let config = ImportConfig::default();
        assert_eq!(config.root, PathBuf::from("./data/tagged"));
        assert!(!config.truncate);
        assert!(!config.sorted);
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        let config = ImportConfig::default();
        assert!(config.accepts(Path::new("a/b.yaml")));
        assert!(config.accepts(Path::new("a/b.YML")));
        assert!(!config.accepts(Path::new("a/README.md")));
        assert!(!config.accepts(Path::new("a/noext")));
    }
}
