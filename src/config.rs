//! User configuration
//!
//! Read from `config.toml` in the platform config directory. Every field is
//! optional; a missing file means all defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::db::Database;
use crate::listing::SortKey;
use crate::models::DocumentKind;

/// Cap for general uploads, in MB.
pub const DEFAULT_MAX_SIZE_MB: u64 = 5;
/// Cap for résumé and cover-letter attachments, in MB.
pub const DEFAULT_MAX_DOCUMENT_MB: u64 = 10;
/// Cap for an exported JSON file read back by `import`, in MB.
pub const DEFAULT_IMPORT_MAX_MB: u64 = 200;

#[cfg(target_os = "macos")]
const DEFAULT_VIEWER: &str = "open -W";
#[cfg(not(target_os = "macos"))]
const DEFAULT_VIEWER: &str = "xdg-open";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub upload: UploadConfig,
    pub import: ImportConfig,
    pub viewer: ViewerConfig,
    pub list: ListConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_size_mb: u64,
    pub max_document_mb: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            max_document_mb: DEFAULT_MAX_DOCUMENT_MB,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub max_size_mb: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_size_mb: DEFAULT_IMPORT_MAX_MB,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub pdf: String,
    pub docx: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            pdf: DEFAULT_VIEWER.to_string(),
            docx: DEFAULT_VIEWER.to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn for_kind(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::Pdf => &self.pdf,
            DocumentKind::Docx => &self.docx,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    pub default_sort: SortKey,
    pub descending: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_sort: SortKey::Date,
            descending: true,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "jobtrack")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Missing file yields defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(Database::default_path)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.upload.max_size_mb, 5);
        assert_eq!(config.upload.max_document_mb, 10);
        assert_eq!(config.import.max_size_mb, DEFAULT_IMPORT_MAX_MB);
        assert_eq!(config.list.default_sort, SortKey::Date);
        assert!(config.list.descending);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            database_path = "/tmp/jobs.db"

            [upload]
            max_document_mb = 20

            [import]
            max_size_mb = 50

            [viewer]
            pdf = "zathura"

            [list]
            default_sort = "company"
            "#,
        )
        .unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/jobs.db"));
        assert_eq!(config.upload.max_document_mb, 20);
        assert_eq!(config.upload.max_size_mb, 5);
        assert_eq!(config.import.max_size_mb, 50);
        assert_eq!(config.viewer.for_kind(DocumentKind::Pdf), "zathura");
        assert_eq!(config.viewer.for_kind(DocumentKind::Docx), DEFAULT_VIEWER);
        assert_eq!(config.list.default_sort, SortKey::Company);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(Config::parse("[upload]\nmax_size_mb = \"big\"").is_err());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.upload.max_size_mb, DEFAULT_MAX_SIZE_MB);
    }

    #[test]
    fn printed_config_parses_back() {
        let printed = Config::default().to_toml().unwrap();
        let reparsed = Config::parse(&printed).unwrap();
        assert_eq!(reparsed.viewer.pdf, DEFAULT_VIEWER);
    }
}
