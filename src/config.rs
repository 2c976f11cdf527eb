//! Configuration management for ReadEase using the prefer crate.
//!
//! The loaded `Config` is passed explicitly to whatever needs it; nothing
//! reads configuration from global state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::highlight::{CrossPagePolicy, HighlightStyle, HighlighterOptions};
use crate::ocr::OcrConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {format} config: {message}")]
    Parse { format: &'static str, message: String },
}

/// Highlight rendering and matching settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Fill color and opacity of highlight rectangles.
    #[serde(flatten)]
    pub style: HighlightStyle,
    /// What to do with phrases that continue onto the next page.
    #[serde(default)]
    pub cross_page: CrossPagePolicy,
    /// Drop OCR words below this confidence (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f32>,
}

impl HighlightConfig {
    pub fn options(&self) -> HighlighterOptions {
        HighlighterOptions {
            style: self.style,
            cross_page: self.cross_page,
            min_confidence: self.min_confidence,
        }
    }
}

fn default_output_dir() -> String {
    "highlighted".to_string()
}

fn default_workers() -> usize {
    4
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Where highlighted pages and manifests are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Number of page workers for OCR and rendering.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Path the config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            highlight: HighlightConfig::default(),
            ocr: OcrConfig::default(),
            output_dir: default_output_dir(),
            workers: default_workers(),
            source_path: None,
        }
    }
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers readease config files in standard locations.
    pub async fn load() -> Self {
        // Use prefer for file discovery, then parse with serde
        match prefer::load("readease").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config {}: {}", path.display(), e);
                            Self::default_with_env()
                        }
                    }
                } else {
                    Self::default_with_env()
                }
            }
            // No config file found, use defaults with env overrides
            Err(_) => Self::default_with_env(),
        }
    }

    /// Create a default config with environment variable overrides applied.
    pub fn default_with_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config.with_env_overrides())
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            }),
            _ => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `READEASE_OPACITY`: highlight opacity (0.0-1.0)
    /// - `READEASE_OCR_LANG`: Tesseract language code
    /// - `READEASE_OUTPUT_DIR`: output directory
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(opacity) = env_var("READEASE_OPACITY").and_then(|v| v.parse::<f32>().ok()) {
            self.highlight.style.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(lang) = env_var("READEASE_OCR_LANG") {
            self.ocr.language = lang;
        }
        if let Some(dir) = env_var("READEASE_OUTPUT_DIR") {
            self.output_dir = dir;
        }
        self
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Output directory, resolved against the config file location or CWD.
    pub fn output_path(&self) -> PathBuf {
        let base = self
            .base_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        self.resolve_path(&self.output_dir, &base)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.highlight.style.opacity, 0.4);
        assert_eq!(config.highlight.cross_page, CrossPagePolicy::Split);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn parse_toml() {
        let toml = r#"
output_dir = "out"
workers = 2

[highlight]
color = [255, 0, 0]
opacity = 0.25
cross_page = "ignore"
min_confidence = 40.0

[ocr]
language = "spa"
"#;
        let config = Config::parse(toml, Path::new("readease.toml")).unwrap();
        assert_eq!(config.output_dir, "out");
        assert_eq!(config.highlight.style.color, [255, 0, 0]);
        assert_eq!(config.highlight.style.opacity, 0.25);
        assert_eq!(config.highlight.cross_page, CrossPagePolicy::Ignore);
        assert_eq!(config.highlight.min_confidence, Some(40.0));
        assert_eq!(config.ocr.language, "spa");
        assert_eq!(config.ocr.dpi, 200);
    }

    #[test]
    fn parse_json_and_yaml() {
        let json = Config::parse(r#"{"workers": 8}"#, Path::new("c.json")).unwrap();
        assert_eq!(json.workers, 8);
        assert_eq!(json.output_dir, "highlighted");

        let yaml = Config::parse("highlight:\n  opacity: 0.6\n", Path::new("c.yml")).unwrap();
        assert_eq!(yaml.highlight.style.opacity, 0.6);
    }

    #[test]
    fn parse_error_names_format() {
        let err = Config::parse("workers = ", Path::new("c.toml")).unwrap_err();
        assert!(err.to_string().contains("TOML"));
    }

    #[tokio::test]
    async fn load_from_path_sets_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readease.toml");
        std::fs::write(&path, "output_dir = \"pages\"\n").unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
        if std::env::var("READEASE_OUTPUT_DIR").is_err() {
            assert_eq!(config.output_path(), dir.path().join("pages"));
        }
    }

    #[test]
    fn resolve_absolute_path() {
        let config = Config::default();
        assert_eq!(
            config.resolve_path("/tmp/out", Path::new("/base")),
            PathBuf::from("/tmp/out")
        );
        assert_eq!(
            config.resolve_path("out", Path::new("/base")),
            PathBuf::from("/base/out")
        );
    }
}
