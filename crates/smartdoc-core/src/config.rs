//! Configuration for smartdoc
//!
//! Loaded from `<config_dir>/smartdoc/config.toml`. Every field has a default,
//! so a missing file (or a partial one) is always usable.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartDocConfig {
    pub backend: BackendConfig,
    pub pricing: PricingConfig,
    pub progress: ProgressConfig,
    pub export: ExportConfig,
}

/// Backend analysis endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Full URL of the analyze endpoint
    pub url: String,

    /// Request timeout; `None` waits as long as the backend takes
    pub timeout_secs: Option<u64>,

    /// Bearer token forwarded as `Authorization` header
    pub bearer_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/api/analyze".to_string(),
            timeout_secs: None,
            bearer_token: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Usage-based billing rates (USD)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Charged per document on every completed analysis
    pub per_document: f64,

    /// Flat charge per export action
    pub per_export: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            per_document: 0.10,
            per_export: 2.00,
        }
    }
}

impl PricingConfig {
    /// Per-document rate in whole cents
    pub fn per_document_cents(&self) -> u64 {
        dollars_to_cents(self.per_document)
    }

    /// Export rate in whole cents
    pub fn per_export_cents(&self) -> u64 {
        dollars_to_cents(self.per_export)
    }
}

/// Highest accepted rate (USD)
pub const MAX_PRICE: f64 = 1_000_000.0;

fn dollars_to_cents(amount: f64) -> u64 {
    (amount * 100.0).round().max(0.0) as u64
}

/// Cosmetic progress animation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Interval between percentage updates (one animation frame)
    pub tick_interval_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
        }
    }
}

impl ProgressConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Report file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Markdown,
}

impl ExportFormat {
    /// Parse from CLI string ("json" | "markdown" | "md")
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "markdown" | "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// Report export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub format: ExportFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            format: ExportFormat::Json,
        }
    }
}

impl SmartDocConfig {
    /// Default config location (`~/.config/smartdoc/config.toml` on Linux)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("smartdoc").join("config.toml"))
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| CoreError::ConfigParse {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Reject values the ledger and animation cannot work with
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in [
            ("pricing.per_document", self.pricing.per_document),
            ("pricing.per_export", self.pricing.per_export),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::InvalidConfig {
                    message: format!("{} must be a non-negative amount, got {}", name, value),
                });
            }
            if value > MAX_PRICE {
                return Err(CoreError::InvalidConfig {
                    message: format!("{} must not exceed {}, got {}", name, MAX_PRICE, value),
                });
            }
        }

        if self.progress.tick_interval_ms == 0 {
            return Err(CoreError::InvalidConfig {
                message: "progress.tick_interval_ms must be at least 1".to_string(),
            });
        }

        if self.backend.url.trim().is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "backend.url must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SmartDocConfig::default();
        assert_eq!(config.pricing.per_document_cents(), 10);
        assert_eq!(config.pricing.per_export_cents(), 200);
        assert_eq!(config.progress.tick_interval(), Duration::from_millis(16));
        assert_eq!(config.backend.timeout(), None);
        assert_eq!(config.export.format, ExportFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[backend]\nurl = \"http://10.0.0.5:9000/api/analyze\"\ntimeout_secs = 30\n",
        )
        .unwrap();

        let config = SmartDocConfig::load(&path).unwrap();
        assert_eq!(config.backend.url, "http://10.0.0.5:9000/api/analyze");
        assert_eq!(config.backend.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.pricing, PricingConfig::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SmartDocConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, SmartDocConfig::default());
    }

    #[test]
    fn test_parse_error_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pricing\nper_document = ").unwrap();

        let err = SmartDocConfig::load(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigParse { .. }));
    }

    #[test]
    fn test_negative_price_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pricing]\nper_export = -1.0\n").unwrap();

        let err = SmartDocConfig::load(&path).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }

    #[test]
    fn test_oversized_price_rejected() {
        let mut config = SmartDocConfig::default();
        config.pricing.per_document = 1e30;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pricing.per_document must not exceed"));

        config.pricing.per_document = MAX_PRICE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!(ExportFormat::parse("JSON"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("md"), Some(ExportFormat::Markdown));
        assert_eq!(ExportFormat::parse("pdf"), None);
        assert_eq!(ExportFormat::Markdown.extension(), "md");
    }
}
