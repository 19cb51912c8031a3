//! Configuration management for the churn dashboard

use crate::types::prediction::RiskBucketThresholds;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub scoring: ScoringConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum upload size in MiB (0 = unlimited)
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_mb: 0,
        }
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Fitted classifier (.onnx or .json)
    pub model_path: String,
    /// JSON array of feature names, in training order
    pub feature_names_path: String,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            model_path: "models/churn_model.json".to_string(),
            feature_names_path: "models/feature_names.json".to_string(),
            onnx_threads: 1,
        }
    }
}

/// Scoring and presentation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Single-customer verdict threshold
    pub verdict_threshold: f64,
    /// Batch risk bucket thresholds
    pub risk_buckets: RiskBucketThresholds,
    /// Scored rows shown after a batch upload
    pub preview_rows: usize,
    /// Raw rows shown before validation
    pub upload_preview_rows: usize,
    /// File name offered for the scored download
    pub download_filename: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            verdict_threshold: 0.4,
            risk_buckets: RiskBucketThresholds::default(),
            preview_rows: 20,
            upload_preview_rows: 5,
            download_filename: "churn_predictions.csv".to_string(),
        }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between summary log lines (0 = disabled)
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 300,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file, or defaults if it is absent
    pub fn load() -> Result<Self> {
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_path(DEFAULT_CONFIG_PATH)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.scoring
            .risk_buckets
            .validate()
            .context("Invalid [scoring.risk_buckets]")?;
        if !(0.0..=1.0).contains(&self.scoring.verdict_threshold) {
            anyhow::bail!(
                "scoring.verdict_threshold must lie in [0, 1], got {}",
                self.scoring.verdict_threshold
            );
        }
        if self.scoring.download_filename.trim().is_empty() {
            anyhow::bail!("scoring.download_filename must not be empty");
        }
        Ok(())
    }

    /// Maximum request body in bytes, `None` when unlimited
    pub fn max_upload_bytes(&self) -> Option<usize> {
        match self.server.max_upload_mb {
            0 => None,
            mb => Some(mb.saturating_mul(1024).saturating_mul(1024)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.scoring.verdict_threshold, 0.4);
        assert_eq!(config.scoring.risk_buckets.medium, 0.4);
        assert_eq!(config.scoring.risk_buckets.high, 0.7);
        assert_eq!(config.scoring.preview_rows, 20);
        assert_eq!(config.scoring.download_filename, "churn_predictions.csv");
        assert_eq!(config.max_upload_bytes(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[server]\nport = 9000\nmax_upload_mb = 2\n").unwrap();
        writeln!(file, "[scoring.risk_buckets]\nmedium = 0.3\nhigh = 0.8\n").unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.max_upload_bytes(), Some(2 * 1024 * 1024));
        assert_eq!(config.scoring.risk_buckets.medium, 0.3);
        assert_eq!(config.scoring.verdict_threshold, 0.4);
        assert_eq!(config.models.model_path, "models/churn_model.json");
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scoring.risk_buckets]\nmedium = 0.9\nhigh = 0.5\n").unwrap();

        assert!(AppConfig::load_from_path(file.path()).is_err());
    }
}
