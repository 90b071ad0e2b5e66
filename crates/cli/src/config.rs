//! Configuration file format for `tally`.
//!
//! Every key is optional; anything left out falls back to the built-in
//! defaults below. Command-line flags override the file.
//!
//! # Example
//!
//! ```toml
//! [policy]
//! target_type = "dataset"
//! threshold = 150.0
//! discriminator_key = "type"
//! attribute_key = "memory_percent"
//!
//! [store]
//! path = "object_store.db"
//! busy_timeout_ms = 5000
//!
//! [report]
//! path = "analysis_report.md"
//! format = "markdown"
//! ```

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;
use tally_eval::{AggregationPolicy, DEFAULT_ATTRIBUTE_KEY, DEFAULT_DISCRIMINATOR_KEY};
use tally_storage::{SqliteStoreConfig, DEFAULT_BUSY_TIMEOUT_MS};

pub const DEFAULT_TARGET_TYPE: &str = "dataset";
pub const DEFAULT_THRESHOLD: f64 = 150.0;
pub const DEFAULT_STORE_PATH: &str = "object_store.db";
pub const DEFAULT_REPORT_PATH: &str = "analysis_report.md";

// ── Types ─────────────────────────────────────────────────────────────────────

/// Top-level configuration, loaded from `tally --config <FILE>`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub policy: PolicyConfig,
    pub store: StoreConfig,
    pub report: ReportConfig,
}

/// `[policy]` section -- what to aggregate and the compliance limit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub target_type: String,
    pub threshold: f64,
    pub discriminator_key: String,
    pub attribute_key: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            target_type: DEFAULT_TARGET_TYPE.to_string(),
            threshold: DEFAULT_THRESHOLD,
            discriminator_key: DEFAULT_DISCRIMINATOR_KEY.to_string(),
            attribute_key: DEFAULT_ATTRIBUTE_KEY.to_string(),
        }
    }
}

/// `[store]` section -- where the object store lives.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Rendering of the written report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

/// `[report]` section -- where and how the report is written.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub path: PathBuf,
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_REPORT_PATH),
            format: ReportFormat::Markdown,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub threshold: Option<f64>,
    pub target_type: Option<String>,
    pub store: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub format: Option<ReportFormat>,
}

// ── Functions ─────────────────────────────────────────────────────────────────

impl TallyConfig {
    /// Read `path` if given, otherwise use the defaults.
    ///
    /// Returns a human-readable error string on failure.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
                Self::parse(&content)
                    .map_err(|e| format!("could not parse '{}': {}", path.display(), e))
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides, then re-validate.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, String> {
        if let Some(threshold) = overrides.threshold {
            self.policy.threshold = threshold;
        }
        if let Some(target_type) = overrides.target_type {
            self.policy.target_type = target_type;
        }
        if let Some(store) = overrides.store {
            self.store.path = store;
        }
        if let Some(report) = overrides.report {
            self.report.path = report;
        }
        if let Some(format) = overrides.format {
            self.report.format = format;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), String> {
        if !self.policy.threshold.is_finite() {
            return Err(format!(
                "threshold must be a finite number, got {}",
                self.policy.threshold
            ));
        }
        if self.policy.target_type.is_empty() {
            return Err("target_type must not be empty".to_string());
        }
        Ok(())
    }

    pub fn policy(&self) -> AggregationPolicy {
        AggregationPolicy::new(self.policy.target_type.clone(), self.policy.threshold).with_keys(
            self.policy.discriminator_key.clone(),
            self.policy.attribute_key.clone(),
        )
    }

    pub fn store_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.store.path.clone(),
            busy_timeout_ms: self.store.busy_timeout_ms,
        }
    }
}
