//! Pipeline configuration types.
//!
//! Every field has a serde default, so an empty JSON object is a valid
//! config and partial files only override what they name.
//!
//! # Fallback Behavior
//!
//! [`PipelineConfig::load_or_default`] falls back to
//! [`PipelineConfig::default()`] on any error (missing file, parse failure,
//! failed validation).

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validate::{self, ValidationError};
use crate::CONFIG_SCHEMA_VERSION;

// ── Config types ────────────────────────────────────────────────────────

/// Which impression list feeds impression expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VariantSelection {
    /// Visible variant when any log row carries a visible-impressions
    /// override, raw variant otherwise.
    #[default]
    Auto,
    /// Impress rows only, full impression lists.
    Raw,
    /// Every row, impression lists replaced by a trusted visible override.
    Visible,
}

impl std::fmt::Display for VariantSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariantSelection::Auto => write!(f, "auto"),
            VariantSelection::Raw => write!(f, "raw"),
            VariantSelection::Visible => write!(f, "visible"),
        }
    }
}

/// CTR assigned to an item with clicks but zero impressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ZeroImpressionPolicy {
    /// Store a CTR of exactly 0.0.
    #[default]
    Zero,
    /// Leave the item out of the fitted table so it predicts as unseen.
    Unseen,
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Logging bootstrap settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    pub schema_version: String,

    pub variant: VariantSelection,

    pub zero_impression_policy: ZeroImpressionPolicy,

    pub logging: LoggingConfig,

    pub description: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            variant: VariantSelection::Auto,
            zero_impression_policy: ZeroImpressionPolicy::Zero,
            logging: LoggingConfig::default(),
            description: None,
        }
    }
}

/// Errors that can occur while loading a config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {}", format_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ConfigError> for ctr_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => ctr_common::Error::Io(e),
            ConfigError::Parse(e) => ctr_common::Error::Json(e),
            ConfigError::Invalid(ref errors)
                if errors.iter().any(|e| e.field == validate::SCHEMA_VERSION_FIELD) =>
            {
                ctr_common::Error::SchemaValidation(err.to_string())
            }
            ConfigError::Invalid(_) => ctr_common::Error::Config(err.to_string()),
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────────

impl PipelineConfig {
    /// Parse a config from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load from file with full error reporting.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load a config from a file, falling back to the default on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load_from_file(path).unwrap_or_default()
    }

    /// Run semantic validation.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        validate::validate_config(self).into_result()
    }

    /// Serialize the config to JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// JSON schema describing the config file format.
pub fn config_json_schema() -> serde_json::Value {
    let schema = schemars::schema_for!(PipelineConfig);
    serde_json::to_value(&schema).unwrap_or(serde_json::Value::Null)
}

// ── Tests ───────────────────────────────────────────────────────────────
