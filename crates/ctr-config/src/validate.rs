//! Semantic validation for pipeline configs.
//!
//! Serde already rejects unknown enum values; this layer checks what the
//! type system cannot.

use std::fmt;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::pipeline::PipelineConfig;
use crate::CONFIG_SCHEMA_VERSION;

/// Field name reported for schema version mismatches.
pub const SCHEMA_VERSION_FIELD: &str = "schema_version";

fn major(version: &str) -> Option<u32> {
    version.split('.').next()?.parse().ok()
}

/// Whether a config file version shares the current config major version.
pub fn is_compatible_config_version(version: &str) -> bool {
    major(version).is_some() && major(version) == major(CONFIG_SCHEMA_VERSION)
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Accumulated validation outcome.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }
}

/// Validate every field of a config, collecting all failures.
pub fn validate_config(config: &PipelineConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if !is_compatible_config_version(&config.schema_version) {
        result.push(ValidationError::new(
            SCHEMA_VERSION_FIELD,
            format!(
                "unsupported version {} (current {})",
                config.schema_version, CONFIG_SCHEMA_VERSION
            ),
        ));
    }

    // Same directive grammar as RUST_LOG: a bare level or `target=level` list.
    if let Err(e) = EnvFilter::try_new(&config.logging.level) {
        result.push(ValidationError::new(
            "logging.level",
            format!("invalid filter {:?}: {e}", config.logging.level),
        ));
    }

    result
}
