//! Naive CTR pipeline configuration loading and validation.
//!
//! This crate provides:
//! - A typed `PipelineConfig` with serde defaults for every field
//! - JSON loading with fallback to the embedded default
//! - Semantic validation
//! - Config snapshots (hashed) stamped onto fitted estimators
//! - JSON schema export for the config file format

pub mod pipeline;
pub mod snapshot;
pub mod validate;

pub use pipeline::{
    config_json_schema, ConfigError, LogFormat, LoggingConfig, PipelineConfig, VariantSelection,
    ZeroImpressionPolicy,
};
pub use snapshot::ConfigSnapshot;
pub use validate::{ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
