//! Hashed config snapshots.
//!
//! A snapshot pins the exact config a CTR table was fitted with. The hash
//! is the SHA-256 of the config's compact JSON form, so equal configs
//! always hash equally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::pipeline::{ConfigError, PipelineConfig};

/// Config captured at fit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub config: PipelineConfig,
    /// SHA-256 hex digest of the JSON-serialized `config`.
    pub config_hash: String,
    pub captured_at: DateTime<Utc>,
}

impl ConfigSnapshot {
    /// Capture a config, computing its hash.
    pub fn capture(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            config_hash: config_hash(config)?,
            config: config.clone(),
            captured_at: Utc::now(),
        })
    }

    /// Whether the stored hash still matches the stored config.
    pub fn verify(&self) -> bool {
        config_hash(&self.config)
            .map(|h| h == self.config_hash)
            .unwrap_or(false)
    }
}

/// SHA-256 hex digest of a config.
pub fn config_hash(config: &PipelineConfig) -> Result<String, ConfigError> {
    let json = serde_json::to_string(config)?;
    Ok(sha256_hex(json.as_bytes()))
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
