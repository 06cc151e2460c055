use crate::config::ConverterConfig;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Version constants stamped on every run
pub mod versions {
    pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
    /// Bump when the standard rule list or a rule's output changes
    pub const RULESET_VERSION: &str = "1.0.0";
}

/// Identifies one conversion run and the exact inputs that produced it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub converted_at: DateTime<Utc>,
    pub input_hash: String,
    pub config_hash: String,
    pub engine_version: String,
    pub ruleset_version: String,
}

impl RunMetadata {
    pub fn new(input: &str, config_hash: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            converted_at: Utc::now(),
            input_hash: calculate_input_hash(input),
            config_hash: config_hash.to_string(),
            engine_version: versions::ENGINE_VERSION.to_string(),
            ruleset_version: versions::RULESET_VERSION.to_string(),
        }
    }
}

/// SHA-256 of the source text
pub fn calculate_input_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of the serialized configuration, so two runs can be compared
pub fn calculate_config_hash(config: &ConverterConfig) -> Result<String> {
    let config_json = serde_json::to_string(config)
        .map_err(|e| anyhow!("Failed to serialize config for hashing: {}", e))?;

    let mut hasher = Sha256::new();
    hasher.update(config_json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
