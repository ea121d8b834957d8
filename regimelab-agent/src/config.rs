//! Pipeline configuration: per-engine configs with explicit defaults,
//! TOML loading and a deterministic fingerprint.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use regimelab_core::capital::CapitalConfig;
use regimelab_core::regime::RegimeConfig;
use regimelab_core::sentiment::SentimentConfig;
use regimelab_core::volatility::VolatilityConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// All engine configurations for one pipeline. Every field has a default,
/// so a partial TOML file only overrides what it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub regime: RegimeConfig,

    #[serde(default)]
    pub volatility: VolatilityConfig,

    #[serde(default)]
    pub sentiment: SentimentConfig,

    #[serde(default)]
    pub capital: CapitalConfig,
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Ok(Self::from_toml_str(&raw)?)
    }

    /// Static validation across all engines; stage-time validation still
    /// runs per engine so a bad section degrades only its own stage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.volatility
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.sentiment
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.capital
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.regime.k == 0 {
            return Err(ConfigError::Invalid("regime.k must be >= 1".into()));
        }
        Ok(())
    }

    /// Content-addressable fingerprint: identical configs hash identically,
    /// so runs can be matched to the parameters that produced them.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("PipelineConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
