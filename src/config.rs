//! TOML configuration for indexing runs.
//!
//! ```toml
//! [index]
//! chunk_size = 4096
//! workers = 4
//! associated_words = 5
//! stop_timeout_secs = 5
//!
//! [features]
//! strategy = "word"     # or "ngram"
//! normalize = true
//! ngram_size = 3
//! ngram_step = 1
//! ```
//!
//! Every key is optional. Command-line flags override file values, which
//! override the defaults shown above.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::features::{FeatureConfig, DEFAULT_NGRAM_SIZE, DEFAULT_NGRAM_STEP};

pub const DEFAULT_CHUNK_SIZE: usize = 4096;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_ASSOCIATED_WORDS: usize = 5;

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_associated_words")]
    pub associated_words: usize,
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_workers() -> usize {
    DEFAULT_WORKERS
}
fn default_associated_words() -> usize {
    DEFAULT_ASSOCIATED_WORDS
}
fn default_stop_timeout_secs() -> u64 {
    5
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            associated_words: DEFAULT_ASSOCIATED_WORDS,
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

impl IndexConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FeaturesConfig {
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_normalize")]
    pub normalize: bool,
    #[serde(default = "default_ngram_size")]
    pub ngram_size: usize,
    #[serde(default = "default_ngram_step")]
    pub ngram_step: usize,
}

fn default_strategy() -> String {
    "word".to_string()
}
fn default_normalize() -> bool {
    true
}
fn default_ngram_size() -> usize {
    DEFAULT_NGRAM_SIZE
}
fn default_ngram_step() -> usize {
    DEFAULT_NGRAM_STEP
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            normalize: true,
            ngram_size: DEFAULT_NGRAM_SIZE,
            ngram_step: DEFAULT_NGRAM_STEP,
        }
    }
}

impl FeaturesConfig {
    /// The extractor configuration handed to each worker.
    pub fn to_feature_config(&self) -> Result<FeatureConfig> {
        match self.strategy.as_str() {
            "word" => Ok(FeatureConfig::Word {
                normalize: self.normalize,
            }),
            "ngram" => Ok(FeatureConfig::Ngram {
                n: self.ngram_size,
                step: self.ngram_step,
                normalize: self.normalize,
            }),
            other => Err(Error::Config(format!(
                "unknown feature strategy '{}'; must be word or ngram",
                other
            ))),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.index.chunk_size == 0 {
            return Err(Error::Config("index.chunk_size must be >= 1".to_string()));
        }
        if self.index.workers == 0 {
            return Err(Error::Config("index.workers must be >= 1".to_string()));
        }
        if self.features.ngram_size == 0 {
            return Err(Error::Config("features.ngram_size must be >= 1".to_string()));
        }
        if self.features.ngram_step == 0 {
            return Err(Error::Config("features.ngram_step must be >= 1".to_string()));
        }
        self.features.to_feature_config()?;
        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)
        .map_err(|e| Error::Config(format!("failed to parse config file: {}", e)))?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a config file; `None` yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let content =
        std::fs::read_to_string(path).map_err(|e| Error::io("read config file", path, e))?;
    parse_config(&content)
}
