//! Feature extraction strategies for SimHash.
//!
//! A [`FeatureSet`] turns chunk text into a sequence of weighted [`Feature`]s.
//! Two strategies ship with the crate:
//!
//! | Strategy | Feature | Notes |
//! |----------|---------|-------|
//! | [`WordFeatureSet`] | one per word | splits on anything not alphanumeric |
//! | [`NgramFeatureSet`] | one per window | raw byte windows of width `n`, advancing by `step` |
//!
//! Extractors are pure functions of their input and configuration. Empty or
//! too-short input yields an empty sequence, never an error.
//!
//! Workers never share an extractor. They share a [`FeatureConfig`] (an
//! immutable value) and each builds its own instance with
//! [`FeatureConfig::build`].

use serde::{Deserialize, Serialize};

pub const DEFAULT_NGRAM_SIZE: usize = 3;
pub const DEFAULT_NGRAM_STEP: usize = 1;

/// A weighted token extracted from text.
///
/// The token is kept as raw bytes: an n-gram window may end inside a
/// multi-byte character, and its fingerprint is taken over exactly those
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub text: Vec<u8>,
    pub weight: u32,
}

impl Feature {
    fn unit(text: impl Into<Vec<u8>>) -> Self {
        Self {
            text: text.into(),
            weight: 1,
        }
    }
}

/// Breaks text down into features. Implementations must be pure.
pub trait FeatureSet: Send + Sync {
    fn features(&self, text: &str) -> Vec<Feature>;
}

/// Word-based features: one per alphanumeric run, weight 1.
#[derive(Debug, Clone)]
pub struct WordFeatureSet {
    pub normalize: bool,
}

impl WordFeatureSet {
    pub fn new() -> Self {
        Self { normalize: true }
    }
}

impl Default for WordFeatureSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureSet for WordFeatureSet {
    fn features(&self, text: &str) -> Vec<Feature> {
        let lowered;
        let text = if self.normalize {
            lowered = text.to_lowercase();
            lowered.as_str()
        } else {
            text
        };

        text.split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(|word| Feature::unit(word.as_bytes()))
            .collect()
    }
}

/// Sliding-window n-gram features over the bytes of the text.
#[derive(Debug, Clone)]
pub struct NgramFeatureSet {
    pub n: usize,
    pub step: usize,
    pub normalize: bool,
}

impl NgramFeatureSet {
    /// Zero `n` or `step` fall back to the defaults (3 and 1).
    pub fn new(n: usize, step: usize) -> Self {
        Self {
            n: if n == 0 { DEFAULT_NGRAM_SIZE } else { n },
            step: if step == 0 { DEFAULT_NGRAM_STEP } else { step },
            normalize: true,
        }
    }
}

impl Default for NgramFeatureSet {
    fn default() -> Self {
        Self::new(DEFAULT_NGRAM_SIZE, DEFAULT_NGRAM_STEP)
    }
}

impl FeatureSet for NgramFeatureSet {
    fn features(&self, text: &str) -> Vec<Feature> {
        let lowered;
        let text = if self.normalize {
            lowered = text.to_lowercase();
            lowered.as_str()
        } else {
            text
        };

        let bytes = text.as_bytes();
        if bytes.len() < self.n {
            return Vec::new();
        }

        let mut features = Vec::with_capacity((bytes.len() - self.n) / self.step + 1);
        let mut i = 0;
        while i + self.n <= bytes.len() {
            features.push(Feature::unit(&bytes[i..i + self.n]));
            i += self.step;
        }
        features
    }
}

/// Immutable extractor configuration handed to every worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum FeatureConfig {
    Word {
        #[serde(default = "default_normalize")]
        normalize: bool,
    },
    Ngram {
        #[serde(default = "default_ngram_size")]
        n: usize,
        #[serde(default = "default_ngram_step")]
        step: usize,
        #[serde(default = "default_normalize")]
        normalize: bool,
    },
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

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig::Word { normalize: true }
    }
}

impl FeatureConfig {
    pub fn ngram(n: usize, step: usize) -> Self {
        FeatureConfig::Ngram {
            n,
            step,
            normalize: true,
        }
    }

    /// Short label used in logs and the index file header.
    pub fn name(&self) -> &'static str {
        match self {
            FeatureConfig::Word { .. } => "word",
            FeatureConfig::Ngram { .. } => "ngram",
        }
    }

    /// Build a fresh extractor for one worker.
    pub fn build(&self) -> Box<dyn FeatureSet> {
        match *self {
            FeatureConfig::Word { normalize } => Box::new(WordFeatureSet { normalize }),
            FeatureConfig::Ngram { n, step, normalize } => {
                let mut set = NgramFeatureSet::new(n, step);
                set.normalize = normalize;
                Box::new(set)
            }
        }
    }
}
