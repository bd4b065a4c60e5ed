//! Decoder settings, persisted as a human-readable TOML file.
//!
//! Every field carries a default, so a partial file (or an empty one) is valid:
//!
//! ```toml
//! [brainmap]
//! frequency_threshold = 0.001
//! correction = "fdr_bh"
//!
//! [neurosynth]
//! prior = { fixed = 0.5 }
//!
//! [gclda]
//! prior_weight = 0.5
//! ```

use crate::stats::Correction;
use crate::types::DecodeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_FREQUENCY_THRESHOLD: f64 = 0.001;
pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_RARE_FEATURE_THRESHOLD: usize = 5;
pub const DEFAULT_PRIOR_WEIGHT: f64 = 1.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML config file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// Settings shared by both discrete decoders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscreteSettings {
    /// Minimum annotation weight for a feature to count as present in a study.
    pub frequency_threshold: f64,
    /// Significance level handed to the correction procedure.
    pub alpha: f64,
    pub correction: Correction,
}

impl Default for DiscreteSettings {
    fn default() -> Self {
        Self {
            frequency_threshold: DEFAULT_FREQUENCY_THRESHOLD,
            alpha: DEFAULT_ALPHA,
            correction: Correction::default(),
        }
    }
}

impl DiscreteSettings {
    pub fn validate(&self) -> Result<(), DecodeError> {
        if !(0.0..=1.0).contains(&self.frequency_threshold) {
            return Err(DecodeError::InvalidParameter(format!(
                "frequency threshold must lie in [0, 1], got {}",
                self.frequency_threshold
            )));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(DecodeError::InvalidParameter(format!(
                "alpha must lie strictly between 0 and 1, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainMapOptions {
    #[serde(flatten)]
    pub settings: DiscreteSettings,
    /// Features present in fewer selected studies than this get p = 1 in both
    /// directions.
    pub rare_feature_threshold: usize,
}

impl Default for BrainMapOptions {
    fn default() -> Self {
        Self {
            settings: DiscreteSettings::default(),
            rare_feature_threshold: DEFAULT_RARE_FEATURE_THRESHOLD,
        }
    }
}

/// Prior probability of each feature used by the Neurosynth effect estimates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeurosynthPrior {
    /// Empirical base rate `n_term / (n_term + n_noterm)` of each feature.
    #[default]
    Empirical,
    /// One prior for every feature.
    Fixed(f64),
    /// One prior per decoded feature, in feature order.
    PerFeature(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NeurosynthOptions {
    #[serde(flatten)]
    pub settings: DiscreteSettings,
    pub prior: NeurosynthPrior,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcldaOptions {
    /// Weight of the topic prior against a uniform prior, in [0, 1].
    pub prior_weight: f64,
}

impl Default for GcldaOptions {
    fn default() -> Self {
        Self {
            prior_weight: DEFAULT_PRIOR_WEIGHT,
        }
    }
}

/// The complete decoder configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub brainmap: BrainMapOptions,
    pub neurosynth: NeurosynthOptions,
    pub gclda: GcldaOptions,
}

impl DecoderConfig {
    /// Saves the configuration in TOML format.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }

    /// Loads a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let config = toml::from_str(&toml_string)?;
        Ok(config)
    }
}
