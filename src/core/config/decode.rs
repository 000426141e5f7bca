//! Beam-search decoding configuration.

use super::errors::{ConfigError, ConfigValidator};
use serde::{Deserialize, Serialize};

/// How hypothesis scores are normalised when the final beam is ranked.
///
/// The search itself always ranks by the raw cumulative log-probability; this
/// setting only affects which finished hypothesis is reported as best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthNormalization {
    /// Rank by the raw cumulative log-probability.
    #[default]
    None,
    /// Rank by the mean per-token log-probability (END included in the length).
    Average,
}

impl LengthNormalization {
    /// Applies the normalisation to a cumulative log-probability.
    pub fn apply(self, log_prob: f64, length: usize) -> f64 {
        match self {
            Self::None => log_prob,
            Self::Average => log_prob / length.max(1) as f64,
        }
    }
}

impl std::str::FromStr for LengthNormalization {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "raw" => Ok(Self::None),
            "average" | "mean" => Ok(Self::Average),
            other => Err(ConfigError::InvalidConfig {
                message: format!(
                    "unknown length normalization '{}' (expected 'none' or 'average')",
                    other
                ),
            }),
        }
    }
}

/// Configuration for the beam-search decoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Number of hypotheses kept per step (K).
    /// Default: 5
    #[serde(default = "DecodeConfig::default_beam_width")]
    pub beam_width: usize,

    /// Maximum number of decode steps (L).
    /// Default: 64
    #[serde(default = "DecodeConfig::default_max_length")]
    pub max_length: usize,

    /// Normalisation applied when ranking the final beam.
    #[serde(default)]
    pub length_normalization: LengthNormalization,

    /// Number of ranked hypotheses returned by `decode_beam`.
    /// Default: 1
    #[serde(default = "DecodeConfig::default_num_return")]
    pub num_return: usize,
}

impl DecodeConfig {
    /// Create a new DecodeConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the beam width.
    pub fn with_beam_width(mut self, beam_width: usize) -> Self {
        self.beam_width = beam_width;
        self
    }

    /// Set the maximum decode length.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set the final-ranking normalisation.
    pub fn with_length_normalization(mut self, normalization: LengthNormalization) -> Self {
        self.length_normalization = normalization;
        self
    }

    /// Set how many ranked hypotheses `decode_beam` returns.
    pub fn with_num_return(mut self, num_return: usize) -> Self {
        self.num_return = num_return;
        self
    }

    fn default_beam_width() -> usize {
        5
    }

    fn default_max_length() -> usize {
        64
    }

    fn default_num_return() -> usize {
        1
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            beam_width: Self::default_beam_width(),
            max_length: Self::default_max_length(),
            length_normalization: LengthNormalization::default(),
            num_return: Self::default_num_return(),
        }
    }
}

impl ConfigValidator for DecodeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_positive_usize(self.beam_width, "beam_width")?;
        self.validate_positive_usize(self.max_length, "max_length")?;
        self.validate_positive_usize(self.num_return, "num_return")?;
        if self.num_return > self.beam_width {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "num_return ({}) cannot exceed beam_width ({})",
                    self.num_return, self.beam_width
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_evaluation_cli() {
        let config = DecodeConfig::default();
        assert_eq!(config.beam_width, 5);
        assert_eq!(config.max_length, 64);
        assert_eq!(config.num_return, 1);
        assert_eq!(config.length_normalization, LengthNormalization::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_beam_width_rejected() {
        let config = DecodeConfig::new().with_beam_width(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_length_rejected() {
        let config = DecodeConfig::new().with_max_length(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_num_return_bounded_by_beam_width() {
        let config = DecodeConfig::new().with_beam_width(2).with_num_return(3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: DecodeConfig = serde_json::from_str(r#"{"beam_width": 3}"#).unwrap();
        assert_eq!(config.beam_width, 3);
        assert_eq!(config.max_length, 64);
    }

    #[test]
    fn test_length_normalization_parse_and_apply() {
        let average: LengthNormalization = "average".parse().unwrap();
        assert_eq!(average.apply(-6.0, 3), -2.0);
        assert_eq!(LengthNormalization::None.apply(-6.0, 3), -6.0);
        assert!("quadratic".parse::<LengthNormalization>().is_err());
    }
}
