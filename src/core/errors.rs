//! Error types for the evaluation pipeline.
//!
//! This module defines the crate-wide [`EvalError`] together with [`DecodeFailure`],
//! the per-image failure raised by the beam-search decoder. Startup problems
//! (missing checkpoint, unreadable dataset, bad configuration) surface as
//! `EvalError` and are fatal; a `DecodeFailure` only ever affects the single
//! image whose decode produced it.
//!
//! # Usage
//!
//! ```rust
//! use im2latex_eval::core::errors::EvalError;
//!
//! let config_error = EvalError::config_error("missing checkpoint path");
//! let validation_error = EvalError::config_error_with_context("beam_width", "0", "must be >= 1");
//! assert!(matches!(config_error, EvalError::ConfigError { .. }));
//! assert!(validation_error.to_string().contains("beam_width"));
//! ```

use crate::domain::TokenId;
use thiserror::Error;

/// Boxed error used for opaque sources.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Reason why decoding a single image was abandoned.
///
/// Produced by the beam-search decoder when the sequence scorer fails or hands back
/// something that is not a usable probability distribution. The batch driver turns
/// it into a skipped item; it never aborts a batch.
#[derive(Error, Debug)]
pub enum DecodeFailure {
    /// The scorer itself returned an error.
    #[error("sequence scorer failed at step {step}")]
    Scorer {
        /// Decode step (0-based) at which the scorer was invoked.
        step: usize,
        /// The underlying scorer error.
        #[source]
        source: Box<EvalError>,
    },

    /// The scorer returned a matrix of the wrong shape.
    #[error("distribution shape mismatch at step {step}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Decode step.
        step: usize,
        /// Expected (rows, vocabulary size).
        expected: (usize, usize),
        /// Shape actually returned.
        actual: (usize, usize),
    },

    /// A probability was NaN or infinite.
    #[error("non-finite probability at step {step}, row {row}, token {token}")]
    NonFinite {
        /// Decode step.
        step: usize,
        /// Row of the scored batch.
        row: usize,
        /// Offending token id.
        token: TokenId,
    },

    /// A probability was negative.
    #[error("negative probability {value} at step {step}, row {row}, token {token}")]
    NegativeProbability {
        /// Decode step.
        step: usize,
        /// Row of the scored batch.
        row: usize,
        /// Offending token id.
        token: TokenId,
        /// The negative value.
        value: f32,
    },

    /// A row carried no probability mass and cannot be normalised.
    #[error("distribution has no probability mass at step {step}, row {row}")]
    ZeroMass {
        /// Decode step.
        step: usize,
        /// Row of the scored batch.
        row: usize,
    },

    /// The search ended without any hypothesis to report.
    #[error("beam is empty after {steps} steps")]
    EmptyBeam {
        /// Steps run before the beam was found empty.
        steps: usize,
    },
}

/// Enum representing the errors that can occur while evaluating a model.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// A model graph or checkpoint could not be loaded.
    #[error("failed to load model from '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path of the model that failed to load.
        model_path: String,
        /// Short reason.
        reason: String,
        /// Optional suggested fix, already formatted.
        suggestion: String,
        /// Underlying error, if any.
        #[source]
        source: Option<BoxedError>,
    },

    /// Error occurred during inference.
    #[error("inference in model '{model_name}': {context}")]
    Inference {
        /// Name of the model.
        model_name: String,
        /// Additional context about the error.
        context: String,
        /// The underlying error.
        #[source]
        source: BoxedError,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Decoding one image failed.
    #[error("decode failed")]
    Decode(#[from] DecodeFailure),

    /// The hypothesis and reference corpora are not aligned.
    #[error(
        "corpus length mismatch: {hypotheses} hypotheses vs {references} references; refusing to score"
    )]
    LengthMismatch {
        /// Number of hypothesis lines.
        hypotheses: usize,
        /// Number of reference lines.
        references: usize,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[from] image::ImageError),

    /// Malformed JSON.
    #[error("json")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    /// Creates an EvalError for configuration errors.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates an EvalError for configuration errors with context.
    ///
    /// # Arguments
    ///
    /// * `field` - The field where the error occurred.
    /// * `value` - The value of the field.
    /// * `reason` - The reason for the error.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!(
                "Configuration error in field '{}' with value '{}': {}",
                field, value, reason
            ),
        }
    }

    /// Creates an EvalError for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an EvalError for a model that could not be loaded.
    ///
    /// # Arguments
    ///
    /// * `model_path` - Path of the model file.
    /// * `reason` - Short reason for the failure.
    /// * `suggestion` - Optional hint appended to the message.
    /// * `source` - Optional underlying error.
    pub fn model_load_error(
        model_path: impl AsRef<std::path::Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let suggestion = suggestion
            .map(|s| format!("; suggested fix: {}", s))
            .unwrap_or_default();
        Self::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion,
            source: source.map(|e| Box::new(e) as _),
        }
    }

    /// Creates an EvalError for inference operations.
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }
}

/// Implementation of From<crate::core::config::ConfigError> for EvalError.
///
/// This allows configuration validation errors to be converted with `?`.
impl From<crate::core::config::ConfigError> for EvalError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

/// Lightweight string error used where no richer source exists.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SimpleError(String);

impl SimpleError {
    /// Creates a new error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Convenient result alias for evaluation operations.
pub type EvalResult<T> = Result<T, EvalError>;
