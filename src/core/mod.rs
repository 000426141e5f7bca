//! The core module of the evaluation pipeline.
//!
//! This module contains the fundamental components shared by everything else:
//! - Configuration management and validation
//! - Error handling
//! - ONNX Runtime inference integration
//! - The [`SequenceScorer`] trait implemented by trained models
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod config;
pub mod errors;
pub mod inference;
pub mod traits;

pub use config::{
    ConfigError, ConfigValidator, ConfigValidatorExt, DecodeConfig, LengthNormalization,
    OrtSessionConfig, ParallelPolicy,
};
pub use errors::{DecodeFailure, EvalError, EvalResult};
pub use inference::OrtInfer;
pub use traits::SequenceScorer;

/// Initializes the tracing subscriber for logging.
///
/// Sets up the tracing subscriber with an environment filter and a formatting layer
/// writing to stderr, so corpus output on stdout stays clean. `RUST_LOG` wins over
/// `default_directive` when it is set.
pub fn init_tracing(default_directive: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
