//! Configuration management for the evaluation pipeline.
//!
//! This module provides configuration types, validation traits, and utilities
//! for the decoder, the batch driver and the ONNX Runtime sessions.

pub mod decode;
pub mod errors;
pub mod onnx;
pub mod parallel;

// Re-export commonly used types
pub use decode::{DecodeConfig, LengthNormalization};
pub use errors::{ConfigError, ConfigValidator, ConfigValidatorExt};
pub use onnx::*;
pub use parallel::ParallelPolicy;
