//! The batch evaluation pipeline.
//!
//! This module runs the beam-search decoder over a whole dataset and assembles the
//! aligned hypothesis and reference corpora, together with run statistics.

pub mod driver;
pub mod stats;

pub use driver::{BatchDecodeDriver, DecodeReport, ProgressCallback, SkipReason, SkippedItem};
pub use stats::DecodeStats;
