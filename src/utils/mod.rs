//! Utility functions for the evaluation pipeline.
//!
//! This module provides image loading for the encoder and reading/writing of the
//! newline-delimited corpus files produced by an evaluation run.

pub mod corpus;
pub mod image;

pub use corpus::{read_corpus, write_corpus, write_corpus_pair};
pub use image::{dynamic_to_gray, gray_to_tensor, load_gray_image, load_image_tensor};
