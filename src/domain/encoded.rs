//! Encoder output handed to the sequence scorer.

use ndarray::{Array1, ArrayD, ArrayViewD};

/// Fixed-size representation of one image produced by the encoder.
///
/// The decoder never looks inside; it only passes it back to the scorer for
/// every step of that image's decode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    features: ArrayD<f32>,
}

impl EncodedImage {
    /// Wraps an encoder output tensor.
    pub fn new(features: ArrayD<f32>) -> Self {
        Self { features }
    }

    /// Read-only view of the features.
    pub fn features(&self) -> ArrayViewD<'_, f32> {
        self.features.view()
    }

    /// Shape of the feature tensor.
    pub fn shape(&self) -> &[usize] {
        self.features.shape()
    }
}

impl From<Vec<f32>> for EncodedImage {
    fn from(values: Vec<f32>) -> Self {
        Self::new(Array1::from(values).into_dyn())
    }
}
