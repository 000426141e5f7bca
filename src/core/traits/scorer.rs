//! The decode-step interface of a trained model.

use crate::core::errors::EvalResult;
use crate::domain::{EncodedImage, TokenId};
use ndarray::Array2;
use std::sync::Arc;

/// Next-token scoring function of a trained image-to-markup model.
///
/// Given a batch of partial token sequences (each starting with START) and the
/// encoded representation of one image, returns one row per sequence holding the
/// probability of every vocabulary token being emitted next. The matrix therefore
/// has shape `[prefixes.len(), vocab_size()]`.
///
/// Implementations hold only read-only state (model weights) and must be callable
/// from several decoding threads at once.
pub trait SequenceScorer: Send + Sync {
    /// Width of every returned distribution.
    fn vocab_size(&self) -> usize;

    /// Scores the next token for every prefix.
    fn next_token_probs(
        &self,
        prefixes: &[&[TokenId]],
        image: &EncodedImage,
    ) -> EvalResult<Array2<f32>>;
}

impl<T: SequenceScorer + ?Sized> SequenceScorer for &T {
    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }

    fn next_token_probs(
        &self,
        prefixes: &[&[TokenId]],
        image: &EncodedImage,
    ) -> EvalResult<Array2<f32>> {
        (**self).next_token_probs(prefixes, image)
    }
}

impl<T: SequenceScorer + ?Sized> SequenceScorer for Arc<T> {
    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }

    fn next_token_probs(
        &self,
        prefixes: &[&[TokenId]],
        image: &EncodedImage,
    ) -> EvalResult<Array2<f32>> {
        (**self).next_token_probs(prefixes, image)
    }
}
