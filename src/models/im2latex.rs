//! ONNX Runtime backed im2latex model.
//!
//! The model is split into two graphs: an encoder run once per image, and a decoder
//! step that maps (encoded image, token prefixes) to next-token probabilities. The
//! decoder step is what the beam search drives through [`SequenceScorer`].

use super::checkpoint::{GraphNames, ModelArgs, ModelCheckpoint};
use crate::core::config::OrtSessionConfig;
use crate::core::errors::{EvalError, EvalResult};
use crate::core::inference::OrtInfer;
use crate::core::traits::SequenceScorer;
use crate::domain::{DatasetItem, EncodedImage, TokenId, Vocabulary};
use crate::utils::image::load_image_tensor;
use ndarray::{Array2, ArrayD, ArrayView4, ArrayViewD, IxDyn};

/// Encoder/decoder pair loaded from a checkpoint.
#[derive(Debug)]
pub struct Im2LatexModel {
    encoder: OrtInfer,
    decoder: OrtInfer,
    args: ModelArgs,
    names: GraphNames,
    vocab_size: usize,
}

impl Im2LatexModel {
    /// Loads both graphs of `checkpoint`.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::ConfigError` when the checkpoint was trained with a
    /// different vocabulary size, and `EvalError::ModelLoad` when a graph cannot be
    /// opened.
    pub fn load(
        checkpoint: &ModelCheckpoint,
        vocab: &Vocabulary,
        session: &OrtSessionConfig,
    ) -> EvalResult<Self> {
        if let Some(expected) = checkpoint.args.vocab_size
            && expected != vocab.len()
        {
            return Err(EvalError::config_error(format!(
                "checkpoint was trained with {} tokens but the vocabulary has {}",
                expected,
                vocab.len()
            )));
        }

        let encoder = OrtInfer::from_config(session, &checkpoint.encoder, None)?;
        let decoder = OrtInfer::from_config(
            session,
            &checkpoint.decoder_step,
            checkpoint.names.probs.as_deref(),
        )?;
        tracing::info!(
            "Loaded im2latex model ({} encoder / {} decoder sessions)",
            encoder.pool_size(),
            decoder.pool_size()
        );

        Ok(Self {
            encoder,
            decoder,
            args: checkpoint.args.clone(),
            names: checkpoint.names.clone(),
            vocab_size: vocab.len(),
        })
    }

    pub fn args(&self) -> &ModelArgs {
        &self.args
    }

    /// Runs the encoder on a `[1, 1, H, W]` image tensor.
    pub fn encode(&self, image: ArrayView4<'_, f32>) -> EvalResult<EncodedImage> {
        let features = self.encoder.infer_dyn(&self.names.image, image.into_dyn())?;
        Ok(EncodedImage::new(features))
    }

    /// Loads and encodes a dataset item's image, pairing it with its reference.
    pub fn prepare(&self, item: &DatasetItem) -> EvalResult<(EncodedImage, Vec<TokenId>)> {
        let tensor = load_image_tensor(&item.image_path)?;
        let encoded = self.encode(tensor.view())?;
        Ok((encoded, item.reference.clone()))
    }
}

impl SequenceScorer for Im2LatexModel {
    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn next_token_probs(
        &self,
        prefixes: &[&[TokenId]],
        image: &EncodedImage,
    ) -> EvalResult<Array2<f32>> {
        let tokens = prefix_tensor(prefixes)?;
        let features = broadcast_features(image.features(), prefixes.len())?;
        self.decoder.infer_next_token(
            &self.names.features,
            features.view(),
            &self.names.tokens,
            tokens.view(),
        )
    }
}

/// Packs equal-length prefixes into an `i64 [n, t]` tensor.
pub fn prefix_tensor(prefixes: &[&[TokenId]]) -> EvalResult<Array2<i64>> {
    let width = prefixes.first().map_or(0, |p| p.len());
    if prefixes.iter().any(|p| p.len() != width) {
        return Err(EvalError::invalid_input(
            "decoder step expects prefixes of equal length",
        ));
    }
    let data: Vec<i64> = prefixes
        .iter()
        .flat_map(|p| p.iter().map(|&t| i64::from(t)))
        .collect();
    Ok(Array2::from_shape_vec((prefixes.len(), width), data)?)
}

/// Repeats a `[1, ...]` encoder output `n` times along the batch axis.
pub fn broadcast_features(features: ArrayViewD<'_, f32>, n: usize) -> EvalResult<ArrayD<f32>> {
    let shape = features.shape();
    if shape.first() != Some(&1) {
        return Err(EvalError::invalid_input(format!(
            "encoded image must have a leading batch axis of 1, got shape {:?}",
            shape
        )));
    }
    let mut target = shape.to_vec();
    target[0] = n;
    let view = features.broadcast(IxDyn(&target)).ok_or_else(|| {
        EvalError::invalid_input(format!("cannot broadcast {:?} to {:?}", shape, target))
    })?;
    Ok(view.as_standard_layout().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_prefix_tensor_packs_rows() {
        let a: &[TokenId] = &[0, 5, 6];
        let b: &[TokenId] = &[0, 7, 8];
        let tensor = prefix_tensor(&[a, b]).unwrap();
        assert_eq!(tensor.shape(), &[2, 3]);
        assert_eq!(tensor[[1, 2]], 8);
    }

    #[test]
    fn test_prefix_tensor_rejects_ragged_batches() {
        let a: &[TokenId] = &[0, 5];
        let b: &[TokenId] = &[0];
        assert!(prefix_tensor(&[a, b]).is_err());
    }

    #[test]
    fn test_broadcast_features_repeats_batch_axis() {
        let features = Array3::from_shape_fn((1, 2, 3), |(_, i, j)| (i * 3 + j) as f32).into_dyn();
        let out = broadcast_features(features.view(), 4).unwrap();
        assert_eq!(out.shape(), &[4, 2, 3]);
        assert_eq!(out[[3, 1, 2]], 5.0);
        assert!(out.is_standard_layout());
    }

    #[test]
    fn test_broadcast_features_requires_unit_batch() {
        let features = ArrayD::<f32>::zeros(IxDyn(&[2, 3]));
        assert!(broadcast_features(features.view(), 2).is_err());
    }

    #[test]
    fn test_load_rejects_vocab_size_mismatch() {
        let checkpoint = ModelCheckpoint {
            args: ModelArgs {
                vocab_size: Some(10),
                ..ModelArgs::default()
            },
            encoder: "encoder.onnx".into(),
            decoder_step: "decoder_step.onnx".into(),
            names: GraphNames::default(),
        };
        let vocab = Vocabulary::from_tokens(["<s>", "</s>", "<pad>", "<unk>"]).unwrap();
        let result = Im2LatexModel::load(&checkpoint, &vocab, &OrtSessionConfig::default());
        assert!(matches!(result, Err(EvalError::ConfigError { .. })));
    }

    #[test]
    fn test_load_missing_graph_is_model_load_error() {
        let checkpoint = ModelCheckpoint {
            args: ModelArgs::default(),
            encoder: "/nonexistent/encoder.onnx".into(),
            decoder_step: "/nonexistent/decoder_step.onnx".into(),
            names: GraphNames::default(),
        };
        let vocab = Vocabulary::from_tokens(["<s>", "</s>", "<pad>", "<unk>"]).unwrap();
        let result = Im2LatexModel::load(&checkpoint, &vocab, &OrtSessionConfig::default());
        assert!(matches!(result, Err(EvalError::ModelLoad { .. })));
    }
}
