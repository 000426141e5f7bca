//! Beam-search decoding over a [`SequenceScorer`].
//!
//! Each call decodes a single image. The beam is owned by the call and dropped at
//! the end of it, so concurrent decodes of different images share nothing but the
//! read-only scorer.
//!
//! # Ranking
//!
//! During the search hypotheses are ranked by their raw cumulative log-probability;
//! ties prefer fewer tokens, then earlier insertion. The configured
//! [`LengthNormalization`](crate::core::config::LengthNormalization) is only applied
//! when the final beam is ranked for output.

use crate::core::config::{ConfigValidator, DecodeConfig, LengthNormalization};
use crate::core::errors::{DecodeFailure, EvalError, EvalResult};
use crate::core::traits::SequenceScorer;
use crate::domain::{Beam, DecodedSequence, EncodedImage, Hypothesis, TokenId, Vocabulary};
use crate::processors::distribution::{argmax, to_log_probs, top_k_tokens};
use ndarray::Array2;

/// Decodes images into token sequences with beam search.
#[derive(Debug, Clone)]
pub struct BeamSearchDecoder<S> {
    scorer: S,
    config: DecodeConfig,
    start_id: TokenId,
    end_id: TokenId,
}

impl<S: SequenceScorer> BeamSearchDecoder<S> {
    /// Creates a decoder.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::ConfigError` if the configuration is invalid or a
    /// sentinel id is outside the scorer's vocabulary.
    pub fn new(
        scorer: S,
        config: DecodeConfig,
        start_id: TokenId,
        end_id: TokenId,
    ) -> EvalResult<Self> {
        config.validate()?;
        let vocab_size = scorer.vocab_size();
        for (name, id) in [("start_id", start_id), ("end_id", end_id)] {
            if id as usize >= vocab_size {
                return Err(EvalError::config_error_with_context(
                    name,
                    &id.to_string(),
                    &format!("must be below the scorer vocabulary size {}", vocab_size),
                ));
            }
        }
        Ok(Self {
            scorer,
            config,
            start_id,
            end_id,
        })
    }

    /// Creates a decoder taking the sentinels from `vocab`.
    ///
    /// # Errors
    ///
    /// Also fails when the vocabulary and the scorer disagree on the vocabulary size.
    pub fn from_vocab(scorer: S, config: DecodeConfig, vocab: &Vocabulary) -> EvalResult<Self> {
        if scorer.vocab_size() != vocab.len() {
            return Err(EvalError::config_error(format!(
                "scorer vocabulary size {} does not match loaded vocabulary size {}",
                scorer.vocab_size(),
                vocab.len()
            )));
        }
        Self::new(scorer, config, vocab.start_id(), vocab.end_id())
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Decodes one image and returns the best hypothesis.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeFailure`] when the scorer fails or returns an invalid
    /// distribution; no partial hypothesis is returned in that case.
    pub fn decode(&self, image: &EncodedImage) -> Result<DecodedSequence, DecodeFailure> {
        let normalization = self.config.length_normalization;
        let (beam, steps) = self.search(image)?;
        let best = ranked(beam, normalization, steps)?
            .into_iter()
            .next()
            .ok_or(DecodeFailure::EmptyBeam { steps })?;
        Ok(best.into_decoded(normalization))
    }

    /// Decodes one image and returns up to `num_return` hypotheses, best first.
    pub fn decode_beam(&self, image: &EncodedImage) -> Result<Vec<DecodedSequence>, DecodeFailure> {
        let normalization = self.config.length_normalization;
        let (beam, steps) = self.search(image)?;
        Ok(ranked(beam, normalization, steps)?
            .into_iter()
            .take(self.config.num_return)
            .map(|hyp| hyp.into_decoded(normalization))
            .collect())
    }

    /// Greedy decoding: always extends with the most probable token.
    ///
    /// Ties pick the lowest token id. Produces the same result as [`decode`](Self::decode)
    /// with a beam width of one.
    pub fn greedy_decode(&self, image: &EncodedImage) -> Result<DecodedSequence, DecodeFailure> {
        let mut hyp = Hypothesis::root();
        for step in 0..self.config.max_length {
            if hyp.is_finished() {
                break;
            }
            let log_probs = self.score_step(step, &[&hyp], image)?;
            let (token, lp) =
                argmax(log_probs.row(0)).ok_or(DecodeFailure::ZeroMass { step, row: 0 })?;
            hyp = hyp.extend(token, lp, self.end_id);
        }
        Ok(hyp.into_decoded(self.config.length_normalization))
    }

    /// Runs the search and returns the final beam with the number of steps taken.
    fn search(&self, image: &EncodedImage) -> Result<(Beam, usize), DecodeFailure> {
        let width = self.config.beam_width;
        let mut beam = Beam::new(width);
        let mut steps = 0;

        for step in 0..self.config.max_length {
            if beam.is_complete() {
                tracing::trace!("Beam complete after {} steps", step);
                break;
            }
            steps = step + 1;

            let open: Vec<&Hypothesis> = beam
                .hypotheses()
                .iter()
                .filter(|hyp| !hyp.is_finished())
                .collect();
            let log_probs = self.score_step(step, &open, image)?;

            let mut candidates = Vec::with_capacity(beam.hypotheses().len() * width);
            let mut row = 0;
            for hyp in beam.hypotheses() {
                if hyp.is_finished() {
                    candidates.push(hyp.clone());
                    continue;
                }
                // only a parent's top `width` children can survive the merge
                for (token, lp) in top_k_tokens(log_probs.row(row), width) {
                    candidates.push(hyp.extend(token, lp, self.end_id));
                }
                row += 1;
            }

            if candidates.is_empty() {
                return Err(DecodeFailure::EmptyBeam { steps });
            }
            beam = beam.advance(candidates);
            tracing::trace!(
                "step {}: best log-prob {:.4}, {} open",
                step,
                beam.hypotheses().first().map_or(f64::NEG_INFINITY, Hypothesis::log_prob),
                beam.hypotheses().iter().filter(|h| !h.is_finished()).count()
            );
        }

        Ok((beam, steps))
    }

    fn score_step(
        &self,
        step: usize,
        open: &[&Hypothesis],
        image: &EncodedImage,
    ) -> Result<Array2<f64>, DecodeFailure> {
        let prefixes: Vec<Vec<TokenId>> = open.iter().map(|h| h.prefix(self.start_id)).collect();
        let prefix_refs: Vec<&[TokenId]> = prefixes.iter().map(Vec::as_slice).collect();
        let probs = self
            .scorer
            .next_token_probs(&prefix_refs, image)
            .map_err(|e| DecodeFailure::Scorer {
                step,
                source: Box::new(e),
            })?;
        to_log_probs(&probs, open.len(), self.scorer.vocab_size(), step)
    }
}

/// Ranks the final beam for output, refusing an empty one.
fn ranked(
    beam: Beam,
    normalization: LengthNormalization,
    steps: usize,
) -> Result<Vec<Hypothesis>, DecodeFailure> {
    let hypotheses = beam.into_ranked(normalization);
    if hypotheses.is_empty() {
        return Err(DecodeFailure::EmptyBeam { steps });
    }
    Ok(hypotheses)
}
