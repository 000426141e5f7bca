//! Hypotheses and beams tracked during decoding.

use super::TokenId;
use crate::core::config::LengthNormalization;

/// One candidate output sequence.
///
/// `tokens` holds every emitted token after the implicit START, including the
/// terminating END once the hypothesis is finished. A finished hypothesis is never
/// extended again.
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    tokens: Vec<TokenId>,
    log_prob: f64,
    finished: bool,
}

impl Hypothesis {
    /// The empty hypothesis every beam starts from (only the implicit START).
    pub fn root() -> Self {
        Self {
            tokens: Vec::new(),
            log_prob: 0.0,
            finished: false,
        }
    }

    /// Emitted tokens (START excluded, END included when finished).
    pub fn tokens(&self) -> &[TokenId] {
        &self.tokens
    }

    /// Cumulative natural-log probability.
    pub fn log_prob(&self) -> f64 {
        self.log_prob
    }

    /// Whether END has been emitted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of emitted tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether nothing has been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The scorer input for this hypothesis: START followed by the emitted tokens.
    pub fn prefix(&self, start_id: TokenId) -> Vec<TokenId> {
        let mut prefix = Vec::with_capacity(self.tokens.len() + 1);
        prefix.push(start_id);
        prefix.extend_from_slice(&self.tokens);
        prefix
    }

    /// Returns a new hypothesis extended by `token`.
    #[must_use]
    pub fn extend(&self, token: TokenId, log_prob: f64, end_id: TokenId) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.extend_from_slice(&self.tokens);
        tokens.push(token);
        Self {
            tokens,
            log_prob: self.log_prob + log_prob,
            finished: token == end_id,
        }
    }

    /// Score used for the final ranking.
    pub fn normalized_score(&self, normalization: LengthNormalization) -> f64 {
        normalization.apply(self.log_prob, self.tokens.len())
    }

    /// Converts into the caller-facing result, stripping the END sentinel.
    pub fn into_decoded(self, normalization: LengthNormalization) -> DecodedSequence {
        let normalized_score = self.normalized_score(normalization);
        let mut tokens = self.tokens;
        if self.finished {
            tokens.pop();
        }
        DecodedSequence {
            tokens,
            log_prob: self.log_prob,
            normalized_score,
            length_capped: !self.finished,
        }
    }
}

/// Orders hypotheses best-first: higher log-probability, then fewer tokens.
///
/// Used with a stable sort so that remaining ties keep insertion order.
fn search_order(a: &Hypothesis, b: &Hypothesis) -> std::cmp::Ordering {
    b.log_prob
        .total_cmp(&a.log_prob)
        .then_with(|| a.len().cmp(&b.len()))
}

/// Fixed-capacity, best-first collection of hypotheses for one image.
#[derive(Debug, Clone)]
pub struct Beam {
    width: usize,
    hypotheses: Vec<Hypothesis>,
}

impl Beam {
    /// Creates a beam of capacity `width` holding only the root hypothesis.
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            hypotheses: vec![Hypothesis::root()],
        }
    }

    /// Capacity of the beam.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Hypotheses, best first.
    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    /// Whether every hypothesis has emitted END.
    pub fn is_complete(&self) -> bool {
        self.hypotheses.iter().all(Hypothesis::is_finished)
    }

    /// Replaces the beam with the best `width` of `candidates`.
    ///
    /// `candidates` must be in insertion order; ties on score and length keep it.
    #[must_use]
    pub fn advance(self, mut candidates: Vec<Hypothesis>) -> Self {
        candidates.sort_by(search_order);
        candidates.truncate(self.width);
        Self {
            width: self.width,
            hypotheses: candidates,
        }
    }

    /// Consumes the beam and returns its hypotheses ranked for output.
    pub fn into_ranked(self, normalization: LengthNormalization) -> Vec<Hypothesis> {
        let mut hypotheses = self.hypotheses;
        hypotheses.sort_by(|a, b| {
            b.normalized_score(normalization)
                .total_cmp(&a.normalized_score(normalization))
                .then_with(|| a.len().cmp(&b.len()))
        });
        hypotheses
    }
}

/// Result of decoding one image.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSequence {
    /// Emitted tokens with START and END stripped; at most the step limit long.
    pub tokens: Vec<TokenId>,
    /// Cumulative log-probability (END included).
    pub log_prob: f64,
    /// Score under the configured final-ranking normalisation.
    pub normalized_score: f64,
    /// True when the step limit was reached before END was emitted.
    pub length_capped: bool,
}
