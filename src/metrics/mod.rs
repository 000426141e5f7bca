//! Corpus scoring of decoded formulas against references.
//!
//! Both corpora are whitespace-tokenized, order-aligned lists of formulas. Three
//! metrics are reported, each on a 0-100 scale:
//!
//! * `bleu` - corpus BLEU-4 with add-one smoothing of empty higher orders
//! * `exact_match` - share of formulas reproduced token for token
//! * `edit_distance` - one minus the normalised token-level Levenshtein distance

pub mod bleu;
pub mod edit_distance;
pub mod exact_match;

pub use bleu::{BleuStats, corpus_bleu};
pub use edit_distance::{corpus_edit_similarity, levenshtein};
pub use exact_match::corpus_exact_match;

use crate::core::errors::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Scores of one hypothesis corpus against its references.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorpusScores {
    /// Corpus BLEU-4 (0-100).
    pub bleu4: f64,
    /// Exact-match rate (0-100).
    pub exact_match: f64,
    /// Edit similarity (0-100).
    pub edit_similarity: f64,
    /// Number of scored pairs.
    pub count: usize,
}

impl fmt::Display for CorpusScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BLEU-4: {:.2}, Exact match: {:.2}, Edit similarity: {:.2} ({} pairs)",
            self.bleu4, self.exact_match, self.edit_similarity, self.count
        )
    }
}

/// Scores hypothesis corpora against reference corpora.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorpusScorer;

impl CorpusScorer {
    pub fn new() -> Self {
        Self
    }

    /// Scores two order-aligned corpora.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::LengthMismatch` when the corpora differ in length; nothing
    /// is computed in that case.
    pub fn score<H, R>(&self, hypotheses: &[H], references: &[R]) -> EvalResult<CorpusScores>
    where
        H: AsRef<str>,
        R: AsRef<str>,
    {
        if hypotheses.len() != references.len() {
            tracing::error!(
                "Refusing to score misaligned corpora: {} hypotheses vs {} references",
                hypotheses.len(),
                references.len()
            );
            return Err(EvalError::LengthMismatch {
                hypotheses: hypotheses.len(),
                references: references.len(),
            });
        }

        let hyps = tokenize_corpus(hypotheses);
        let refs = tokenize_corpus(references);
        Ok(CorpusScores {
            bleu4: corpus_bleu(&hyps, &refs),
            exact_match: corpus_exact_match(&hyps, &refs),
            edit_similarity: corpus_edit_similarity(&hyps, &refs),
            count: hyps.len(),
        })
    }

    /// Reads two newline-delimited corpus files and scores them.
    ///
    /// # Errors
    ///
    /// Fails on unreadable files and with `LengthMismatch` when line counts differ.
    pub fn score_files(&self, hypothesis_path: &Path, reference_path: &Path) -> EvalResult<CorpusScores> {
        let hypotheses = crate::utils::corpus::read_corpus(hypothesis_path)?;
        let references = crate::utils::corpus::read_corpus(reference_path)?;
        self.score(&hypotheses, &references)
    }
}

fn tokenize_corpus<S: AsRef<str>>(corpus: &[S]) -> Vec<Vec<&str>> {
    corpus
        .iter()
        .map(|line| line.as_ref().split_whitespace().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::corpus::write_corpus;
    use tempfile::tempdir;

    #[test]
    fn test_identical_corpora_score_maximum() {
        let corpus = ["x ^ { 2 }", "\\alpha + \\beta", "1"];
        let scores = CorpusScorer::new().score(&corpus, &corpus).unwrap();
        assert!((scores.bleu4 - 100.0).abs() < 1e-9);
        assert_eq!(scores.exact_match, 100.0);
        assert_eq!(scores.edit_similarity, 100.0);
        assert_eq!(scores.count, 3);
    }

    #[test]
    fn test_zero_overlap_scores_lower() {
        let refs = ["x ^ { 2 }", "a + b"];
        let hyps = ["\\alpha", "\\beta \\gamma"];
        let scores = CorpusScorer::new().score(&hyps, &refs).unwrap();
        assert_eq!(scores.bleu4, 0.0);
        assert_eq!(scores.exact_match, 0.0);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = CorpusScorer::new().score(&["a"], &["a", "b"]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::LengthMismatch {
                hypotheses: 1,
                references: 2
            }
        ));
    }

    #[test]
    fn test_empty_corpora_score_zero() {
        let empty: [&str; 0] = [];
        let scores = CorpusScorer::new().score(&empty, &empty).unwrap();
        assert_eq!(scores.bleu4, 0.0);
        assert_eq!(scores.count, 0);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let hyps = ["a b c", "d e", "f"];
        let refs = ["a b d", "d e f", "g"];
        let scorer = CorpusScorer::new();
        let first = scorer.score(&hyps, &refs).unwrap();
        assert_eq!(scorer.score(&hyps, &refs).unwrap(), first);
    }

    #[test]
    fn test_score_files() {
        let dir = tempdir().unwrap();
        let hyp_path = dir.path().join("result.txt");
        let ref_path = dir.path().join("ref.txt");
        write_corpus(&hyp_path, &["a b", "c"]).unwrap();
        write_corpus(&ref_path, &["a b", "d"]).unwrap();

        let scores = CorpusScorer::new().score_files(&hyp_path, &ref_path).unwrap();
        assert_eq!(scores.count, 2);
        assert_eq!(scores.exact_match, 50.0);

        write_corpus(&ref_path, &["a b"]).unwrap();
        let err = CorpusScorer::new()
            .score_files(&hyp_path, &ref_path)
            .unwrap_err();
        assert!(matches!(err, EvalError::LengthMismatch { .. }));
    }
}
