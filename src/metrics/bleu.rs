//! Corpus-level BLEU-4.
//!
//! Clipped n-gram matches and totals are summed over every (hypothesis, reference)
//! pair before precisions are formed, as in the standard corpus BLEU. Precisions for
//! n = 1..4 are combined with uniform weights and a brevity penalty
//! `exp(1 - r / c)` is applied when the hypothesis corpus is shorter than the
//! reference corpus.
//!
//! Smoothing: a precision term of order n >= 2 with no matches is replaced by
//! `(matches + 1) / (total + 1)`. The unigram term is never smoothed, so a corpus
//! without a single overlapping token scores 0.

use std::collections::HashMap;

/// Highest n-gram order.
pub const MAX_ORDER: usize = 4;

/// Accumulated n-gram statistics of a corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BleuStats {
    /// Clipped matches per order (index 0 holds unigrams).
    pub matches: [usize; MAX_ORDER],
    /// Hypothesis n-grams per order.
    pub totals: [usize; MAX_ORDER],
    /// Total hypothesis length in tokens.
    pub hypothesis_len: usize,
    /// Total reference length in tokens.
    pub reference_len: usize,
    /// Number of pairs added.
    pub pairs: usize,
}

impl BleuStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one tokenized pair.
    pub fn add_pair(&mut self, hypothesis: &[&str], reference: &[&str]) {
        self.pairs += 1;
        self.hypothesis_len += hypothesis.len();
        self.reference_len += reference.len();
        for n in 1..=MAX_ORDER {
            let hyp_ngrams = extract_ngrams(hypothesis, n);
            let ref_ngrams = extract_ngrams(reference, n);
            let mut clipped = 0usize;
            for (ngram, &count) in &hyp_ngrams {
                clipped += count.min(ref_ngrams.get(ngram).copied().unwrap_or(0));
            }
            self.matches[n - 1] += clipped;
            self.totals[n - 1] += hyp_ngrams.values().sum::<usize>();
        }
    }

    /// Brevity penalty in `[0, 1]`.
    pub fn brevity_penalty(&self) -> f64 {
        let c = self.hypothesis_len;
        let r = self.reference_len;
        if c >= r {
            1.0
        } else if c == 0 {
            0.0
        } else {
            (1.0 - r as f64 / c as f64).exp()
        }
    }

    /// Precision of order `n` (1-based) after smoothing.
    pub fn precision(&self, n: usize) -> f64 {
        let matches = self.matches[n - 1];
        let total = self.totals[n - 1];
        if n == 1 {
            if total == 0 {
                0.0
            } else {
                matches as f64 / total as f64
            }
        } else if matches == 0 {
            1.0 / (total as f64 + 1.0)
        } else {
            matches as f64 / total as f64
        }
    }

    /// BLEU-4 on a 0-100 scale.
    pub fn score(&self) -> f64 {
        if self.pairs == 0 {
            return 0.0;
        }
        if self.hypothesis_len == 0 {
            // only empty hypotheses: perfect when references are empty too
            return if self.reference_len == 0 { 100.0 } else { 0.0 };
        }
        let p1 = self.precision(1);
        if p1 == 0.0 {
            return 0.0;
        }
        let log_avg = (1..=MAX_ORDER)
            .map(|n| self.precision(n).ln())
            .sum::<f64>()
            / MAX_ORDER as f64;
        (100.0 * self.brevity_penalty() * log_avg.exp()).clamp(0.0, 100.0)
    }
}

/// Corpus BLEU-4 of tokenized, order-aligned corpora (0-100).
///
/// Callers must pass corpora of equal length; extra entries on either side are ignored.
pub fn corpus_bleu(hypotheses: &[Vec<&str>], references: &[Vec<&str>]) -> f64 {
    let mut stats = BleuStats::new();
    for (hyp, reference) in hypotheses.iter().zip(references) {
        stats.add_pair(hyp, reference);
    }
    stats.score()
}

/// Counts the n-grams of a token sequence.
fn extract_ngrams<'a, 'b>(tokens: &'b [&'a str], n: usize) -> HashMap<&'b [&'a str], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for window in tokens.windows(n) {
            *counts.entry(window).or_insert(0) += 1;
        }
    }
    counts
}
