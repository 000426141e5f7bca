//! Token-level edit distance.

/// Levenshtein distance between two token sequences.
pub fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, x) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, y) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(x != y);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Corpus edit similarity on a 0-100 scale.
///
/// Computed as `1 - sum(distance) / sum(max(len h, len r))`; a corpus whose pairs
/// are all empty scores 100, an empty corpus scores 0.
pub fn corpus_edit_similarity(hypotheses: &[Vec<&str>], references: &[Vec<&str>]) -> f64 {
    if hypotheses.is_empty() {
        return 0.0;
    }
    let mut distance = 0usize;
    let mut span = 0usize;
    for (hyp, reference) in hypotheses.iter().zip(references) {
        distance += levenshtein(hyp, reference);
        span += hyp.len().max(reference.len());
    }
    if span == 0 {
        return 100.0;
    }
    (100.0 * (1.0 - distance as f64 / span as f64)).clamp(0.0, 100.0)
}
