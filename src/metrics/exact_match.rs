//! Exact-match rate.

/// Percentage (0-100) of pairs whose token sequences are identical.
///
/// An empty corpus scores 0.
pub fn corpus_exact_match(hypotheses: &[Vec<&str>], references: &[Vec<&str>]) -> f64 {
    if hypotheses.is_empty() {
        return 0.0;
    }
    let hits = hypotheses
        .iter()
        .zip(references)
        .filter(|(hyp, reference)| hyp == reference)
        .count();
    100.0 * hits as f64 / hypotheses.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_rate() {
        let hyps = vec![vec!["a"], vec!["b", "c"], vec!["d"], vec![]];
        let refs = vec![vec!["a"], vec!["b"], vec!["e"], vec![]];
        assert_eq!(corpus_exact_match(&hyps, &refs), 50.0);
        assert_eq!(corpus_exact_match(&[], &[]), 0.0);
    }
}
