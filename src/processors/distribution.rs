//! Validation of scorer output and conversion to log-probabilities.
//!
//! A sequence scorer hands back raw probabilities. Before the decoder ranks anything
//! every row is checked (finite, non-negative, positive mass), renormalised to sum to
//! one and converted to natural-log space. Tokens with zero probability become
//! `-inf` and are never expanded.

use crate::core::errors::DecodeFailure;
use crate::domain::TokenId;
use ndarray::{Array2, ArrayView1};

/// Validates a `[rows, vocab_size]` probability matrix and converts it to log space.
///
/// # Arguments
///
/// * `probs` - Matrix returned by the scorer
/// * `rows` - Number of prefixes that were scored
/// * `vocab_size` - Expected width of each row
/// * `step` - Decode step, recorded in any failure
///
/// # Errors
///
/// Returns the first [`DecodeFailure`] found, scanning rows in order.
pub fn to_log_probs(
    probs: &Array2<f32>,
    rows: usize,
    vocab_size: usize,
    step: usize,
) -> Result<Array2<f64>, DecodeFailure> {
    let (actual_rows, actual_cols) = probs.dim();
    if actual_rows != rows || actual_cols != vocab_size {
        return Err(DecodeFailure::ShapeMismatch {
            step,
            expected: (rows, vocab_size),
            actual: (actual_rows, actual_cols),
        });
    }

    let mut out = Array2::<f64>::zeros((rows, vocab_size));
    for (row, (src, mut dst)) in probs.outer_iter().zip(out.outer_iter_mut()).enumerate() {
        let mass = row_mass(src, step, row)?;
        for (d, &p) in dst.iter_mut().zip(src.iter()) {
            *d = (f64::from(p) / mass).ln();
        }
    }
    Ok(out)
}

fn row_mass(row_probs: ArrayView1<'_, f32>, step: usize, row: usize) -> Result<f64, DecodeFailure> {
    let mut mass = 0.0f64;
    for (token, &p) in row_probs.iter().enumerate() {
        if !p.is_finite() {
            return Err(DecodeFailure::NonFinite {
                step,
                row,
                token: token as TokenId,
            });
        }
        if p < 0.0 {
            return Err(DecodeFailure::NegativeProbability {
                step,
                row,
                token: token as TokenId,
                value: p,
            });
        }
        mass += f64::from(p);
    }
    if mass <= 0.0 || !mass.is_finite() {
        return Err(DecodeFailure::ZeroMass { step, row });
    }
    Ok(mass)
}

/// Returns up to `k` expandable tokens of one log-probability row, best first.
///
/// Ties keep the lower token id first; `-inf` entries are excluded.
pub fn top_k_tokens(log_probs: ArrayView1<'_, f64>, k: usize) -> Vec<(TokenId, f64)> {
    let mut candidates: Vec<(TokenId, f64)> = log_probs
        .iter()
        .enumerate()
        .filter(|(_, lp)| lp.is_finite())
        .map(|(token, &lp)| (token as TokenId, lp))
        .collect();
    // stable: equal scores stay in ascending id order
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    candidates.truncate(k);
    candidates
}

/// First token holding the maximum log-probability, if any is finite.
pub fn argmax(log_probs: ArrayView1<'_, f64>) -> Option<(TokenId, f64)> {
    let mut best: Option<(TokenId, f64)> = None;
    for (token, &lp) in log_probs.iter().enumerate() {
        if !lp.is_finite() {
            continue;
        }
        match best {
            Some((_, best_lp)) if lp <= best_lp => {}
            _ => best = Some((token as TokenId, lp)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_renormalises_and_takes_log() {
        let probs = array![[1.0f32, 1.0, 2.0]];
        let lp = to_log_probs(&probs, 1, 3, 0).unwrap();
        assert!((lp[[0, 0]] - 0.25f64.ln()).abs() < 1e-12);
        assert!((lp[[0, 2]] - 0.5f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_probability_is_negative_infinity() {
        let probs = array![[0.0f32, 1.0]];
        let lp = to_log_probs(&probs, 1, 2, 0).unwrap();
        assert_eq!(lp[[0, 0]], f64::NEG_INFINITY);
        assert_eq!(lp[[0, 1]], 0.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let probs = array![[0.5f32, 0.5]];
        let err = to_log_probs(&probs, 2, 2, 4).unwrap_err();
        assert!(matches!(
            err,
            DecodeFailure::ShapeMismatch {
                step: 4,
                expected: (2, 2),
                actual: (1, 2)
            }
        ));
    }

    #[test]
    fn test_nan_is_non_finite() {
        let probs = array![[0.5f32, 0.5], [f32::NAN, 1.0]];
        let err = to_log_probs(&probs, 2, 2, 1).unwrap_err();
        assert!(matches!(
            err,
            DecodeFailure::NonFinite {
                step: 1,
                row: 1,
                token: 0
            }
        ));
    }

    #[test]
    fn test_negative_probability() {
        let probs = array![[1.5f32, -0.5]];
        let err = to_log_probs(&probs, 1, 2, 0).unwrap_err();
        assert!(matches!(
            err,
            DecodeFailure::NegativeProbability { token: 1, .. }
        ));
    }

    #[test]
    fn test_zero_mass() {
        let probs = array![[0.0f32, 0.0]];
        let err = to_log_probs(&probs, 1, 2, 2).unwrap_err();
        assert!(matches!(err, DecodeFailure::ZeroMass { step: 2, row: 0 }));
    }

    #[test]
    fn test_top_k_tokens_breaks_ties_by_id() {
        let row = array![0.5f64.ln(), 0.25f64.ln(), f64::NEG_INFINITY, 0.25f64.ln()];
        let top = top_k_tokens(row.view(), 2);
        assert_eq!(top.iter().map(|t| t.0).collect::<Vec<_>>(), vec![0, 1]);
        let all = top_k_tokens(row.view(), 10);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_argmax_takes_first_maximum() {
        let row = array![f64::NEG_INFINITY, -1.0, -0.5, -0.5];
        assert_eq!(argmax(row.view()), Some((2, -0.5)));
        let dead = array![f64::NEG_INFINITY];
        assert_eq!(argmax(dead.view()), None);
    }
}
