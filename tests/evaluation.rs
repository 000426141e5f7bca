//! End-to-end evaluation scenarios through the public API.

use im2latex_eval::prelude::*;
use im2latex_eval::utils::{read_corpus, write_corpus_pair};
use ndarray::Array2;
use tempfile::tempdir;

const VOCAB: [&str; 6] = ["<s>", "</s>", "<pad>", "x", "y", "<unk>"];
const END: usize = 1;
const X: usize = 3;
const Y: usize = 4;

/// Emits "x", "y", END at steps 0, 1, 2 regardless of the image.
struct ScriptedScorer;

impl SequenceScorer for ScriptedScorer {
    fn vocab_size(&self) -> usize {
        VOCAB.len()
    }

    fn next_token_probs(
        &self,
        prefixes: &[&[TokenId]],
        _image: &EncodedImage,
    ) -> EvalResult<Array2<f32>> {
        let mut out = Array2::zeros((prefixes.len(), VOCAB.len()));
        for (row, prefix) in prefixes.iter().enumerate() {
            let token = match prefix.len() - 1 {
                0 => X,
                1 => Y,
                _ => END,
            };
            out[[row, token]] = 1.0;
        }
        Ok(out)
    }
}

/// Never emits END.
struct EndlessScorer;

impl SequenceScorer for EndlessScorer {
    fn vocab_size(&self) -> usize {
        VOCAB.len()
    }

    fn next_token_probs(
        &self,
        prefixes: &[&[TokenId]],
        _image: &EncodedImage,
    ) -> EvalResult<Array2<f32>> {
        let mut out = Array2::zeros((prefixes.len(), VOCAB.len()));
        for row in 0..prefixes.len() {
            out[[row, X]] = 0.7;
            out[[row, Y]] = 0.3;
        }
        Ok(out)
    }
}

/// Behaves like `ScriptedScorer`, but returns a negative probability for images
/// whose first feature is negative.
struct FaultyScorer;

impl SequenceScorer for FaultyScorer {
    fn vocab_size(&self) -> usize {
        VOCAB.len()
    }

    fn next_token_probs(
        &self,
        prefixes: &[&[TokenId]],
        image: &EncodedImage,
    ) -> EvalResult<Array2<f32>> {
        let mut out = ScriptedScorer.next_token_probs(prefixes, image)?;
        if image.features().iter().next().is_some_and(|&v| v < 0.0) {
            out[[0, Y]] = -0.5;
        }
        Ok(out)
    }
}

fn vocab() -> Vocabulary {
    Vocabulary::from_tokens(VOCAB).unwrap()
}

fn decoder<S: SequenceScorer>(scorer: S, k: usize, l: usize) -> BeamSearchDecoder<S> {
    let config = DecodeConfig::new().with_beam_width(k).with_max_length(l);
    BeamSearchDecoder::from_vocab(scorer, config, &vocab()).unwrap()
}

fn image(first: f32) -> EncodedImage {
    EncodedImage::from(vec![first, 0.0, 0.0])
}

#[test]
fn scripted_scorer_decodes_x_y() {
    let decoded = decoder(ScriptedScorer, 2, 5).decode(&image(0.0)).unwrap();
    assert_eq!(decoded.tokens, vec![3, 4]);
    assert!(!decoded.length_capped);
    assert_eq!(vocab().ids_to_formula(&decoded.tokens), "x y");
}

#[test]
fn endless_scorer_is_capped_at_max_length() {
    let decoded = decoder(EndlessScorer, 2, 3).decode(&image(0.0)).unwrap();
    assert_eq!(decoded.tokens.len(), 3);
    assert!(decoded.length_capped);
}

#[test]
fn beam_width_one_equals_greedy() {
    for l in 1..=4 {
        let dec = decoder(EndlessScorer, 1, l);
        assert_eq!(
            dec.decode(&image(0.0)).unwrap(),
            dec.greedy_decode(&image(0.0)).unwrap()
        );
        let dec = decoder(ScriptedScorer, 1, l);
        assert_eq!(
            dec.decode(&image(0.0)).unwrap(),
            dec.greedy_decode(&image(0.0)).unwrap()
        );
    }
}

#[test]
fn one_failure_in_three_items_keeps_order() {
    let driver =
        BatchDecodeDriver::new(decoder(FaultyScorer, 2, 5), vocab(), ParallelPolicy::new())
            .unwrap();
    let items = vec![
        (image(0.0), vec![3, 4]),
        (image(-1.0), vec![4]),
        (image(0.0), vec![3, 3]),
    ];
    let report = driver.run_encoded(items);

    assert_eq!(report.hypotheses.len(), 2);
    assert_eq!(report.references.len(), 2);
    assert_eq!(report.skip_count(), 1);
    assert_eq!(report.skip_count(), report.stats.total_items - report.len());
    assert_eq!(report.references, vec!["x y", "x x"]);
    assert!(matches!(
        report.skipped[0].reason,
        SkipReason::Decode(DecodeFailure::NegativeProbability { .. })
    ));
}

#[test]
fn corpus_files_round_trip_to_scores() {
    let driver =
        BatchDecodeDriver::new(decoder(ScriptedScorer, 3, 5), vocab(), ParallelPolicy::new())
            .unwrap();
    let items = vec![(image(0.0), vec![3, 4]), (image(0.0), vec![3, 4])];
    let report = driver.run_encoded(items);

    let dir = tempdir().unwrap();
    let result_path = dir.path().join("results").join("result.txt");
    let ref_path = dir.path().join("results").join("ref.txt");
    write_corpus_pair(&result_path, &ref_path, &report.hypotheses, &report.references).unwrap();

    assert_eq!(read_corpus(&result_path).unwrap(), vec!["x y", "x y"]);
    let scores = CorpusScorer::new()
        .score_files(&result_path, &ref_path)
        .unwrap();
    assert!((scores.bleu4 - 100.0).abs() < 1e-9);
    assert_eq!(scores.exact_match, 100.0);
    assert_eq!(scores, report.score().unwrap());
}

#[test]
fn mismatched_corpora_are_refused() {
    let err = CorpusScorer::new()
        .score(&["x y", "x"], &["x y"])
        .unwrap_err();
    assert!(matches!(err, EvalError::LengthMismatch { .. }));
}
