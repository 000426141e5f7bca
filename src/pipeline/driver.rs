//! Batch decoding of a dataset into aligned hypothesis/reference corpora.
//!
//! Items are processed in chunks of `ParallelPolicy::batch_size`. Within a chunk
//! every item is prepared (image loaded and encoded) and decoded independently on
//! the driver's rayon pool; results are sorted back into dataset order before they
//! are appended to the corpora.
//!
//! An item whose preparation or decode fails is dropped from both corpora and
//! recorded in [`DecodeReport::skipped`]. Once `max_failures` failures have been
//! counted no further items are started; those are recorded as cancelled.

use super::stats::DecodeStats;
use crate::core::config::{ConfigValidatorExt, ParallelPolicy};
use crate::core::errors::{DecodeFailure, EvalResult};
use crate::core::traits::SequenceScorer;
use crate::domain::{EncodedImage, TokenId, Vocabulary};
use crate::metrics::{CorpusScorer, CorpusScores};
use crate::processors::BeamSearchDecoder;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Called with the number of items finished since the previous call.
pub type ProgressCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Why an item is missing from the corpora.
#[derive(Debug)]
pub enum SkipReason {
    /// The decoder rejected the scorer output or the scorer failed.
    Decode(DecodeFailure),
    /// The image could not be loaded or encoded.
    Prepare(String),
    /// Never started because the failure limit was reached.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Decode(failure) => write!(f, "decode failure: {}", failure),
            SkipReason::Prepare(message) => write!(f, "preparation failed: {}", message),
            SkipReason::Cancelled => f.write_str("cancelled after failure limit"),
        }
    }
}

/// A dataset item excluded from both corpora.
#[derive(Debug)]
pub struct SkippedItem {
    /// Dataset position of the item.
    pub index: usize,
    pub reason: SkipReason,
}

/// Output of a batch decode run.
///
/// `hypotheses[i]` and `references[i]` always belong to the same dataset item, and
/// surviving items keep their dataset order.
#[derive(Debug, Default)]
pub struct DecodeReport {
    pub hypotheses: Vec<String>,
    pub references: Vec<String>,
    /// Skipped items in dataset order.
    pub skipped: Vec<SkippedItem>,
    /// Surviving hypotheses that hit the step limit.
    pub length_capped: usize,
    /// Whether the run stopped early because of the failure limit.
    pub cancelled: bool,
    pub stats: DecodeStats,
}

impl DecodeReport {
    /// Number of surviving pairs.
    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    /// Number of items excluded from the corpora.
    pub fn skip_count(&self) -> usize {
        self.skipped.len()
    }

    /// Scores the corpora.
    pub fn score(&self) -> EvalResult<CorpusScores> {
        CorpusScorer::new().score(&self.hypotheses, &self.references)
    }
}

enum ItemOutcome {
    Decoded {
        hypothesis: String,
        reference: String,
        length_capped: bool,
    },
    Skipped(SkipReason),
}

/// Runs a [`BeamSearchDecoder`] over a dataset.
pub struct BatchDecodeDriver<S> {
    decoder: BeamSearchDecoder<S>,
    vocab: Vocabulary,
    policy: ParallelPolicy,
    pool: rayon::ThreadPool,
    progress: Option<ProgressCallback>,
}

impl<S: SequenceScorer> BatchDecodeDriver<S> {
    /// Creates a driver and its worker pool.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::ConfigError` if the policy is invalid or the pool cannot
    /// be built.
    pub fn new(
        decoder: BeamSearchDecoder<S>,
        vocab: Vocabulary,
        policy: ParallelPolicy,
    ) -> EvalResult<Self> {
        let policy = policy.validated()?;
        let pool = policy.build_thread_pool()?;
        debug!(
            "Batch driver ready: {} threads, batch size {}",
            pool.current_num_threads(),
            policy.batch_size
        );
        Ok(Self {
            decoder,
            vocab,
            policy,
            pool,
            progress: None,
        })
    }

    /// Registers a progress callback.
    ///
    /// The callback receives `1` once for every item, cancelled items included,
    /// so a bar sized to the dataset always completes.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn decoder(&self) -> &BeamSearchDecoder<S> {
        &self.decoder
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn policy(&self) -> &ParallelPolicy {
        &self.policy
    }

    /// Decodes already encoded items given as `(image, reference ids)` pairs.
    pub fn run_encoded(&self, items: Vec<(EncodedImage, Vec<TokenId>)>) -> DecodeReport {
        self.run(items, Ok)
    }

    /// Prepares and decodes every item.
    ///
    /// `prepare` turns an item into its encoded image and reference ids; an error
    /// from it skips that item like a decode failure does. Per-item problems never
    /// fail the run.
    pub fn run<T, F>(&self, items: Vec<T>, prepare: F) -> DecodeReport
    where
        T: Send,
        F: Fn(T) -> EvalResult<(EncodedImage, Vec<TokenId>)> + Send + Sync,
    {
        let started = Instant::now();
        let total = items.len();
        let failures = AtomicUsize::new(0);
        let mut report = DecodeReport::default();
        let mut items = items.into_iter().enumerate().peekable();

        info!("Decoding {} items", total);
        while items.peek().is_some() {
            let chunk: Vec<(usize, T)> = items.by_ref().take(self.policy.batch_size).collect();
            let use_parallel = self.policy.should_use_parallel(chunk.len());

            let mut outcomes: Vec<(usize, ItemOutcome)> = if use_parallel {
                self.pool.install(|| {
                    chunk
                        .into_par_iter()
                        .map(|(index, item)| {
                            (index, self.process_item(index, item, &prepare, &failures))
                        })
                        .collect()
                })
            } else {
                chunk
                    .into_iter()
                    .map(|(index, item)| {
                        (index, self.process_item(index, item, &prepare, &failures))
                    })
                    .collect()
            };

            // Sort results back into dataset order
            outcomes.sort_by_key(|(index, _)| *index);
            for (index, outcome) in outcomes {
                record(&mut report, index, outcome);
            }
        }

        report.stats.total_items = total;
        report.stats.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug_assert_eq!(report.hypotheses.len(), report.references.len());
        debug_assert_eq!(report.hypotheses.len() + report.skipped.len(), total);

        info!(
            "Decoded {} of {} items ({} skipped, {} length-capped)",
            report.len(),
            total,
            report.skip_count(),
            report.length_capped
        );
        report
    }

    fn process_item<T, F>(
        &self,
        index: usize,
        item: T,
        prepare: &F,
        failures: &AtomicUsize,
    ) -> ItemOutcome
    where
        F: Fn(T) -> EvalResult<(EncodedImage, Vec<TokenId>)>,
    {
        let cancelled = self
            .policy
            .max_failures
            .is_some_and(|limit| failures.load(Ordering::Acquire) >= limit);

        let outcome = if cancelled {
            ItemOutcome::Skipped(SkipReason::Cancelled)
        } else {
            self.prepare_and_decode(index, item, prepare, failures)
        };

        if let Some(progress) = &self.progress {
            progress(1);
        }
        outcome
    }

    fn prepare_and_decode<T, F>(
        &self,
        index: usize,
        item: T,
        prepare: &F,
        failures: &AtomicUsize,
    ) -> ItemOutcome
    where
        F: Fn(T) -> EvalResult<(EncodedImage, Vec<TokenId>)>,
    {
        match prepare(item) {
            Err(e) => {
                warn!("Skipping item {}: preparation failed: {}", index, e);
                failures.fetch_add(1, Ordering::AcqRel);
                ItemOutcome::Skipped(SkipReason::Prepare(e.to_string()))
            }
            Ok((image, reference)) => match self.decoder.decode(&image) {
                Ok(decoded) => ItemOutcome::Decoded {
                    hypothesis: self.vocab.ids_to_formula(&decoded.tokens),
                    reference: self.vocab.ids_to_formula(&reference),
                    length_capped: decoded.length_capped,
                },
                Err(failure) => {
                    warn!("Skipping item {}: {}", index, failure);
                    failures.fetch_add(1, Ordering::AcqRel);
                    ItemOutcome::Skipped(SkipReason::Decode(failure))
                }
            },
        }
    }
}

fn record(report: &mut DecodeReport, index: usize, outcome: ItemOutcome) {
    match outcome {
        ItemOutcome::Decoded {
            hypothesis,
            reference,
            length_capped,
        } => {
            report.hypotheses.push(hypothesis);
            report.references.push(reference);
            report.stats.decoded += 1;
            if length_capped {
                report.length_capped += 1;
                report.stats.length_capped += 1;
            }
        }
        ItemOutcome::Skipped(reason) => {
            match reason {
                SkipReason::Cancelled => {
                    report.cancelled = true;
                    report.stats.cancelled += 1;
                }
                _ => report.stats.failed += 1,
            }
            report.skipped.push(SkippedItem { index, reason });
        }
    }
}
