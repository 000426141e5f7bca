//! # im2latex-eval
//!
//! Evaluation of trained image-to-LaTeX sequence models: beam-search decoding of
//! formula images through an ONNX Runtime model, and corpus-level scoring of the
//! decoded formulas against their references.
//!
//! ## Features
//!
//! - Beam-search decoder over any [`SequenceScorer`](core::traits::SequenceScorer),
//!   with a greedy path for cross-checking
//! - Parallel batch driver that keeps hypothesis and reference corpora aligned,
//!   dropping failed items from both sides
//! - Corpus BLEU-4, exact match and edit similarity
//! - ONNX Runtime integration with session pooling
//!
//! ## Modules
//!
//! * [`core`] - Configuration, error handling, inference and the scorer trait
//! * [`domain`] - Vocabulary, dataset, encoded images and hypotheses
//! * [`metrics`] - Corpus scoring
//! * [`models`] - Checkpoint manifest and the ONNX-backed model
//! * [`pipeline`] - The batch decode driver and run statistics
//! * [`processors`] - Beam search and distribution handling
//! * [`utils`] - Image loading and corpus files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use im2latex_eval::prelude::*;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let vocab = Vocabulary::load(Path::new("sample_data/vocab.txt"))?;
//! let checkpoint = ModelCheckpoint::load(Path::new("ckpt/best.json"))?;
//! let model = Arc::new(Im2LatexModel::load(&checkpoint, &vocab, &Default::default())?);
//!
//! let dataset = FormulaDataset::load(
//!     Path::new("sample_data"),
//!     Path::new("data"),
//!     Split::Validate,
//!     &vocab,
//!     64,
//! )?;
//!
//! let decoder = BeamSearchDecoder::from_vocab(Arc::clone(&model), DecodeConfig::new(), &vocab)?;
//! let driver = BatchDecodeDriver::new(decoder, vocab, ParallelPolicy::new())?;
//! let report = driver.run(dataset.into_items(), |item| model.prepare(&item));
//!
//! println!("{} ({} skipped)", report.score()?, report.skip_count());
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod core;
pub mod domain;
pub mod metrics;
pub mod models;

pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// Bring the essentials into scope with a single use statement:
///
/// ```rust
/// use im2latex_eval::prelude::*;
/// ```
///
/// Included items cover a full evaluation run: configuration, vocabulary and dataset,
/// the model, the decoder, the driver and the scorer.
pub mod prelude {
    pub use crate::core::{
        DecodeConfig, DecodeFailure, EvalError, EvalResult, LengthNormalization,
        OrtSessionConfig, ParallelPolicy, SequenceScorer,
    };
    pub use crate::domain::{
        DatasetItem, DecodedSequence, EncodedImage, FormulaDataset, Split, TokenId, Vocabulary,
    };
    pub use crate::metrics::{CorpusScorer, CorpusScores};
    pub use crate::models::{Im2LatexModel, ModelCheckpoint};
    pub use crate::pipeline::{BatchDecodeDriver, DecodeReport, SkipReason};
    pub use crate::processors::BeamSearchDecoder;
}
