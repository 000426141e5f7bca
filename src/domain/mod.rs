//! Domain types for image-to-LaTeX evaluation.
//!
//! * [`vocab`] - bidirectional token/id mapping with START/END/PAD/UNK sentinels
//! * [`dataset`] - im2latex-style dataset listing (image file + reference formula)
//! * [`encoded`] - the opaque encoder output consumed by the scorer
//! * [`hypothesis`] - hypotheses, beams and decoded sequences

pub mod dataset;
pub mod encoded;
pub mod hypothesis;
pub mod vocab;

/// Integer id of a vocabulary token.
pub type TokenId = u32;

pub use dataset::{DatasetItem, FormulaDataset, Split};
pub use encoded::EncodedImage;
pub use hypothesis::{Beam, DecodedSequence, Hypothesis};
pub use vocab::Vocabulary;
