//! Trained model collaborators.
//!
//! * `checkpoint` - the JSON checkpoint manifest and training-time arguments
//! * `im2latex` - the ONNX Runtime encoder/decoder-step pair implementing
//!   [`SequenceScorer`](crate::core::traits::SequenceScorer)

pub mod checkpoint;
pub mod im2latex;

pub use checkpoint::{GraphNames, ModelArgs, ModelCheckpoint};
pub use im2latex::Im2LatexModel;
