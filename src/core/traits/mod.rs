//! Traits at the seams between the decoder and its collaborators.

pub mod scorer;

pub use scorer::SequenceScorer;
