//! Decoding processors.
//!
//! * `distribution` - validation of scorer output and log-space conversion
//! * `beam_search` - the beam-search decoder and its greedy cross-check

pub mod beam_search;
pub mod distribution;

pub use beam_search::BeamSearchDecoder;
pub use distribution::{argmax, to_log_probs, top_k_tokens};
