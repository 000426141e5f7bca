//! Structures and helpers for ONNX Runtime inference.
//!
//! The trained encoder and decoder-step graphs are executed through [`OrtInfer`],
//! a small session pool shared by all decoding threads.

pub mod ort_infer;

pub use ort_infer::OrtInfer;
