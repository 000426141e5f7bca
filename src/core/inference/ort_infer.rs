//! Core ONNX Runtime inference engine with support for pooling and configurable sessions.

use crate::core::errors::{EvalError, EvalResult, SimpleError};
use ort::session::Session;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[path = "ort_infer_builders.rs"]
mod ort_infer_builders;
#[path = "ort_infer_execution.rs"]
mod ort_infer_execution;
#[cfg(test)]
#[path = "ort_infer_tests.rs"]
mod ort_infer_tests;

/// A pool of ONNX Runtime sessions over one model graph.
///
/// Sessions are handed out round-robin so that several decoding threads can run
/// the same graph without queueing on a single lock.
pub struct OrtInfer {
    pub(super) sessions: Vec<Mutex<Session>>,
    pub(super) next_idx: AtomicUsize,
    pub(super) output_name: Option<String>,
    pub(super) model_path: std::path::PathBuf,
    pub(super) model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("sessions", &self.sessions.len())
            .field("output_name", &self.output_name)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Number of sessions in the pool.
    pub fn pool_size(&self) -> usize {
        self.sessions.len()
    }

    /// Runs `f` on the next session of the pool.
    pub(super) fn with_session<T>(
        &self,
        f: impl FnOnce(&mut Session) -> EvalResult<T>,
    ) -> EvalResult<T> {
        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session_guard = self.sessions[idx].lock().map_err(|_| {
            EvalError::inference_error(
                &self.model_name,
                &format!(
                    "Failed to acquire session lock for session {}/{}",
                    idx,
                    self.sessions.len()
                ),
                SimpleError::new("Session lock acquisition failed"),
            )
        })?;
        f(&mut session_guard)
    }
}
