//! ONNX Runtime session configuration and device selection.

use super::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Execution providers for ONNX Runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum OrtExecutionProvider {
    /// CPU execution provider (always available)
    #[default]
    CPU,
    /// NVIDIA CUDA execution provider
    CUDA {
        /// CUDA device ID (default: 0)
        device_id: Option<i32>,
    },
}

/// Configuration for ONNX Runtime sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrtSessionConfig {
    /// Number of threads used to parallelize execution within nodes
    pub intra_threads: Option<usize>,
    /// Execution providers in order of preference
    pub execution_providers: Option<Vec<OrtExecutionProvider>>,
    /// Number of sessions created per graph so concurrent workers do not serialise.
    pub session_pool_size: Option<usize>,
}

impl OrtSessionConfig {
    /// Creates a new OrtSessionConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of intra-op threads.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Adds a single execution provider.
    pub fn add_execution_provider(mut self, provider: OrtExecutionProvider) -> Self {
        if let Some(ref mut providers) = self.execution_providers {
            providers.push(provider);
        } else {
            self.execution_providers = Some(vec![provider]);
        }
        self
    }

    /// Sets how many sessions are opened per model graph.
    pub fn with_session_pool_size(mut self, size: usize) -> Self {
        self.session_pool_size = Some(size);
        self
    }

    /// Replicates every graph once per decode worker.
    ///
    /// Each session gets an equal share of the machine's cores for its intra-op
    /// pool so that `workers` concurrent sessions do not oversubscribe the CPU.
    pub fn with_worker_count(self, workers: usize) -> Self {
        let workers = workers.max(1);
        let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
        self.with_session_pool_size(workers)
            .with_intra_threads((cores / workers).max(1))
    }

    /// Gets the execution providers, defaulting to CPU.
    pub fn get_execution_providers(&self) -> Vec<OrtExecutionProvider> {
        self.execution_providers
            .clone()
            .unwrap_or_else(|| vec![OrtExecutionProvider::CPU])
    }

    /// Gets the effective session pool size (at least one).
    pub fn get_session_pool_size(&self) -> usize {
        self.session_pool_size.unwrap_or(1).max(1)
    }
}

/// Parses a device string (`cpu`, `cuda`, `cuda:N`) into a session configuration.
///
/// CUDA falls back to CPU inside ONNX Runtime when the provider is unavailable,
/// so CPU is always appended after it.
pub fn parse_device_config(device: &str) -> Result<OrtSessionConfig, ConfigError> {
    let device = device.trim().to_ascii_lowercase();
    match device.as_str() {
        "cpu" => Ok(OrtSessionConfig::new().add_execution_provider(OrtExecutionProvider::CPU)),
        "cuda" | "gpu" => Ok(OrtSessionConfig::new()
            .add_execution_provider(OrtExecutionProvider::CUDA { device_id: None })
            .add_execution_provider(OrtExecutionProvider::CPU)),
        other => {
            if let Some(id) = other.strip_prefix("cuda:") {
                let device_id = id.parse::<i32>().map_err(|_| ConfigError::InvalidConfig {
                    message: format!("invalid CUDA device id '{}'", id),
                })?;
                Ok(OrtSessionConfig::new()
                    .add_execution_provider(OrtExecutionProvider::CUDA {
                        device_id: Some(device_id),
                    })
                    .add_execution_provider(OrtExecutionProvider::CPU))
            } else {
                Err(ConfigError::InvalidConfig {
                    message: format!(
                        "unsupported device '{}' (expected 'cpu', 'cuda' or 'cuda:N')",
                        other
                    ),
                })
            }
        }
    }
}
