//! Shared parallel processing configuration types.

use super::errors::{ConfigError, ConfigValidator};
use serde::{Deserialize, Serialize};

/// Configuration of how the batch driver spreads decodes over worker threads.
///
/// Batch size only affects throughput: every image is decoded independently, so
/// results are identical for any batch size or thread count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of threads to use for parallel decoding.
    /// If None, rayon will use the default thread pool size (typically number of CPU cores).
    /// Default: None (use rayon's default)
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Number of dataset items submitted to the pool at a time.
    /// Default: 32
    #[serde(default = "ParallelPolicy::default_batch_size")]
    pub batch_size: usize,

    /// Stop submitting new decodes once this many items have failed.
    /// In-flight decodes still run to completion.
    /// Default: None (never stop early)
    #[serde(default)]
    pub max_failures: Option<usize>,

    /// Threshold for number of items to decode sequentially (<= this uses sequential)
    /// Default: 1
    #[serde(default = "ParallelPolicy::default_sequential_threshold")]
    pub sequential_threshold: usize,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the submission batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the failure count after which no new decodes are started.
    pub fn with_max_failures(mut self, max_failures: Option<usize>) -> Self {
        self.max_failures = max_failures;
        self
    }

    /// Set the sequential processing threshold.
    pub fn with_sequential_threshold(mut self, threshold: usize) -> Self {
        self.sequential_threshold = threshold;
        self
    }

    /// Whether a chunk of `len` items should be decoded on the pool.
    pub fn should_use_parallel(&self, len: usize) -> bool {
        len > self.sequential_threshold
    }

    /// Number of decode workers the driver's pool will run.
    pub fn worker_count(&self) -> usize {
        self.max_threads.unwrap_or_else(rayon::current_num_threads)
    }

    /// Builds the rayon pool used by the batch driver.
    pub fn build_thread_pool(&self) -> Result<rayon::ThreadPool, ConfigError> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("decode-{}", i));
        if let Some(threads) = self.max_threads {
            builder = builder.num_threads(threads);
        }
        builder.build().map_err(|e| ConfigError::InvalidConfig {
            message: format!("failed to build decode thread pool: {}", e),
        })
    }

    /// Default value for batch size.
    fn default_batch_size() -> usize {
        32
    }

    /// Default value for the sequential threshold.
    fn default_sequential_threshold() -> usize {
        1
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            batch_size: Self::default_batch_size(),
            max_failures: None,
            sequential_threshold: Self::default_sequential_threshold(),
        }
    }
}

impl ConfigValidator for ParallelPolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_batch_size(self.batch_size)?;
        if let Some(threads) = self.max_threads {
            self.validate_thread_count(threads)?;
        }
        if let Some(limit) = self.max_failures {
            self.validate_positive_usize(limit, "max_failures")?;
        }
        Ok(())
    }
}
