//! Shared parallel processing configuration types.

use serde::{Deserialize, Serialize};

/// Centralized configuration for parallel processing behavior across the
/// preprocessing pipeline.
///
/// Dataset preprocessing is embarrassingly parallel per image; this
/// struct provides one place to tune how much of the machine it uses and
/// below which input counts the sequential path is taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of threads to use for parallel processing.
    /// If None, rayon will use the default thread pool size (typically
    /// the number of CPU cores).
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Threshold for dataset-level operations (<= this many inputs uses
    /// the sequential path).
    #[serde(default = "ParallelPolicy::default_dataset_threshold")]
    pub dataset_threshold: usize,
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

    /// Set the dataset-level sequential threshold.
    pub fn with_dataset_threshold(mut self, threshold: usize) -> Self {
        self.dataset_threshold = threshold;
        self
    }

    /// Install the global rayon thread pool with the configured number of
    /// threads.
    ///
    /// Should be called once at application startup before any parallel
    /// processing occurs. If `max_threads` is None, this method does
    /// nothing and rayon uses its default pool size.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the thread pool was configured
    /// - `Ok(false)` if `max_threads` is None (no configuration needed)
    /// - `Err` if the thread pool has already been initialized
    pub fn install_global_thread_pool(&self) -> Result<bool, rayon::ThreadPoolBuildError> {
        if let Some(num_threads) = self.max_threads {
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Whether a workload of `len` inputs should run sequentially.
    pub fn sequential_for(&self, len: usize) -> bool {
        len <= self.dataset_threshold
    }

    fn default_dataset_threshold() -> usize {
        4
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            dataset_threshold: Self::default_dataset_threshold(),
        }
    }
}
