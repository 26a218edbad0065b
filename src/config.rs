//! Engine configuration, loaded from JSON.
//!
//! Every field has a default, so `{}` is a valid configuration. Unknown fields
//! are rejected to catch typos early.

use crate::function::FunctionParameters;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {error}")]
    Io { path: PathBuf, error: std::io::Error },

    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Worker pool could not be built: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Active entries kept by the compilation cache before the oldest is evicted.
    #[serde(default = "default_cache_capacity")]
    pub compilation_cache_capacity: usize,
    /// Size of the worker pool. `None` lets rayon pick one thread per core.
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// How long the executor blocks for a job result before re-checking for interruption.
    #[serde(default = "default_poll_interval_ms")]
    pub result_poll_interval_ms: u64,
    #[serde(default = "default_node_name")]
    pub node_name: String,
    /// Passed to every function compilation.
    #[serde(default)]
    pub function_parameters: FunctionParameters,
}

fn default_cache_capacity() -> usize { 32 }
fn default_poll_interval_ms() -> u64 { 5000 }
fn default_node_name() -> String { "local".to_string() }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compilation_cache_capacity: default_cache_capacity(),
            worker_threads: None,
            result_poll_interval_ms: default_poll_interval_ms(),
            node_name: default_node_name(),
            function_parameters: FunctionParameters::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e,
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compilation_cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "compilation_cache_capacity",
                reason: "must be at least 1".into(),
            });
        }
        if self.worker_threads == Some(0) {
            return Err(ConfigError::Invalid { field: "worker_threads", reason: "must be at least 1".into() });
        }
        if self.result_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "result_poll_interval_ms",
                reason: "must be at least 1".into(),
            });
        }
        if self.node_name.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "node_name", reason: "must not be blank".into() });
        }
        Ok(())
    }

    pub fn result_poll_interval(&self) -> Duration {
        Duration::from_millis(self.result_poll_interval_ms)
    }

    /// The bounded pool shared by function compilation and local job execution.
    pub fn build_worker_pool(&self) -> Result<ThreadPool, ConfigError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("calc-worker-{}", i));
        if let Some(threads) = self.worker_threads {
            builder = builder.num_threads(threads);
        }
        Ok(builder.build()?)
    }
}
