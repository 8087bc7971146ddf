//! Engine configuration.
//!
//! Plain structs with sensible defaults, a few named presets, and `with_*`
//! builder methods. Every section can also be loaded from YAML, where missing
//! keys fall back to their defaults:
//!
//! ```yaml
//! pool:
//!   max_idle: 128
//!   prewarm: 16
//! variables:
//!   max_entries_per_scope: 100000
//!   default_ttl_secs: 300
//! parallel:
//!   enabled: true
//!   min_batch_size_for_parallelism: 64
//! ```

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Evaluation context pool sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of idle contexts retained for reuse.
    ///
    /// Contexts released while the pool already holds this many are freed.
    ///
    /// **Default**: 64
    pub max_idle: usize,

    /// Contexts allocated when the pool is created. Capped at `max_idle`.
    ///
    /// **Default**: 0
    pub prewarm: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: 64,
            prewarm: 0,
        }
    }
}

/// Largest accepted `default_ttl_secs`: ten years.
pub const MAX_DEFAULT_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Scoped variable store limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableConfig {
    /// Upper bound on live entries per scope. Writes that would create a new
    /// entry beyond it are rejected and counted. `None` disables the check.
    ///
    /// **Default**: 1,000,000
    pub max_entries_per_scope: Option<usize>,

    /// Expiry applied to writes whose action carries no TTL of its own.
    ///
    /// At most [`MAX_DEFAULT_TTL_SECS`].
    ///
    /// **Default**: none (entries live until released)
    pub default_ttl_secs: Option<u64>,
}

impl Default for VariableConfig {
    fn default() -> Self {
        Self {
            max_entries_per_scope: Some(1_000_000),
            default_ttl_secs: None,
        }
    }
}

impl VariableConfig {
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_secs.map(Duration::from_secs)
    }
}

/// Batch evaluation parallelism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Evaluate batch events on the rayon pool.
    pub enabled: bool,
    /// Worker threads. When it differs from the global rayon pool size the
    /// engine builds a dedicated pool.
    pub num_threads: usize,
    /// Batches smaller than this are evaluated sequentially.
    pub min_batch_size_for_parallelism: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_threads: rayon::current_num_threads(),
            min_batch_size_for_parallelism: 100,
        }
    }
}

/// Complete engine configuration.
///
/// # Example
/// ```rust,ignore
/// use secl_eval::config::EngineConfig;
///
/// let config = EngineConfig::new()
///     .with_max_idle_contexts(256)
///     .with_max_entries_per_scope(50_000)
///     .with_parallel_processing(true);
/// config.validate()?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pool: PoolConfig,
    pub variables: VariableConfig,
    pub parallel: ParallelConfig,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Large idle pool, pre-warmed, eager parallel batches.
    pub fn high_throughput() -> Self {
        Self {
            pool: PoolConfig {
                max_idle: 1024,
                prewarm: rayon::current_num_threads(),
            },
            variables: VariableConfig::default(),
            parallel: ParallelConfig {
                enabled: true,
                num_threads: rayon::current_num_threads(),
                min_batch_size_for_parallelism: 32,
            },
        }
    }

    /// Small bounded pool, tight variable limits, sequential evaluation.
    pub fn development() -> Self {
        Self {
            pool: PoolConfig {
                max_idle: 4,
                prewarm: 0,
            },
            variables: VariableConfig {
                max_entries_per_scope: Some(10_000),
                default_ttl_secs: None,
            },
            parallel: ParallelConfig {
                enabled: false,
                ..Default::default()
            },
        }
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.parallel.num_threads == 0 {
            return Err(EvalError::InvalidConfig(
                "parallel.num_threads must be at least 1".to_string(),
            ));
        }
        if self.variables.max_entries_per_scope == Some(0) {
            return Err(EvalError::InvalidConfig(
                "variables.max_entries_per_scope must be at least 1".to_string(),
            ));
        }
        match self.variables.default_ttl_secs {
            Some(0) => {
                return Err(EvalError::InvalidConfig(
                    "variables.default_ttl_secs must be at least 1".to_string(),
                ))
            }
            Some(secs) if secs > MAX_DEFAULT_TTL_SECS => {
                return Err(EvalError::InvalidConfig(format!(
                    "variables.default_ttl_secs ({secs}) exceeds {MAX_DEFAULT_TTL_SECS}"
                )))
            }
            _ => {}
        }
        if self.pool.prewarm > self.pool.max_idle {
            return Err(EvalError::InvalidConfig(format!(
                "pool.prewarm ({}) exceeds pool.max_idle ({})",
                self.pool.prewarm, self.pool.max_idle
            )));
        }
        Ok(())
    }

    // Pool

    pub fn with_max_idle_contexts(mut self, max_idle: usize) -> Self {
        self.pool.max_idle = max_idle;
        self
    }

    pub fn with_prewarm(mut self, prewarm: usize) -> Self {
        self.pool.prewarm = prewarm;
        self
    }

    // Variables

    pub fn with_max_entries_per_scope(mut self, max_entries: usize) -> Self {
        self.variables.max_entries_per_scope = Some(max_entries);
        self
    }

    pub fn without_scope_limit(mut self) -> Self {
        self.variables.max_entries_per_scope = None;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.variables.default_ttl_secs = Some(ttl.as_secs().max(1));
        self
    }

    // Parallelism

    pub fn with_parallel_processing(mut self, enable: bool) -> Self {
        self.parallel.enabled = enable;
        self
    }

    pub fn with_parallel_threads(mut self, num_threads: usize) -> Self {
        self.parallel.num_threads = num_threads;
        self
    }

    pub fn with_min_batch_size_for_parallelism(mut self, min_size: usize) -> Self {
        self.parallel.min_batch_size_for_parallelism = min_size;
        self
    }
}
