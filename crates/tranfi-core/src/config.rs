//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows per batch handed from the decoder to the operator chain, unless the
    /// decoder step overrides it with its own `batch_size` argument.
    pub batch_size: usize,

    /// Optional seed for `sample`. Unseeded samples draw from OS entropy.
    pub seed: Option<u64>,

    /// Number of rows mirrored to the samples channel (as JSON lines).
    pub sample_rows: usize,

    /// Error records beyond this count are tallied but not written.
    pub max_errors: usize,

    /// Write the `key: value` stats block at finish.
    pub emit_stats: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            seed: None,
            sample_rows: 10,
            max_errors: 10_000,
            emit_stats: true,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TRANFI_BATCH_SIZE`: rows per decoded batch
    /// - `TRANFI_SEED`: seed for sampling
    /// - `TRANFI_SAMPLE_ROWS`: rows mirrored to the samples channel
    /// - `TRANFI_MAX_ERRORS`: cap on written error records
    /// - `TRANFI_STATS`: `0`/`false` disables the stats block
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("TRANFI_BATCH_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.batch_size = v.max(1);
            }
        }

        if let Ok(s) = std::env::var("TRANFI_SEED") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.seed = Some(v);
            }
        }

        if let Ok(s) = std::env::var("TRANFI_SAMPLE_ROWS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.sample_rows = v;
            }
        }

        if let Ok(s) = std::env::var("TRANFI_MAX_ERRORS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_errors = v;
            }
        }

        if let Ok(s) = std::env::var("TRANFI_STATS") {
            cfg.emit_stats = !matches!(s.trim(), "0" | "false" | "off" | "no");
        }

        cfg
    }

    /// Reject settings the engine cannot honor.
    pub fn validate(&self) -> crate::Result<()> {
        if self.batch_size == 0 {
            return Err(crate::Error::Config("batch_size must be > 0".into()));
        }
        Ok(())
    }
}
