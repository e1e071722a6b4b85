//! Solver configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the MCCFR engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfrConfig {
    /// Positive-regret discount exponent (DCFR).
    pub alpha: f32,

    /// Reserved; the negative-regret discount is currently fixed at 0.5.
    pub beta: f32,

    /// Cumulative-strategy discount exponent (DCFR).
    pub gamma: f32,

    /// Parallel samples per player per iteration.
    pub base_sample_size: usize,

    /// Enables intra-iteration parallelism.
    pub use_parallel: bool,

    /// Parallel worker count; 0 picks the rayon default.
    pub num_threads: usize,

    /// Monte Carlo run-outs per pre-river showdown evaluation.
    pub equity_samples: u32,
}

impl Default for CfrConfig {
    fn default() -> Self {
        Self {
            alpha: 1.5,
            beta: 0.0,
            gamma: 2.0,
            base_sample_size: 64,
            use_parallel: true,
            num_threads: 0,
            equity_samples: 50,
        }
    }
}
