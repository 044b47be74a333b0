//! Engine configuration. Defaults are programmatic; `figment_config`
//! layers environment and file overrides on top of them.

use serde::{Deserialize, Serialize};

/// Which knapsack strategy the waste return planner uses. The greedy
/// baseline is what the test suite pins; the DP variant is kept as an
/// explicit, opt-in alternative for callers who want optimality over
/// the pinned behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnapsackMode {
    GreedyMassDescending,
    DynamicProgramming,
}

impl Default for KnapsackMode {
    fn default() -> Self {
        KnapsackMode::GreedyMassDescending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StowageConfig {
    /// Interior volume (cm^3) above which a container uses the interval
    /// occupancy backend instead of a dense bitmap.
    pub bitmap_volume_threshold: u64,
    /// Maximum number of lower-priority victims the rearrangement step
    /// will try before giving up on an item. Enumeration is meant to be
    /// exhaustive over every strictly-lower-priority already-placed
    /// item, so the default is effectively unbounded; a lower value
    /// trades search completeness for latency on containers packed with
    /// thousands of low-priority items, and each truncation is logged.
    pub max_rearrangement_victims: usize,
    pub knapsack_mode: KnapsackMode,
    /// Override for the placement planner's candidate-evaluation worker
    /// pool size; `None` uses `std::thread::available_parallelism()`.
    pub worker_pool_size: Option<usize>,
}

impl Default for StowageConfig {
    fn default() -> Self {
        StowageConfig {
            bitmap_volume_threshold: crate::occupancy::BITMAP_VOLUME_THRESHOLD,
            max_rearrangement_victims: usize::MAX,
            knapsack_mode: KnapsackMode::default(),
            worker_pool_size: None,
        }
    }
}

#[cfg(feature = "figment_config")]
impl StowageConfig {
    /// A figment layering environment variables prefixed `STOWAGE_` over
    /// the programmatic defaults. Callers may further `.merge()` a file
    /// provider (e.g. `figment::providers::Toml::file(...)`) before
    /// calling `.extract()`.
    pub fn figment() -> figment::Figment {
        use figment::providers::{Env, Serialized};
        figment::Figment::from(Serialized::defaults(StowageConfig::default()))
            .merge(Env::prefixed("STOWAGE_"))
    }
}
