#![forbid(unsafe_code)]

mod memory_space;
mod pricing;

pub use memory_space::MemorySpace;
pub use pricing::PricingUnits;

/// Snapshot of the remote function's configuration taken before the first
/// mutation, restored at teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionConfig {
    pub memory_mb: u32,
    pub timeout_s: u32,
}

/// Optional constraints applied when minimizing the fitted cost model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Constraints {
    /// Upper bound on the modeled execution time, in ms. Advisory.
    pub execution_time_threshold_ms: Option<f64>,
    /// Cost-tolerance window in percent of the minimum modeled cost.
    pub cost_tolerance_percent: Option<u8>,
}
