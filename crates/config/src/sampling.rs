use serde::{Deserialize, Serialize};

/// Parameters of the per-memory dynamic sampling loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicSamplingParams {
    /// Cap on the number of invocations retained for one memory
    /// configuration.
    pub max_sample_per_config: usize,

    /// Consistency criterion: sampling at a memory value stops once the
    /// coefficient of variation of its durations falls below this value.
    pub coefficient_of_variation_threshold: f64,
}

impl Default for DynamicSamplingParams {
    fn default() -> Self {
        Self {
            max_sample_per_config: 8,
            coefficient_of_variation_threshold: 0.05,
        }
    }
}
