#![forbid(unsafe_code)]

mod error;
mod payload;
mod sampling;
mod vendor;

pub use error::Error;
pub use payload::WeightedPayload;
pub use sampling::DynamicSamplingParams;
pub use vendor::Vendor;

use serde::Deserialize;
use std::path::Path;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// A single optimization run's configuration.
///
/// Deserialized from a JSON document; every field except `function_name`,
/// `vendor`, `region` and the payload(s) has a default. `load` and
/// `from_value` run the validation pass, so a constructed `RunConfig` is
/// always well-formed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Name of the deployed serverless function to optimize.
    pub function_name: String,

    /// Selects the provider bindings.
    pub vendor: Vendor,

    /// Provider region hosting the function.
    pub region: String,

    #[serde(default)]
    payload: Option<serde_json::Value>,

    #[serde(default)]
    payloads: Option<Vec<WeightedPayload>>,

    /// Inclusive `[lo, hi]` bounds intersected with the provider's default
    /// memory space.
    #[serde(default)]
    pub memory_bounds: Option<[u32; 2]>,

    /// Minimum knowledge required at the predicted optimum before the
    /// recommender exits successfully.
    #[serde(default = "default_termination_threshold")]
    pub termination_threshold: f64,

    /// Budget on the total number of datapoints drawn during a run.
    #[serde(default = "default_max_total_sample_count", alias = "max_sample_count")]
    pub max_total_sample_count: usize,

    /// Initial number of parallel invocations per memory configuration.
    #[serde(default = "default_min_sample_per_config", alias = "number_invocations")]
    pub min_sample_per_config: usize,

    #[serde(default)]
    pub dynamic_sampling_params: DynamicSamplingParams,

    /// Per-invocation retry budget.
    #[serde(default = "default_max_invocation_attempts")]
    pub max_number_of_invocation_attempts: u32,

    /// Upper bound on the modeled execution time, in ms. Advisory: if no
    /// memory satisfies it the recommender warns and ignores it.
    #[serde(default, alias = "execution_time_threshold")]
    pub constraint_execution_time_threshold: Option<f64>,

    /// Cost-tolerance window in percent: among memories within
    /// `min_cost * (1 + P/100)`, the fastest one is recommended.
    #[serde(default, alias = "cost_tolerance_percent")]
    pub constraint_cost_tolerance_percent: Option<u8>,
}

fn default_termination_threshold() -> f64 {
    3.0
}

fn default_max_total_sample_count() -> usize {
    10
}

fn default_min_sample_per_config() -> usize {
    3
}

fn default_max_invocation_attempts() -> u32 {
    5
}

impl RunConfig {
    /// Load and validate a run configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        Self::from_value(value)
    }

    /// Build and validate a run configuration from an in-memory JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, Error> {
        let mut config: RunConfig = serde_json::from_value(value)?;
        config.normalize()?;
        config.validate()?;
        Ok(config)
    }

    /// The weighted payload mix, normalized so a bare `payload` becomes a
    /// single entry of weight 1.
    pub fn payloads(&self) -> &[WeightedPayload] {
        self.payloads.as_deref().unwrap_or_default()
    }

    fn normalize(&mut self) -> Result<(), Error> {
        match (self.payload.take(), &mut self.payloads) {
            (Some(_), Some(_)) => return Err(Error::ConflictingPayloads),
            (Some(single), None) => {
                self.payloads = Some(vec![WeightedPayload::new(single, 1.0)]);
            }
            (None, Some(list)) if list.is_empty() => return Err(Error::MissingPayload),
            (None, Some(_)) => {}
            (None, None) => return Err(Error::MissingPayload),
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        let payloads = self.payloads();
        if payloads
            .iter()
            .any(|entry| !(0.0..=1.0).contains(&entry.weight))
        {
            let sum = payloads.iter().map(|entry| entry.weight).sum();
            return Err(Error::InvalidWeights { sum });
        }
        let sum: f64 = payloads.iter().map(|entry| entry.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::InvalidWeights { sum });
        }

        if let Some([lo, hi]) = self.memory_bounds
            && (lo < 1 || lo > hi)
        {
            return Err(Error::InvalidMemoryBounds { lo, hi });
        }

        if !(self.termination_threshold > 0.0) {
            return Err(Error::InvalidField {
                field: "termination_threshold",
                requirement: "greater than 0",
            });
        }
        if self.max_total_sample_count < 1 {
            return Err(Error::InvalidField {
                field: "max_total_sample_count",
                requirement: "at least 1",
            });
        }
        if self.min_sample_per_config < 2 {
            return Err(Error::InvalidField {
                field: "min_sample_per_config",
                requirement: "at least 2",
            });
        }
        if self.dynamic_sampling_params.max_sample_per_config < self.min_sample_per_config {
            return Err(Error::InvalidField {
                field: "dynamic_sampling_params.max_sample_per_config",
                requirement: "at least min_sample_per_config",
            });
        }
        if !(self.dynamic_sampling_params.coefficient_of_variation_threshold > 0.0) {
            return Err(Error::InvalidField {
                field: "dynamic_sampling_params.coefficient_of_variation_threshold",
                requirement: "greater than 0",
            });
        }
        if self.max_number_of_invocation_attempts < 1 {
            return Err(Error::InvalidField {
                field: "max_number_of_invocation_attempts",
                requirement: "at least 1",
            });
        }
        if let Some(threshold) = self.constraint_execution_time_threshold
            && !(threshold > 0.0)
        {
            return Err(Error::InvalidField {
                field: "constraint_execution_time_threshold",
                requirement: "greater than 0",
            });
        }
        if let Some(percent) = self.constraint_cost_tolerance_percent
            && percent > 100
        {
            return Err(Error::InvalidField {
                field: "constraint_cost_tolerance_percent",
                requirement: "between 0 and 100",
            });
        }

        Ok(())
    }
}
