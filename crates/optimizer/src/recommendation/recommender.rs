#![forbid(unsafe_code)]

use crate::domain::Constraints;
use crate::error::Error;
use crate::exploration::ConfigManager;
use crate::model::ParametricFunction;
use crate::objective::Objective;
use crate::sampling::Sampler;
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of optimizing one payload.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// Recommended memory configuration.
    pub memory_mb: u32,
    /// Modeled execution time at the recommendation, in ms.
    pub expected_duration_ms: f64,
    /// Modeled price of one invocation at the recommendation.
    pub expected_cost_usd: f64,
    /// Cumulative USD spent exploring, failed invocations included.
    pub exploration_cost_usd: f64,
    /// Fitted cost model parameters.
    pub params: Option<[f64; 3]>,
}

/// Runs the sample-fit-choose loop for one payload until the model is
/// trusted at its own optimum or the sample budget runs out.
pub struct Recommender {
    sampler: Sampler,
    objective: Objective,
    model: ParametricFunction,
    max_total_sample_count: usize,
    constraints: Constraints,
}

impl Recommender {
    pub fn new(
        sampler: Sampler,
        objective: Objective,
        max_total_sample_count: usize,
        constraints: Constraints,
    ) -> Self {
        Self {
            sampler,
            objective,
            model: ParametricFunction::new(),
            max_total_sample_count,
            constraints,
        }
    }

    pub async fn run(&mut self) -> Result<Recommendation, Error> {
        self.sampler.initialize_sample().await?;
        for memory_mb in self.sampler.sample().distinct_memories() {
            self.objective.update_knowledge(memory_mb);
        }
        self.model.fit(self.sampler.sample())?;

        loop {
            if self.sampler.sample().len() > self.max_total_sample_count {
                info!(
                    sample_len = self.sampler.sample().len(),
                    "sample budget exhausted, recommending from the current fit"
                );
                break;
            }
            let termination = self
                .objective
                .termination_value(&self.model, self.sampler.explorer().memory_space())?;
            if termination >= self.objective.threshold() {
                info!(termination, "enough knowledge at the modeled optimum");
                break;
            }

            let memory_mb = self.choose_next()?;
            debug!(memory_mb, termination, "exploring next configuration");
            self.sampler.update_sample(memory_mb).await?;
            self.objective.update_knowledge(memory_mb);
            self.model.fit(self.sampler.sample())?;
        }

        let space = self.sampler.explorer().memory_space();
        let (memory_mb, _) = self.model.minimize(space, &self.constraints)?;
        let expected_duration_ms = self.model.execution_time(memory_mb)?;
        let expected_cost_usd = self
            .sampler
            .explorer()
            .price(memory_mb, expected_duration_ms)
            .await?;
        Ok(Recommendation {
            memory_mb,
            expected_duration_ms,
            expected_cost_usd,
            exploration_cost_usd: self.sampler.explorer().cost(),
            params: self.model.params(),
        })
    }

    /// The unsampled memory minimizing the knowledge-inflated objective.
    fn choose_next(&self) -> Result<u32, Error> {
        let sample = self.sampler.sample();
        let candidates: Vec<u32> = self
            .sampler
            .explorer()
            .memory_space()
            .iter()
            .filter(|&m| !sample.contains_memory(m))
            .collect();
        if candidates.is_empty() {
            return Err(Error::NoMemoryLeft);
        }
        let values = self.objective.get_values(&self.model, &candidates)?;
        let mut best = 0;
        for (i, value) in values.iter().enumerate() {
            if *value < values[best] {
                best = i;
            }
        }
        Ok(candidates[best])
    }

    /// Modeled per-invocation cost over the current memory space, for
    /// cross-payload aggregation.
    pub fn cost_curve(&self) -> Result<Vec<(u32, f64)>, Error> {
        self.sampler
            .explorer()
            .memory_space()
            .iter()
            .map(|m| Ok((m, self.model.predict(m)?)))
            .collect()
    }

    /// Forget the sample, the knowledge and the fit, for the next payload.
    pub fn reset(&mut self) {
        self.sampler.reset();
        self.objective.reset();
        self.model.reset();
    }

    pub fn set_payload(&mut self, payload: String) {
        self.sampler.explorer_mut().set_payload(payload);
    }

    pub fn exploration_cost(&self) -> f64 {
        self.sampler.explorer().cost()
    }

    pub fn config_manager(&self) -> &dyn ConfigManager {
        self.sampler.explorer().config_manager()
    }

    pub fn contains_memory(&self, memory_mb: u32) -> bool {
        self.sampler.explorer().memory_space().contains(memory_mb)
    }
}
