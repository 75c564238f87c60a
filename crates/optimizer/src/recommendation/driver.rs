#![forbid(unsafe_code)]

use crate::domain::{Constraints, MemorySpace};
use crate::error::Error;
use crate::exploration::aws::{AwsConfigManager, AwsCostCalculator, AwsInvoker, AwsLogParser};
use crate::exploration::Explorer;
use crate::objective::Objective;
use crate::provider::ProviderClient;
use crate::recommendation::{Recommendation, Recommender};
use crate::sampling::Sampler;
use config::{RunConfig, WeightedPayload};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one payload's optimization within a run.
#[derive(Debug, Clone, Serialize)]
pub struct PayloadReport {
    pub payload_index: usize,
    pub weight: f64,
    #[serde(flatten)]
    pub recommendation: Recommendation,
}

/// Outcome of a whole run: one recommendation per payload plus the
/// weight-aggregated recommendation across the mix.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub function_name: String,
    pub per_payload: Vec<PayloadReport>,
    /// Memory minimizing the weighted sum of the payloads' modeled costs.
    pub memory_mb: u32,
    /// Total USD spent exploring, across all payloads.
    pub exploration_cost_usd: f64,
}

/// Runs the recommender over every payload of the mix and restores (or
/// applies) the function configuration when done.
pub struct Driver {
    recommender: Recommender,
    function_name: String,
    payloads: Vec<WeightedPayload>,
    apply: bool,
}

impl Driver {
    /// Wire the AWS exploration components around `client`.
    pub fn new(client: Arc<dyn ProviderClient>, run_config: &RunConfig, apply: bool) -> Self {
        let explorer = Explorer::new(
            Box::new(AwsConfigManager::new(
                Arc::clone(&client),
                &run_config.function_name,
            )),
            Box::new(AwsInvoker::new(
                Arc::clone(&client),
                &run_config.function_name,
                run_config.max_number_of_invocation_attempts,
            )),
            Box::new(AwsLogParser),
            Box::new(AwsCostCalculator::new(
                client,
                &run_config.function_name,
                &run_config.region,
            )),
            MemorySpace::aws_default(run_config.memory_bounds),
        );
        let sampler = Sampler::new(
            explorer,
            run_config.min_sample_per_config,
            run_config.dynamic_sampling_params.clone(),
        );
        let objective = Objective::new(
            &MemorySpace::aws_default(run_config.memory_bounds),
            run_config.termination_threshold,
        );
        let recommender = Recommender::new(
            sampler,
            objective,
            run_config.max_total_sample_count,
            Constraints {
                execution_time_threshold_ms: run_config.constraint_execution_time_threshold,
                cost_tolerance_percent: run_config.constraint_cost_tolerance_percent,
            },
        );
        Self {
            recommender,
            function_name: run_config.function_name.clone(),
            payloads: run_config.payloads().to_vec(),
            apply,
        }
    }

    /// Optimize every payload, then restore the pre-run configuration, or
    /// apply the aggregated recommendation when asked to.
    ///
    /// Teardown runs exactly once on every exit path. A teardown failure
    /// never masks the primary error; it only surfaces when the run itself
    /// succeeded.
    pub async fn run(&mut self) -> Result<RunReport, Error> {
        let outcome = self.run_inner().await;
        let teardown = self
            .teardown(outcome.as_ref().ok().map(|report| report.memory_mb))
            .await;
        match (outcome, teardown) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(teardown_err)) => Err(teardown_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(teardown_err)) => {
                warn!(%teardown_err, "teardown failed after a failed run");
                Err(err)
            }
        }
    }

    async fn run_inner(&mut self) -> Result<RunReport, Error> {
        let mut per_payload = Vec::with_capacity(self.payloads.len());
        let mut collective: BTreeMap<u32, f64> = BTreeMap::new();

        for (payload_index, entry) in self.payloads.iter().enumerate() {
            info!(payload_index, weight = entry.weight, "optimizing payload");
            self.recommender.set_payload(entry.body());
            let recommendation = self.recommender.run().await?;
            for (memory_mb, cost) in self.recommender.cost_curve()? {
                *collective.entry(memory_mb).or_insert(0.0) += entry.weight * cost;
            }
            per_payload.push(PayloadReport {
                payload_index,
                weight: entry.weight,
                recommendation,
            });
            self.recommender.reset();
        }

        // The floor may have been raised mid-run; only still-valid
        // memories are eligible for the aggregated pick.
        let memory_mb = collective
            .iter()
            .filter(|&(&m, _)| self.recommender.contains_memory(m))
            .fold(None::<(u32, f64)>, |best, (&m, &cost)| match best {
                Some((_, best_cost)) if best_cost <= cost => best,
                _ => Some((m, cost)),
            })
            .map(|(m, _)| m)
            .ok_or(Error::NoMemoryLeft)?;

        info!(memory_mb, "aggregated recommendation");
        Ok(RunReport {
            function_name: self.function_name.clone(),
            per_payload,
            memory_mb,
            exploration_cost_usd: self.recommender.exploration_cost(),
        })
    }

    async fn teardown(&self, recommended_mb: Option<u32>) -> Result<(), Error> {
        let manager = self.recommender.config_manager();
        match (self.apply, recommended_mb, manager.initial_config()) {
            (true, Some(memory_mb), Some(initial)) => {
                info!(memory_mb, "applying the recommended configuration");
                manager.set_config(memory_mb, Some(initial.timeout_s)).await
            }
            _ => manager.reset_config().await,
        }
    }
}
