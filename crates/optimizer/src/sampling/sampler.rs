#![forbid(unsafe_code)]

use crate::error::Error;
use crate::exploration::Explorer;
use crate::sampling::{DataPoint, Sample};
use config::DynamicSamplingParams;
use tracing::{debug, info, warn};

/// How far the floor is raised past an out-of-memory configuration before
/// retrying.
const OUT_OF_MEMORY_STEP_MB: u32 = 128;

/// Minimum configurations an exploration needs to fit a three-parameter
/// model.
const MIN_SPACE_LEN: usize = 3;

/// Collects invocation samples across the memory space.
///
/// The initial sample probes the floor, a third of the way up, and the
/// ceiling. Each sampled configuration is re-invoked until the durations'
/// coefficient of variation settles under the configured threshold, within
/// a bounded budget of extra invocations.
pub struct Sampler {
    explorer: Explorer,
    sample: Sample,
    min_sample_per_config: usize,
    dynamic: DynamicSamplingParams,
}

impl Sampler {
    pub fn new(
        explorer: Explorer,
        min_sample_per_config: usize,
        dynamic: DynamicSamplingParams,
    ) -> Self {
        Self {
            explorer,
            sample: Sample::new(),
            min_sample_per_config,
            dynamic,
        }
    }

    /// Probe the floor (raising it past out-of-memory configurations), a
    /// third of the space, and the ceiling.
    pub async fn initialize_sample(&mut self) -> Result<(), Error> {
        loop {
            if self.explorer.memory_space().len() < MIN_SPACE_LEN {
                return Err(Error::NoMemoryLeft);
            }
            let floor = self
                .explorer
                .memory_space()
                .first()
                .ok_or(Error::NoMemoryLeft)?;
            match self.update_sample(floor).await {
                Ok(()) => break,
                Err(Error::FunctionOutOfMemory { .. }) => {
                    let raised = floor + OUT_OF_MEMORY_STEP_MB;
                    warn!(floor, raised, "function ran out of memory, raising the floor");
                    self.explorer.memory_space_mut().raise_floor(raised);
                }
                Err(err) => return Err(err),
            }
        }

        let space = self.explorer.memory_space();
        let third = space
            .get(space.len().div_ceil(3))
            .ok_or(Error::NoMemoryLeft)?;
        let ceiling = space.last().ok_or(Error::NoMemoryLeft)?;
        self.update_sample(third).await?;
        self.update_sample(ceiling).await?;
        info!(sample_len = self.sample.len(), "initial sample collected");
        Ok(())
    }

    /// Sample one memory configuration: a parallel batch first, then serial
    /// re-invocations while the durations are still too noisy.
    pub async fn update_sample(&mut self, memory_mb: u32) -> Result<(), Error> {
        let batch = self.min_sample_per_config;
        let durations = self
            .explorer
            .explore_parallel(batch, batch, Some(memory_mb))
            .await?;
        let durations = self.explore_dynamically(durations).await?;

        debug!(memory_mb, ?durations, "sampled configuration");
        for duration_ms in durations {
            self.sample.insert(DataPoint {
                memory_mb,
                duration_ms,
            });
        }
        Ok(())
    }

    /// While the coefficient of variation is above the threshold, invoke
    /// again and either substitute the new duration for an outlier (when
    /// that lowers the CV) or append it.
    async fn explore_dynamically(&mut self, mut durations: Vec<u64>) -> Result<Vec<u64>, Error> {
        let max = self.dynamic.max_sample_per_config;
        let threshold = self.dynamic.coefficient_of_variation_threshold;

        let mut variation = coefficient_of_variation(&durations);
        let mut extra = 0;
        while durations.len() < max && variation > threshold && extra < max {
            let duration = self.explorer.explore(None, true).await?;
            extra += 1;

            let mut best: Option<(usize, f64)> = None;
            for i in 0..durations.len() {
                let previous = durations[i];
                durations[i] = duration;
                let candidate = coefficient_of_variation(&durations);
                durations[i] = previous;
                if candidate < variation && best.is_none_or(|(_, b)| candidate < b) {
                    best = Some((i, candidate));
                }
            }
            match best {
                Some((i, lowered)) => {
                    durations[i] = duration;
                    variation = lowered;
                }
                None => {
                    durations.push(duration);
                    variation = coefficient_of_variation(&durations);
                }
            }
        }
        Ok(durations)
    }

    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    /// Drop the collected sample, for the next payload's run.
    pub fn reset(&mut self) {
        self.sample.clear();
    }

    pub fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    pub fn explorer_mut(&mut self) -> &mut Explorer {
        &mut self.explorer
    }
}

/// Sample coefficient of variation (stddev with one delta degree of
/// freedom, over the mean).
fn coefficient_of_variation(durations: &[u64]) -> f64 {
    if durations.len() < 2 {
        return 0.0;
    }
    let n = durations.len() as f64;
    let mean = durations.iter().map(|&d| d as f64).sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = durations
        .iter()
        .map(|&d| (d as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    variance.sqrt() / mean
}
