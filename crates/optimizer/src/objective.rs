#![forbid(unsafe_code)]

use crate::domain::MemorySpace;
use crate::error::Error;
use crate::model::ParametricFunction;
use std::collections::BTreeMap;

/// Width of the Gaussian kernel spread around each sampled memory, in MB.
const KNOWLEDGE_SIGMA_MB: f64 = 200.0;

/// Exploration objective: the modeled cost surface inflated by how much is
/// already known around each memory value.
///
/// Sampling a memory deposits a Gaussian bump of knowledge around it, which
/// pushes the next sample away from regions already explored. Once the
/// accumulated knowledge at the modeled optimum crosses the termination
/// threshold, exploring further is not worth its price.
#[derive(Debug)]
pub struct Objective {
    knowledge: BTreeMap<u32, f64>,
    termination_threshold: f64,
}

impl Objective {
    pub fn new(space: &MemorySpace, termination_threshold: f64) -> Self {
        Self {
            knowledge: space.iter().map(|m| (m, 0.0)).collect(),
            termination_threshold,
        }
    }

    /// Objective values `(1 + knowledge(m)) * f(m) * m` for `memories`.
    pub fn get_values(
        &self,
        model: &ParametricFunction,
        memories: &[u32],
    ) -> Result<Vec<f64>, Error> {
        memories
            .iter()
            .map(|&m| {
                let cost = model.predict(m)?;
                Ok((1.0 + self.knowledge_at(m)) * cost * f64::from(m))
            })
            .collect()
    }

    /// Deposit a knowledge bump centered on the memory just sampled.
    pub fn update_knowledge(&mut self, center_mb: u32) {
        let center = f64::from(center_mb);
        for (&m, knowledge) in self.knowledge.iter_mut() {
            let distance = f64::from(m) - center;
            *knowledge +=
                (-distance * distance / (2.0 * KNOWLEDGE_SIGMA_MB * KNOWLEDGE_SIGMA_MB)).exp();
        }
    }

    /// `1 + knowledge` at the memory minimizing the modeled cost-weighted
    /// surface `f(m) * m`.
    pub fn termination_value(
        &self,
        model: &ParametricFunction,
        space: &MemorySpace,
    ) -> Result<f64, Error> {
        let mut best: Option<(u32, f64)> = None;
        for m in space.iter() {
            let value = model.predict(m)? * f64::from(m);
            match best {
                Some((_, best_value)) if value >= best_value => {}
                _ => best = Some((m, value)),
            }
        }
        let (argmin, _) = best.ok_or(Error::NoMemoryLeft)?;
        Ok(1.0 + self.knowledge_at(argmin))
    }

    pub fn threshold(&self) -> f64 {
        self.termination_threshold
    }

    /// Forget everything learned, for the next payload's run.
    pub fn reset(&mut self) {
        for knowledge in self.knowledge.values_mut() {
            *knowledge = 0.0;
        }
    }

    fn knowledge_at(&self, memory_mb: u32) -> f64 {
        self.knowledge.get(&memory_mb).copied().unwrap_or(0.0)
    }
}
