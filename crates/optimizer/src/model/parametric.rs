#![forbid(unsafe_code)]

use crate::domain::{Constraints, MemorySpace};
use crate::error::Error;
use crate::model::levmar;
use crate::sampling::Sample;
use tracing::{debug, warn};

const MAX_FIT_ITERATIONS: usize = 500;
const LOWER_BOUNDS: [f64; 3] = [0.0, 0.0, 1e-6];
const UPPER_BOUNDS: [f64; 3] = [f64::INFINITY, f64::INFINITY, f64::INFINITY];

/// The cost surface `f(x) = a*x + b*x*exp(-x/c)`, fitted to observed
/// invocation costs (memory times billed duration).
///
/// The linear term captures the price growing with memory once the function
/// is no longer starved; the decaying term captures durations collapsing as
/// memory is added.
#[derive(Debug, Default, Clone)]
pub struct ParametricFunction {
    params: Option<[f64; 3]>,
}

impl ParametricFunction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refit against the whole sample. Later fits warm-start from the
    /// previous parameters.
    pub fn fit(&mut self, sample: &Sample) -> Result<(), Error> {
        let xs: Vec<f64> = sample.memories().iter().map(|&m| f64::from(m)).collect();
        let ys = sample.costs();

        let initial = match self.params {
            Some(params) => params,
            None => {
                // Seeding every parameter from the first duration keeps the
                // solver in the right order of magnitude.
                let seed = sample
                    .durations()
                    .first()
                    .map(|&d| d as f64 / 10.0)
                    .unwrap_or(1.0);
                [seed, seed, seed]
            }
        };

        let params = levmar::fit(
            &xs,
            &ys,
            initial,
            LOWER_BOUNDS,
            UPPER_BOUNDS,
            shape,
            shape_jacobian,
            MAX_FIT_ITERATIONS,
        )
        .map_err(|err| Error::Fit(err.to_string()))?;

        debug!(a = params[0], b = params[1], c = params[2], "model refitted");
        self.params = Some(params);
        Ok(())
    }

    /// Modeled cost at `memory_mb`.
    pub fn predict(&self, memory_mb: u32) -> Result<f64, Error> {
        let params = self.fitted()?;
        Ok(shape(&params, f64::from(memory_mb)))
    }

    /// Modeled execution time at `memory_mb`, in ms.
    pub fn execution_time(&self, memory_mb: u32) -> Result<f64, Error> {
        let params = self.fitted()?;
        let x = f64::from(memory_mb);
        Ok(shape(&params, x) / x)
    }

    /// The cheapest memory configuration under the given constraints, with
    /// its modeled cost.
    pub fn minimize(
        &self,
        space: &MemorySpace,
        constraints: &Constraints,
    ) -> Result<(u32, f64), Error> {
        let params = self.fitted()?;
        if space.is_empty() {
            return Err(Error::NoMemoryLeft);
        }

        let costed: Vec<(u32, f64)> = space
            .iter()
            .map(|m| (m, shape(&params, f64::from(m))))
            .collect();

        let feasible = match constraints.execution_time_threshold_ms {
            Some(threshold_ms) => match feasible_under(&costed, threshold_ms) {
                Ok(feasible) => feasible,
                Err(Error::UnfeasibleConstraint) => {
                    warn!(
                        threshold_ms,
                        "no configuration meets the execution time constraint, ignoring it"
                    );
                    costed.clone()
                }
                Err(err) => return Err(err),
            },
            None => costed,
        };

        match constraints.cost_tolerance_percent {
            Some(percent) => Ok(cheapest_fast(&feasible, percent)),
            None => Ok(cheapest(&feasible)),
        }
    }

    pub fn params(&self) -> Option<[f64; 3]> {
        self.params
    }

    /// Forget the fitted parameters, so the next fit starts from scratch.
    pub fn reset(&mut self) {
        self.params = None;
    }

    fn fitted(&self) -> Result<[f64; 3], Error> {
        self.params
            .ok_or_else(|| Error::Fit("the model has not been fitted yet".into()))
    }
}

fn shape(params: &[f64; 3], x: f64) -> f64 {
    let [a, b, c] = *params;
    if c <= 0.0 {
        return a * x;
    }
    a * x + b * x * (-x / c).exp()
}

fn shape_jacobian(params: &[f64; 3], x: f64) -> [f64; 3] {
    let [_, b, c] = *params;
    if c <= 0.0 {
        return [x, 0.0, 0.0];
    }
    let e = (-x / c).exp();
    [x, x * e, b * x * e * x / (c * c)]
}

/// Configurations whose modeled execution time stays under `threshold_ms`.
fn feasible_under(costed: &[(u32, f64)], threshold_ms: f64) -> Result<Vec<(u32, f64)>, Error> {
    let feasible: Vec<(u32, f64)> = costed
        .iter()
        .copied()
        .filter(|&(m, cost)| cost / f64::from(m) <= threshold_ms)
        .collect();
    if feasible.is_empty() {
        return Err(Error::UnfeasibleConstraint);
    }
    Ok(feasible)
}

/// Lowest-cost configuration; ties resolve to the smallest memory.
fn cheapest(costed: &[(u32, f64)]) -> (u32, f64) {
    costed
        .iter()
        .copied()
        .fold(costed[0], |best, candidate| {
            if candidate.1 < best.1 { candidate } else { best }
        })
}

/// Within `percent` of the minimum cost, the configuration with the lowest
/// modeled execution time; ties resolve to the smallest memory.
fn cheapest_fast(costed: &[(u32, f64)], percent: u8) -> (u32, f64) {
    let minimum = cheapest(costed).1;
    let window = minimum * (1.0 + f64::from(percent) / 100.0);
    let mut best: Option<(u32, f64)> = None;
    let mut best_time = f64::INFINITY;
    for &(m, cost) in costed {
        if cost > window {
            continue;
        }
        let time = cost / f64::from(m);
        if time < best_time {
            best = Some((m, cost));
            best_time = time;
        }
    }
    // The window always contains the minimum itself.
    best.unwrap_or_else(|| cheapest(costed))
}
