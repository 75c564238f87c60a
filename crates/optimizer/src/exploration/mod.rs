#![forbid(unsafe_code)]

pub mod aws;
mod explorer;

pub use explorer::Explorer;

use crate::domain::FunctionConfig;
use crate::error::Error;
use async_trait::async_trait;

/// Decode one raw invocation response into a billed duration in ms.
///
/// Typed failures (timeout, out-of-memory, runtime error) carry the billed
/// duration when the log reports one, so failed invocations can still be
/// priced.
pub trait LogParser: Send + Sync {
    fn parse(&self, log: &[u8]) -> Result<u64, Error>;
}

/// Price invocations from memory and billed duration.
#[async_trait]
pub trait CostCalculator: Send + Sync {
    /// Price of a single invocation in USD.
    async fn price(&self, memory_mb: u32, duration_ms: f64) -> Result<f64, Error>;

    /// Total price of a batch of invocations at one memory value.
    async fn price_many(&self, memory_mb: u32, durations_ms: &[f64]) -> Result<f64, Error> {
        let mut total = 0.0;
        for &duration in durations_ms {
            total += self.price(memory_mb, duration).await?;
        }
        Ok(total)
    }
}

/// Read and update the remote function's memory and timeout.
#[async_trait]
pub trait ConfigManager: Send + Sync {
    /// Set the function's memory (and a generous timeout when none is
    /// given), waiting until the update is observed as terminal-success.
    async fn set_config(&self, memory_mb: u32, timeout_s: Option<u32>) -> Result<(), Error>;

    /// Restore the configuration captured before the first `set_config`.
    /// A second call is a no-op.
    async fn reset_config(&self) -> Result<(), Error>;

    /// The pre-run snapshot, once one exists.
    fn initial_config(&self) -> Option<FunctionConfig>;
}

/// Execute one invocation with bounded retries and backoff.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Invoke with `payload` and return the raw response log.
    async fn invoke(&self, payload: &str) -> Result<Vec<u8>, Error>;
}
