#![forbid(unsafe_code)]

#[cfg(feature = "aws-sdk")]
pub mod sdk;

use async_trait::async_trait;

/// Terminal state of the most recent configuration update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastUpdateStatus {
    InProgress,
    Successful,
    Failed,
}

/// The function configuration as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub memory_mb: u32,
    pub timeout_s: u32,
    pub last_update_status: LastUpdateStatus,
    pub architecture: String,
}

/// One entry of the provider's price catalog, already filtered to the
/// queried service and region.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    /// Price group the record belongs to (duration vs. requests, possibly
    /// split by architecture).
    pub group: String,
    /// USD unit price. Where the catalog tiers prices, the highest tier.
    pub unit_usd: f64,
}

/// Transport-level failure kinds the retrying components discriminate on.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("a concurrent configuration update is in progress")]
    Conflict,

    #[error("request validation failed: {0}")]
    Validation(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("transport read timed out")]
    ReadTimeout,

    #[error("request was throttled")]
    Throttled,

    #[error("transient provider failure: {0}")]
    Transient(String),
}

/// The narrow provider surface the explorer consumes.
///
/// One implementation per vendor; tests drive the whole pipeline through an
/// in-memory implementation.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn get_configuration(&self, function_name: &str) -> Result<RemoteConfig, ProviderError>;

    async fn update_configuration(
        &self,
        function_name: &str,
        memory_mb: u32,
        timeout_s: u32,
    ) -> Result<(), ProviderError>;

    /// Invoke the function and return the raw response log.
    async fn invoke(&self, function_name: &str, payload: &str) -> Result<Vec<u8>, ProviderError>;

    /// Price records for `service` in `region`.
    async fn get_prices(
        &self,
        service: &str,
        region: &str,
    ) -> Result<Vec<PriceRecord>, ProviderError>;
}
