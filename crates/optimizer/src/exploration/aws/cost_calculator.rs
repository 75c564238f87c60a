#![forbid(unsafe_code)]

use crate::domain::PricingUnits;
use crate::error::Error;
use crate::exploration::CostCalculator;
use crate::provider::{PriceRecord, ProviderClient, ProviderError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

const PRICING_SERVICE: &str = "AWSLambda";

/// Prices invocations of one Lambda function.
///
/// Unit prices are fetched from the price catalog on first use and cached
/// for the lifetime of the run; the function's architecture selects the
/// price group (x86 vs ARM rows are listed separately).
pub struct AwsCostCalculator {
    client: Arc<dyn ProviderClient>,
    function_name: String,
    region: String,
    pricing_units: OnceCell<PricingUnits>,
}

impl AwsCostCalculator {
    pub fn new(client: Arc<dyn ProviderClient>, function_name: &str, region: &str) -> Self {
        Self {
            client,
            function_name: function_name.to_string(),
            region: region.to_string(),
            pricing_units: OnceCell::new(),
        }
    }

    async fn pricing_units(&self) -> Result<&PricingUnits, Error> {
        self.pricing_units
            .get_or_try_init(|| self.fetch_pricing_units())
            .await
    }

    async fn fetch_pricing_units(&self) -> Result<PricingUnits, Error> {
        let records = self
            .client
            .get_prices(PRICING_SERVICE, &self.region)
            .await
            .map_err(pricing_error)?;

        let architecture = self
            .client
            .get_configuration(&self.function_name)
            .await
            .map_err(pricing_error)?
            .architecture;

        let (duration_group, requests_group) = if architecture == "arm64" {
            ("AWS-Lambda-Duration-ARM", "AWS-Lambda-Requests-ARM")
        } else {
            ("AWS-Lambda-Duration", "AWS-Lambda-Requests")
        };

        let units = PricingUnits {
            compute_usd_per_gb_second: group_price(&records, duration_group)?,
            request_usd: group_price(&records, requests_group)?,
        };
        debug!(?units, %architecture, "pricing units resolved");
        Ok(units)
    }
}

/// Highest unit price among the records of one price group.
fn group_price(records: &[PriceRecord], group: &str) -> Result<f64, Error> {
    records
        .iter()
        .filter(|record| record.group == group)
        .map(|record| record.unit_usd)
        .fold(None, |best: Option<f64>, price| {
            Some(best.map_or(price, |b| b.max(price)))
        })
        .ok_or_else(|| Error::Pricing(format!("no price record for group `{group}`")))
}

fn pricing_error(err: ProviderError) -> Error {
    Error::Pricing(err.to_string())
}

#[async_trait]
impl CostCalculator for AwsCostCalculator {
    async fn price(&self, memory_mb: u32, duration_ms: f64) -> Result<f64, Error> {
        let units = self.pricing_units().await?;
        Ok(units.invocation_usd(memory_mb, duration_ms))
    }
}
