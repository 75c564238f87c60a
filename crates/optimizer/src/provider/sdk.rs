#![forbid(unsafe_code)]

//! Real AWS bindings for the [`ProviderClient`] trait.
//!
//! Compiled only with the `aws-sdk` feature; everything else in the crate
//! is exercised through the trait.

use crate::provider::{LastUpdateStatus, PriceRecord, ProviderClient, ProviderError, RemoteConfig};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_lambda::error::ProvideErrorMetadata;
use aws_sdk_lambda::error::SdkError;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::LogType;
use aws_sdk_pricing::types::{Filter, FilterType};
use base64::Engine;

/// The pricing API is only served from this region.
const PRICING_REGION: &str = "us-east-1";

pub struct AwsSdkClient {
    lambda: aws_sdk_lambda::Client,
    pricing: aws_sdk_pricing::Client,
}

impl AwsSdkClient {
    /// Resolve credentials from the environment and bind to `region`.
    pub async fn connect(region: &str) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        let pricing_config = aws_sdk_pricing::config::Builder::from(&shared)
            .region(Region::new(PRICING_REGION))
            .build();
        Self {
            lambda: aws_sdk_lambda::Client::new(&shared),
            pricing: aws_sdk_pricing::Client::from_conf(pricing_config),
        }
    }
}

#[async_trait]
impl ProviderClient for AwsSdkClient {
    async fn get_configuration(&self, function_name: &str) -> Result<RemoteConfig, ProviderError> {
        let output = self
            .lambda
            .get_function_configuration()
            .function_name(function_name)
            .send()
            .await
            .map_err(map_sdk_error)?;

        let last_update_status = match output.last_update_status() {
            Some(aws_sdk_lambda::types::LastUpdateStatus::Successful) => {
                LastUpdateStatus::Successful
            }
            Some(aws_sdk_lambda::types::LastUpdateStatus::Failed) => LastUpdateStatus::Failed,
            _ => LastUpdateStatus::InProgress,
        };
        let architecture = output
            .architectures()
            .first()
            .map(|arch| arch.as_str().to_string())
            .unwrap_or_else(|| "x86_64".to_string());

        Ok(RemoteConfig {
            memory_mb: output.memory_size().unwrap_or(0).max(0) as u32,
            timeout_s: output.timeout().unwrap_or(0).max(0) as u32,
            last_update_status,
            architecture,
        })
    }

    async fn update_configuration(
        &self,
        function_name: &str,
        memory_mb: u32,
        timeout_s: u32,
    ) -> Result<(), ProviderError> {
        self.lambda
            .update_function_configuration()
            .function_name(function_name)
            .memory_size(memory_mb as i32)
            .timeout(timeout_s as i32)
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(())
    }

    async fn invoke(&self, function_name: &str, payload: &str) -> Result<Vec<u8>, ProviderError> {
        let output = self
            .lambda
            .invoke()
            .function_name(function_name)
            .log_type(LogType::Tail)
            .payload(Blob::new(payload.as_bytes()))
            .send()
            .await
            .map_err(map_sdk_error)?;

        let encoded = output
            .log_result()
            .ok_or_else(|| ProviderError::Transient("invocation returned no log tail".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|err| ProviderError::Transient(format!("malformed log tail: {err}")))
    }

    async fn get_prices(
        &self,
        service: &str,
        region: &str,
    ) -> Result<Vec<PriceRecord>, ProviderError> {
        let region_filter = Filter::builder()
            .r#type(FilterType::TermMatch)
            .field("regionCode")
            .value(region)
            .build()
            .map_err(|err| ProviderError::Transient(err.to_string()))?;

        let mut records = Vec::new();
        let mut pages = self
            .pricing
            .get_products()
            .service_code(service)
            .filters(region_filter)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(map_sdk_error)?;
            for document in page.price_list() {
                if let Some(record) = parse_price_record(document) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }
}

/// One price-list JSON document to the record the calculator consumes.
/// Documents without a price group (bundled free-tier rows) are skipped.
fn parse_price_record(document: &str) -> Option<PriceRecord> {
    let value: serde_json::Value = serde_json::from_str(document).ok()?;
    let group = value["product"]["attributes"]["group"].as_str()?.to_string();

    let mut unit_usd: Option<f64> = None;
    for term in value["terms"]["OnDemand"].as_object()?.values() {
        let Some(dimensions) = term["priceDimensions"].as_object() else {
            continue;
        };
        for dimension in dimensions.values() {
            if let Some(usd) = dimension["pricePerUnit"]["USD"]
                .as_str()
                .and_then(|raw| raw.parse::<f64>().ok())
            {
                unit_usd = Some(unit_usd.map_or(usd, |best| best.max(usd)));
            }
        }
    }
    Some(PriceRecord {
        group,
        unit_usd: unit_usd?,
    })
}

fn map_sdk_error<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    if matches!(&err, SdkError::TimeoutError(_)) {
        return ProviderError::ReadTimeout;
    }
    if let SdkError::DispatchFailure(failure) = &err
        && failure.is_timeout()
    {
        return ProviderError::ReadTimeout;
    }
    match err.code() {
        Some("ResourceConflictException") => ProviderError::Conflict,
        Some("InvalidParameterValueException" | "ValidationException") => {
            ProviderError::Validation(err.message().unwrap_or("invalid parameter").to_string())
        }
        Some("ResourceNotFoundException") => {
            ProviderError::NotFound(err.message().unwrap_or("resource not found").to_string())
        }
        Some("TooManyRequestsException" | "ThrottlingException") => ProviderError::Throttled,
        _ => ProviderError::Transient(err.to_string()),
    }
}
