#![forbid(unsafe_code)]

use crate::error::Error;
use crate::exploration::Invoker;
use crate::provider::{ProviderClient, ProviderError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const BACKOFF_INITIAL: Duration = Duration::from_secs(1);

/// Invokes one Lambda function, retrying transient transport failures.
///
/// Read timeouts retry immediately (the function may still be running to
/// completion on the provider side); throttling and other transient
/// failures back off with doubling delays.
pub struct AwsInvoker {
    client: Arc<dyn ProviderClient>,
    function_name: String,
    max_attempts: u32,
}

impl AwsInvoker {
    pub fn new(client: Arc<dyn ProviderClient>, function_name: &str, max_attempts: u32) -> Self {
        Self {
            client,
            function_name: function_name.to_string(),
            max_attempts: max_attempts.max(1),
        }
    }
}

#[async_trait]
impl Invoker for AwsInvoker {
    async fn invoke(&self, payload: &str) -> Result<Vec<u8>, Error> {
        let mut backoff = BACKOFF_INITIAL;
        for attempt in 1..=self.max_attempts {
            match self.client.invoke(&self.function_name, payload).await {
                Ok(log) => {
                    debug!(attempt, "invocation returned");
                    return Ok(log);
                }
                Err(ProviderError::ReadTimeout) => {
                    warn!(attempt, "invocation read timed out, retrying");
                }
                Err(err @ (ProviderError::Validation(_) | ProviderError::NotFound(_))) => {
                    return Err(Error::Invocation {
                        message: err.to_string(),
                        duration_ms: None,
                    });
                }
                Err(err) => {
                    warn!(attempt, %err, "invocation failed, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
        Err(Error::MaxAttemptsReached {
            attempts: self.max_attempts,
            last_duration_ms: None,
        })
    }
}
