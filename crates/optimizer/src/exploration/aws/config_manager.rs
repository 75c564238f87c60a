#![forbid(unsafe_code)]

use crate::domain::FunctionConfig;
use crate::error::Error;
use crate::exploration::ConfigManager;
use crate::provider::{LastUpdateStatus, ProviderClient, ProviderError, RemoteConfig};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout applied during exploration so slow configurations are observed
/// rather than cut short.
const EXPLORATION_TIMEOUT_S: u32 = 900;

const UPDATE_ATTEMPTS: u32 = 5;
const POLL_ATTEMPTS: u32 = 60;
const BACKOFF_INITIAL: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Updates one Lambda function's memory, snapshotting the pre-run
/// configuration on the first mutation so it can be restored at teardown.
pub struct AwsConfigManager {
    client: Arc<dyn ProviderClient>,
    function_name: String,
    snapshot: Mutex<Option<FunctionConfig>>,
}

impl AwsConfigManager {
    pub fn new(client: Arc<dyn ProviderClient>, function_name: &str) -> Self {
        Self {
            client,
            function_name: function_name.to_string(),
            snapshot: Mutex::new(None),
        }
    }

    async fn get_configuration(&self) -> Result<RemoteConfig, Error> {
        self.client
            .get_configuration(&self.function_name)
            .await
            .map_err(config_error)
    }

    /// Push an update, retrying conflicts with doubling backoff, then wait
    /// for the provider to report it as applied.
    async fn apply(&self, memory_mb: u32, timeout_s: u32) -> Result<(), Error> {
        let mut backoff = BACKOFF_INITIAL;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self
                .client
                .update_configuration(&self.function_name, memory_mb, timeout_s)
                .await
            {
                Ok(()) => break,
                Err(ProviderError::Conflict) if attempts < UPDATE_ATTEMPTS => {
                    debug!(attempts, "configuration update conflicted, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(ProviderError::Conflict) => {
                    return Err(Error::ConfigConflict { attempts });
                }
                Err(ProviderError::Validation(message)) => {
                    return Err(Error::ConfigValidation(message));
                }
                Err(other) => return Err(config_error(other)),
            }
        }
        self.wait_applied(memory_mb).await
    }

    async fn wait_applied(&self, memory_mb: u32) -> Result<(), Error> {
        for _ in 0..POLL_ATTEMPTS {
            let remote = self.get_configuration().await?;
            match remote.last_update_status {
                LastUpdateStatus::Successful if remote.memory_mb == memory_mb => return Ok(()),
                LastUpdateStatus::Failed => {
                    return Err(Error::Config("configuration update failed".into()));
                }
                _ => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
        Err(Error::Config(format!(
            "update to {memory_mb} MB was not observed as applied"
        )))
    }
}

#[async_trait]
impl ConfigManager for AwsConfigManager {
    async fn set_config(&self, memory_mb: u32, timeout_s: Option<u32>) -> Result<(), Error> {
        let remote = self.get_configuration().await?;
        {
            let mut snapshot = self.snapshot.lock().map_err(poisoned)?;
            if snapshot.is_none() {
                *snapshot = Some(FunctionConfig {
                    memory_mb: remote.memory_mb,
                    timeout_s: remote.timeout_s,
                });
            }
        }

        let timeout_s = timeout_s.unwrap_or(EXPLORATION_TIMEOUT_S);
        if remote.memory_mb == memory_mb && remote.timeout_s == timeout_s {
            return Ok(());
        }
        debug!(memory_mb, timeout_s, "updating function configuration");
        self.apply(memory_mb, timeout_s).await
    }

    async fn reset_config(&self) -> Result<(), Error> {
        let initial = self.snapshot.lock().map_err(poisoned)?.take();
        let Some(initial) = initial else {
            return Ok(());
        };
        warn!(
            memory_mb = initial.memory_mb,
            timeout_s = initial.timeout_s,
            "restoring pre-run configuration"
        );
        self.apply(initial.memory_mb, initial.timeout_s).await
    }

    fn initial_config(&self) -> Option<FunctionConfig> {
        self.snapshot.lock().ok().and_then(|guard| *guard)
    }
}

fn config_error(err: ProviderError) -> Error {
    Error::Config(err.to_string())
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> Error {
    Error::Config("configuration snapshot lock poisoned".into())
}
