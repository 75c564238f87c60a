use async_trait::async_trait;
use optimizer::provider::{
    LastUpdateStatus, PriceRecord, ProviderClient, ProviderError, RemoteConfig,
};
use std::sync::Mutex;

/// Billed duration in ms for one invocation, from the configured memory,
/// the payload body and a 1-based invocation counter.
pub type Surface = Box<dyn Fn(u32, &str, u32) -> f64 + Send + Sync>;

/// In-memory Lambda double: one function, a scripted failure budget and a
/// duration surface.
pub struct StubLambda {
    surface: Surface,
    oom_below_mb: Option<u32>,
    prices: Vec<PriceRecord>,
    state: Mutex<StubState>,
}

struct StubState {
    memory_mb: u32,
    timeout_s: u32,
    invocations: u32,
    conflicts_left: u32,
    throttles_left: u32,
    read_timeouts_left: u32,
}

impl StubLambda {
    pub fn new(
        initial_memory_mb: u32,
        surface: impl Fn(u32, &str, u32) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            surface: Box::new(surface),
            oom_below_mb: None,
            prices: standard_prices(),
            state: Mutex::new(StubState {
                memory_mb: initial_memory_mb,
                timeout_s: 60,
                invocations: 0,
                conflicts_left: 0,
                throttles_left: 0,
                read_timeouts_left: 0,
            }),
        }
    }

    /// Invocations below this memory fail with an out-of-memory report.
    pub fn oom_below(mut self, memory_mb: u32) -> Self {
        self.oom_below_mb = Some(memory_mb);
        self
    }

    /// The next `n` configuration updates conflict.
    pub fn conflicts(self, n: u32) -> Self {
        self.state.lock().unwrap().conflicts_left = n;
        self
    }

    /// The next `n` invocations are throttled.
    pub fn throttles(self, n: u32) -> Self {
        self.state.lock().unwrap().throttles_left = n;
        self
    }

    /// The next `n` invocations time out at the transport.
    pub fn read_timeouts(self, n: u32) -> Self {
        self.state.lock().unwrap().read_timeouts_left = n;
        self
    }

    pub fn memory_mb(&self) -> u32 {
        self.state.lock().unwrap().memory_mb
    }

    pub fn timeout_s(&self) -> u32 {
        self.state.lock().unwrap().timeout_s
    }

    pub fn invocations(&self) -> u32 {
        self.state.lock().unwrap().invocations
    }
}

#[async_trait]
impl ProviderClient for StubLambda {
    async fn get_configuration(&self, _function_name: &str) -> Result<RemoteConfig, ProviderError> {
        let state = self.state.lock().unwrap();
        Ok(RemoteConfig {
            memory_mb: state.memory_mb,
            timeout_s: state.timeout_s,
            last_update_status: LastUpdateStatus::Successful,
            architecture: "x86_64".to_string(),
        })
    }

    async fn update_configuration(
        &self,
        _function_name: &str,
        memory_mb: u32,
        timeout_s: u32,
    ) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        if state.conflicts_left > 0 {
            state.conflicts_left -= 1;
            return Err(ProviderError::Conflict);
        }
        state.memory_mb = memory_mb;
        state.timeout_s = timeout_s;
        Ok(())
    }

    async fn invoke(&self, _function_name: &str, payload: &str) -> Result<Vec<u8>, ProviderError> {
        let (memory_mb, index) = {
            let mut state = self.state.lock().unwrap();
            if state.read_timeouts_left > 0 {
                state.read_timeouts_left -= 1;
                return Err(ProviderError::ReadTimeout);
            }
            if state.throttles_left > 0 {
                state.throttles_left -= 1;
                return Err(ProviderError::Throttled);
            }
            state.invocations += 1;
            (state.memory_mb, state.invocations)
        };

        if self.oom_below_mb.is_some_and(|floor| memory_mb < floor) {
            return Ok(report_log(memory_mb, 100.0, memory_mb).into_bytes());
        }
        let duration = (self.surface)(memory_mb, payload, index);
        Ok(report_log(memory_mb, duration, memory_mb / 2).into_bytes())
    }

    async fn get_prices(
        &self,
        _service: &str,
        _region: &str,
    ) -> Result<Vec<PriceRecord>, ProviderError> {
        Ok(self.prices.clone())
    }
}

fn report_log(memory_mb: u32, duration_ms: f64, used_mb: u32) -> String {
    format!(
        "START RequestId: stub Version: $LATEST\n\
         END RequestId: stub\n\
         REPORT RequestId: stub\tDuration: {duration_ms} ms\t\
         Billed Duration: {billed} ms\tMemory Size: {memory_mb} MB\t\
         Max Memory Used: {used_mb} MB\t\n",
        billed = duration_ms.ceil() as u64,
    )
}

fn standard_prices() -> Vec<PriceRecord> {
    vec![
        PriceRecord {
            group: "AWS-Lambda-Duration".to_string(),
            unit_usd: 0.0000166667,
        },
        PriceRecord {
            group: "AWS-Lambda-Requests".to_string(),
            unit_usd: 0.0000002,
        },
    ]
}
