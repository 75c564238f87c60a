#![forbid(unsafe_code)]

use crate::domain::MemorySpace;
use crate::error::Error;
use crate::exploration::{ConfigManager, CostCalculator, Invoker, LogParser};
use futures::StreamExt;
use tracing::{debug, instrument};

/// Runs invocations against the remote function and accounts what the
/// exploration itself costs.
///
/// Failed invocations whose log reports a billed duration are still priced
/// before the failure propagates.
pub struct Explorer {
    config_manager: Box<dyn ConfigManager>,
    invoker: Box<dyn Invoker>,
    log_parser: Box<dyn LogParser>,
    cost_calculator: Box<dyn CostCalculator>,
    memory_space: MemorySpace,
    payload: String,
    current_memory_mb: Option<u32>,
    cost: f64,
}

impl Explorer {
    pub fn new(
        config_manager: Box<dyn ConfigManager>,
        invoker: Box<dyn Invoker>,
        log_parser: Box<dyn LogParser>,
        cost_calculator: Box<dyn CostCalculator>,
        memory_space: MemorySpace,
    ) -> Self {
        Self {
            config_manager,
            invoker,
            log_parser,
            cost_calculator,
            memory_space,
            payload: String::new(),
            current_memory_mb: None,
            cost: 0.0,
        }
    }

    /// One invocation, at `memory_mb` or at the current configuration.
    #[instrument(skip(self), fields(payload_len = self.payload.len()))]
    pub async fn explore(
        &mut self,
        memory_mb: Option<u32>,
        compute_cost: bool,
    ) -> Result<u64, Error> {
        let memory_mb = self.configure(memory_mb).await?;

        let outcome = match self.invoker.invoke(&self.payload).await {
            Ok(log) => self.log_parser.parse(&log),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(duration_ms) => {
                if compute_cost {
                    self.charge(memory_mb, &[duration_ms as f64]).await?;
                }
                debug!(memory_mb, duration_ms, "exploration step");
                Ok(duration_ms)
            }
            Err(err) => {
                if compute_cost {
                    if let Some(duration_ms) = err.duration_ms() {
                        self.charge(memory_mb, &[duration_ms as f64]).await?;
                    }
                }
                Err(err)
            }
        }
    }

    /// `count` invocations at one memory value, `concurrency` in flight.
    ///
    /// All billed durations are priced, including those of failed
    /// invocations; the first failure is then returned.
    pub async fn explore_parallel(
        &mut self,
        count: usize,
        concurrency: usize,
        memory_mb: Option<u32>,
    ) -> Result<Vec<u64>, Error> {
        let memory_mb = self.configure(memory_mb).await?;

        let invoker = &*self.invoker;
        let log_parser = &*self.log_parser;
        let payload = self.payload.as_str();
        let outcomes: Vec<Result<u64, Error>> = futures::stream::iter(0..count)
            .map(|_| async move {
                let log = invoker.invoke(payload).await?;
                log_parser.parse(&log)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut durations = Vec::with_capacity(count);
        let mut billed = Vec::with_capacity(count);
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(duration_ms) => {
                    billed.push(duration_ms as f64);
                    durations.push(duration_ms);
                }
                Err(err) => {
                    if let Some(duration_ms) = err.duration_ms() {
                        billed.push(duration_ms as f64);
                    }
                    first_error.get_or_insert(err);
                }
            }
        }
        self.charge(memory_mb, &billed).await?;

        match first_error {
            Some(err) => Err(err),
            None => {
                debug!(memory_mb, count, "parallel exploration step");
                Ok(durations)
            }
        }
    }

    async fn configure(&mut self, memory_mb: Option<u32>) -> Result<u32, Error> {
        if let Some(memory_mb) = memory_mb {
            if self.current_memory_mb != Some(memory_mb) {
                self.config_manager.set_config(memory_mb, None).await?;
                self.current_memory_mb = Some(memory_mb);
            }
        }
        self.current_memory_mb
            .ok_or_else(|| Error::Config("no memory configuration selected yet".into()))
    }

    async fn charge(&mut self, memory_mb: u32, durations_ms: &[f64]) -> Result<(), Error> {
        if durations_ms.is_empty() {
            return Ok(());
        }
        self.cost += self
            .cost_calculator
            .price_many(memory_mb, durations_ms)
            .await?;
        Ok(())
    }

    /// Price one hypothetical invocation without charging it to the run.
    pub async fn price(&self, memory_mb: u32, duration_ms: f64) -> Result<f64, Error> {
        self.cost_calculator.price(memory_mb, duration_ms).await
    }

    /// Total USD spent on exploration so far, failed invocations included.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn memory_space(&self) -> &MemorySpace {
        &self.memory_space
    }

    pub fn memory_space_mut(&mut self) -> &mut MemorySpace {
        &mut self.memory_space
    }

    pub fn set_payload(&mut self, payload: String) {
        self.payload = payload;
    }

    pub fn config_manager(&self) -> &dyn ConfigManager {
        &*self.config_manager
    }
}
