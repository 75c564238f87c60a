#![forbid(unsafe_code)]

/// Error taxonomy of a run.
///
/// Transient provider failures (throttling, read timeouts, configuration
/// conflicts) are retried inside the components that see them and only
/// surface here once their retry budget is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The function exceeded its configured timeout.
    #[error("function invocation timed out")]
    FunctionTimeout { duration_ms: Option<u64> },

    /// The function was killed for memory, or reported using all of it.
    #[error("function ran out of memory")]
    FunctionOutOfMemory { duration_ms: Option<u64> },

    /// The invocation response log is missing required fields.
    #[error("could not parse invocation log: {0}")]
    LogUnparseable(String),

    /// The invocation itself failed (bad payload, missing function, or an
    /// application-level error reported in the log).
    #[error("invocation failed: {message}")]
    Invocation {
        message: String,
        duration_ms: Option<u64>,
    },

    /// The invocation retry budget is exhausted.
    #[error("invocation failed after {attempts} attempts")]
    MaxAttemptsReached {
        attempts: u32,
        last_duration_ms: Option<u64>,
    },

    /// Concurrent configuration updates kept conflicting past the retry
    /// budget.
    #[error("configuration update conflicted {attempts} times")]
    ConfigConflict { attempts: u32 },

    /// The provider rejected the requested configuration.
    #[error("configuration rejected: {0}")]
    ConfigValidation(String),

    /// Reading or updating the function configuration failed.
    #[error("configuration operation failed: {0}")]
    Config(String),

    /// Unit prices could not be fetched or recognized.
    #[error("pricing lookup failed: {0}")]
    Pricing(String),

    /// Non-linear least squares did not converge.
    #[error("cost model fit failed: {0}")]
    Fit(String),

    /// The execution-time constraint excludes every memory configuration.
    #[error("no memory configuration satisfies the execution time constraint")]
    UnfeasibleConstraint,

    /// The memory space has no configuration left to explore.
    #[error("no memory configuration left to explore")]
    NoMemoryLeft,
}

impl Error {
    /// Billed duration reported alongside a failed invocation, when the
    /// response log carried one. Used to price failed invocations.
    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            Error::FunctionTimeout { duration_ms }
            | Error::FunctionOutOfMemory { duration_ms }
            | Error::Invocation { duration_ms, .. }
            | Error::MaxAttemptsReached {
                last_duration_ms: duration_ms,
                ..
            } => *duration_ms,
            _ => None,
        }
    }
}
