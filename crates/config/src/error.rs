#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provide either `payload` or `payloads`, not both")]
    ConflictingPayloads,

    #[error("A `payload` or a non-empty `payloads` list is required")]
    MissingPayload,

    #[error("Payload weights must lie in [0, 1] and sum to 1 (sum = {sum})")]
    InvalidWeights { sum: f64 },

    #[error("Invalid memory bounds [{lo}, {hi}]: lower bound must be >= 1 and <= upper bound")]
    InvalidMemoryBounds { lo: u32, hi: u32 },

    #[error("`{field}` must be {requirement}")]
    InvalidField {
        field: &'static str,
        requirement: &'static str,
    },
}
