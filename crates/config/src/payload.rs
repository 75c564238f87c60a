use serde::{Deserialize, Serialize};

/// One invocation payload together with its share of the invocation mix.
///
/// Weights across all payloads of a run must sum to 1; a run configured with
/// a single `payload` is normalized to one entry of weight 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPayload {
    pub payload: serde_json::Value,
    pub weight: f64,
}

impl WeightedPayload {
    pub fn new(payload: serde_json::Value, weight: f64) -> Self {
        Self { payload, weight }
    }

    /// The payload serialized exactly as it is sent to the provider.
    pub fn body(&self) -> String {
        self.payload.to_string()
    }
}
