use serde::{Deserialize, Serialize};

/// Cloud vendor whose bindings drive the exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vendor {
    #[serde(rename = "AWS", alias = "aws")]
    Aws,
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vendor::Aws => write!(f, "AWS"),
        }
    }
}
