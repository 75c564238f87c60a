#![forbid(unsafe_code)]

//! Memory-cost optimization for serverless functions.
//!
//! A run samples a deployed function at a handful of memory
//! configurations, fits a parametric cost surface to the observations,
//! and keeps sampling where the model is least trusted until the
//! predicted optimum is well-supported. The recommended configuration is
//! then reported (and optionally applied), and the function is restored
//! to its pre-run configuration otherwise.

pub mod domain;
mod error;
pub mod exploration;
pub mod model;
pub mod objective;
pub mod provider;
pub mod recommendation;
pub mod sampling;

pub use domain::{Constraints, FunctionConfig, MemorySpace, PricingUnits};
pub use error::Error;
pub use exploration::Explorer;
pub use model::ParametricFunction;
pub use objective::Objective;
pub use recommendation::{Driver, PayloadReport, Recommendation, Recommender, RunReport};
pub use sampling::{DataPoint, Sample, Sampler};
