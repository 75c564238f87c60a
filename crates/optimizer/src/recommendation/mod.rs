#![forbid(unsafe_code)]

mod driver;
mod recommender;

pub use driver::{Driver, PayloadReport, RunReport};
pub use recommender::{Recommendation, Recommender};
