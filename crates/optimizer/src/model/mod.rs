#![forbid(unsafe_code)]

mod levmar;
mod parametric;

pub use parametric::ParametricFunction;
