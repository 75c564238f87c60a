#![forbid(unsafe_code)]

mod sample;
mod sampler;

pub use sample::{DataPoint, Sample};
pub use sampler::Sampler;
