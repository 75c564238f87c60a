#![forbid(unsafe_code)]

mod config_manager;
mod cost_calculator;
mod invoker;
mod log_parser;

pub use config_manager::AwsConfigManager;
pub use cost_calculator::AwsCostCalculator;
pub use invoker::AwsInvoker;
pub use log_parser::AwsLogParser;
