use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::path::{Path, PathBuf};

/// memtune: memory-cost optimizer for serverless functions
///
/// memtune invokes a deployed function across its memory space, fits a
/// cost model to the observed durations, and recommends the memory
/// configuration minimizing the price of an invocation.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Path to the run configuration (JSON).
    #[arg(value_parser = validate_file)]
    pub conffile: PathBuf,

    /// Apply the aggregated recommendation to the function when the run
    /// succeeds, instead of restoring its pre-run configuration.
    #[arg(short, long)]
    pub apply: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.exists() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}
