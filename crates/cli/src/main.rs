mod cli;

use clap::Parser;
use cli::Cli;
use config::{RunConfig, Vendor};
use optimizer::provider::ProviderClient;
use optimizer::{Driver, RunReport};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(&cli) {
        report_failure(&format!("could not initialize logging: {err}"));
        return ExitCode::from(2);
    }

    let config = match RunConfig::load(&cli.conffile) {
        Ok(config) => config,
        Err(err) => {
            error!(path = %cli.conffile.display(), %err, "invalid run configuration");
            return ExitCode::from(2);
        }
    };
    debug!(?config, ?cli);

    match run(&config, cli.apply).await {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("optimization failed: {err:#}");
            ExitCode::from(1)
        }
    }
}

// NOTE: The verbosity flag takes precedence over the environment variable
// for log control: `MEMTUNE_LOG=warn memtune -vvv run.json` still logs at
// the trace level. The environment variable can only set per-crate levels,
// eg. `MEMTUNE_LOG=optimizer=debug`.
fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_env_var("MEMTUNE_LOG")
        .from_env()?
        .add_directive(cli.verbosity.log_level_filter().as_str().parse()?);

    let layer = tracing_subscriber::fmt::layer()
        .with_level(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .init();
    Ok(())
}

async fn run(config: &RunConfig, apply: bool) -> anyhow::Result<RunReport> {
    let client = connect(config).await?;
    let mut driver = Driver::new(client, config, apply);
    Ok(driver.run().await?)
}

async fn connect(config: &RunConfig) -> anyhow::Result<Arc<dyn ProviderClient>> {
    match config.vendor {
        #[cfg(feature = "aws-sdk")]
        Vendor::Aws => Ok(Arc::new(
            optimizer::provider::sdk::AwsSdkClient::connect(&config.region).await,
        )),
        #[cfg(not(feature = "aws-sdk"))]
        Vendor::Aws => anyhow::bail!(
            "this build has no AWS bindings; rebuild with `--features aws-sdk`"
        ),
    }
}

/// The report is the program's output proper; it goes to stdout while all
/// diagnostics go through tracing to stderr.
#[allow(clippy::print_stdout)]
fn print_report(report: &RunReport) {
    match serde_json::to_string_pretty(report) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => error!(%err, "could not render the run report"),
    }
}

#[allow(clippy::print_stderr)]
fn report_failure(message: &str) {
    eprintln!("memtune: {message}");
}
