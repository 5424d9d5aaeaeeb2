mod app;
mod config;
#[cfg(feature = "plot")]
mod plot;
mod prompt;
mod report;

use anyhow::Result;
use config::CliConfig;
use euler_core::comparison::ComparisonReport;
use std::io;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Core warnings duplicate the messages printed to the user, so only
    // errors are logged unless RUST_LOG asks for more.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(io::stderr)
        .init();

    let config = CliConfig::load();
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut prompter = prompt::Prompter::new(stdin.lock(), stdout.lock());
    let report = app::run(&mut prompter, &config)?;
    show_plot(&report, &config)
}

#[cfg(feature = "plot")]
fn show_plot(report: &ComparisonReport, config: &CliConfig) -> Result<()> {
    if config.show_plot {
        plot::show(report)
            .map_err(|e| anyhow::anyhow!("Could not open the plot window: {e}"))?;
    }
    Ok(())
}

#[cfg(not(feature = "plot"))]
fn show_plot(_report: &ComparisonReport, _config: &CliConfig) -> Result<()> {
    Ok(())
}
