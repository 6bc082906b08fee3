use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;

/// Environment variable overriding the log filter.
const LOG_ENV: &str = "PSTORE_LOG";

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let settings = config::StoreConfig::load(&cli.data_dir)?;
    init_tracing(cli.verbose, &settings.log_filter);
    commands::run_command(cli, settings)
}

fn init_tracing(verbose: bool, configured: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(configured))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
