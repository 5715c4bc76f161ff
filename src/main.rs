//! Cellvisor - supervisory kernel for multi-domain actor runtimes
//!
//! Main entry point for the Cellvisor CLI.

mod cli;
mod cmd_config;
mod cmd_run;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cellvisor_config::{ConfigLoader, KernelConfig};

use crate::cli::{Cli, Commands};

/// Initialize console tracing; `RUST_LOG` wins over the configured filter.
fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_thread_names(true))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load(path)?,
        None => KernelConfig::default(),
    };
    init_tracing(&config.logging.filter);

    match cli.command {
        Commands::Run { domains, messages } => {
            cmd_run::run_workload(config, domains, messages).await
        }
        Commands::CheckConfig { path } => cmd_config::check_config(&path),
    }
}
