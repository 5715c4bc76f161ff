//! CLI definitions for Cellvisor.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cellvisor CLI.
#[derive(Parser)]
#[command(name = "cellvisor")]
#[command(about = "Supervisory kernel for multi-domain actor runtimes")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (built-in defaults when omitted)
    #[arg(short, long, env = "CELLVISOR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run a demo workload through the kernel
    Run {
        /// Number of domains to create
        #[arg(long, default_value_t = 4)]
        domains: usize,

        /// Messages sent to each domain before it is destroyed
        #[arg(long, default_value_t = 100)]
        messages: usize,
    },

    /// Validate a configuration file and report warnings
    CheckConfig {
        /// Configuration file to check
        path: PathBuf,
    },
}
