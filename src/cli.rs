//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Descriptor Merge - Merge hierarchical descriptor documents
#[derive(Parser, Debug)]
#[command(name = "descriptor-merge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "warn",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge markup files in order, the first one being the most general
    Merge(commands::merge::MergeArgs),

    /// Resolve and merge the descriptors contributing to a url
    Resolve(commands::resolve::ResolveArgs),

    /// Merge urls through the cache and print cache statistics as JSON
    Stats(commands::stats::StatsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // A logger may already be installed when embedded; keep it.
        let _ = env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .format_timestamp(None)
            .try_init();

        match self.command {
            Commands::Merge(args) => commands::merge::execute(args),
            Commands::Resolve(args) => commands::resolve::execute(args),
            Commands::Stats(args) => commands::stats::execute(args),
        }
    }
}
