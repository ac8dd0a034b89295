//! # Descriptor Merge CLI
//!
//! This is the binary entry point for the `descriptor-merge` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging from the global `--log-level` flag.
//! - Executing the appropriate command and reporting its errors.
//!
//! The merge engine, stores and cache live in the `descriptor_merge` library
//! crate; the binary is a thin wrapper around them.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
