//! # Merge Command Implementation
//!
//! This module implements the `merge` subcommand, which merges markup files
//! given on the command line, in order, and prints the merged document. The
//! first file is the most general one; every later file is merged over the
//! result of the ones before it.

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use std::fs;
use std::path::PathBuf;

use descriptor_merge::merge::DescriptorMerger;
use descriptor_merge::xml;

use super::load_config;

/// Merge descriptor files in order
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Descriptor files, most general first
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Path to a YAML configuration file
    #[arg(short, long, value_name = "FILE", env = "DESCRIPTOR_MERGE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Execute the `merge` command.
pub fn execute(args: MergeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let merger = DescriptorMerger::from_config(&config.merge)?;

    let mut documents = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let markup = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document =
            xml::parse(&markup).with_context(|| format!("Failed to parse {}", path.display()))?;
        documents.push(document);
    }

    let merged = merger.merge(&documents)?;
    info!("merged {} file(s)", documents.len());
    println!("{}", xml::to_string(&merged));
    Ok(())
}
