//! # Resolve Command Implementation
//!
//! This module implements the `resolve` subcommand. It reads descriptors from
//! a directory tree, lets the selected strategy decide which of them
//! contribute to the requested url, merges them and prints the result.

use anyhow::{bail, Result};
use clap::Args;
use std::sync::Arc;

use descriptor_merge::merge::DescriptorMerger;
use descriptor_merge::service::merge_descriptor;
use descriptor_merge::store::{ContentStore, DirectoryStore};
use descriptor_merge::xml;

use super::{load_config, SourceArgs, StrategyArgs};

/// Resolve and merge the descriptors for one url
#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub strategy: StrategyArgs,

    /// Url of the requested descriptor, relative to --root
    #[arg(value_name = "URL")]
    pub url: String,
}

/// Execute the `resolve` command.
pub fn execute(args: ResolveArgs) -> Result<()> {
    let config = load_config(args.source.config.as_deref())?;
    let store: Arc<dyn ContentStore> = Arc::new(DirectoryStore::new(&args.source.root));
    let strategy = args.strategy.build(Arc::clone(&store))?;
    let merger = DescriptorMerger::from_config(&config.merge)?;

    let merged = merge_descriptor(store.as_ref(), strategy.as_ref(), &merger, &args.url)?;
    if merged.is_empty() {
        bail!("No descriptors found for {}", args.url);
    }
    println!("{}", xml::to_string(&merged));
    Ok(())
}
