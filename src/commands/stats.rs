//! # Stats Command Implementation
//!
//! This module implements the `stats` subcommand. It requests every given url
//! twice through the descriptor service, so the second round is served from
//! the cache, and prints the statistics of every cache scope as JSON.

use anyhow::{bail, Result};
use clap::Args;
use std::collections::BTreeMap;
use std::sync::Arc;

use descriptor_merge::service::DescriptorService;
use descriptor_merge::store::{ContentStore, DirectoryStore};

use super::{load_config, SourceArgs, StrategyArgs};

/// Warm the cache for some urls and print cache statistics
#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub strategy: StrategyArgs,

    /// Urls of the descriptors to merge
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,
}

/// Execute the `stats` command.
pub fn execute(args: StatsArgs) -> Result<()> {
    let config = load_config(args.source.config.as_deref())?;
    let store: Arc<dyn ContentStore> = Arc::new(DirectoryStore::new(&args.source.root));
    let strategy = args.strategy.build(Arc::clone(&store))?;
    let service = DescriptorService::new(store, strategy, &config)?;

    service.warm(&args.urls);
    let failures: Vec<String> = service
        .warm(&args.urls)
        .into_iter()
        .filter_map(|(url, result)| result.err().map(|err| format!("{}: {}", url, err)))
        .collect();

    let statistics: BTreeMap<String, _> = service.statistics()?.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&statistics)?);

    if !failures.is_empty() {
        for failure in &failures {
            eprintln!("error: {}", failure);
        }
        bail!("{} descriptor(s) failed to merge", failures.len());
    }
    Ok(())
}
