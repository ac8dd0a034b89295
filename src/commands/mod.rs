//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `descriptor-merge` command-line tool. Each subcommand is defined in its own
//! file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `descriptor_merge` library.
//!
//! Options shared by several commands live here.

pub mod merge;
pub mod resolve;
pub mod stats;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use descriptor_merge::config::{self, Config};
use descriptor_merge::store::ContentStore;
use descriptor_merge::strategy::{
    DescriptorMergeStrategy, FolderPatternStrategy, InheritVersionsStrategy,
};

/// Load the configuration file, or the defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Which descriptors contribute to a url
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    /// The descriptor of the same name in every ancestor folder
    Inherit,
    /// Every descriptor matching --pattern in every ancestor folder
    Folder,
}

/// Options selecting the merge strategy
#[derive(Args, Debug)]
pub struct StrategyArgs {
    /// Merge strategy
    #[arg(long, value_enum, default_value = "inherit")]
    pub strategy: StrategyKind,

    /// File name pattern for the folder strategy
    #[arg(long, value_name = "GLOB", default_value = "*.xml")]
    pub pattern: String,

    /// Do not fail when the requested descriptor itself is missing
    #[arg(long)]
    pub all_optional: bool,
}

impl StrategyArgs {
    pub fn build(&self, store: Arc<dyn ContentStore>) -> Result<Arc<dyn DescriptorMergeStrategy>> {
        let strategy: Arc<dyn DescriptorMergeStrategy> = match self.strategy {
            StrategyKind::Inherit => Arc::new(InheritVersionsStrategy::new(self.all_optional)),
            StrategyKind::Folder => Arc::new(
                FolderPatternStrategy::new(store, &self.pattern)
                    .with_context(|| format!("Invalid pattern '{}'", self.pattern))?,
            ),
        };
        Ok(strategy)
    }
}

/// Options locating the descriptors and the configuration
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Root directory of the descriptor tree
    #[arg(long, value_name = "DIR")]
    pub root: PathBuf,

    /// Path to a YAML configuration file
    #[arg(short, long, value_name = "FILE", env = "DESCRIPTOR_MERGE_CONFIG")]
    pub config: Option<PathBuf>,
}
