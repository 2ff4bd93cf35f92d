//! Command-line argument parsing for the `bastion` tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::Config;

/// Bastion command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, PartialEq, Eq)]
#[command(name = "bastion", about = "Region claims and permission checks")]
pub struct CliArgs {
    /// Spatial index bucket size in blocks.
    #[arg(long, global = true)]
    pub bucket_size: Option<u32>,

    /// Permission cache TTL in seconds.
    #[arg(long, global = true)]
    pub cache_ttl: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// World fixture (RON) to load regions and permissions from.
    #[arg(long, global = true)]
    pub world: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Decide whether a player may do something at a point.
    Check {
        player: String,
        #[command(flatten)]
        point: PointArgs,
        permission: String,
    },
    /// List the regions containing a point, highest priority first.
    Regions {
        #[command(flatten)]
        point: PointArgs,
    },
}

/// A block position in a partition.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointArgs {
    pub partition: u32,
    #[arg(allow_negative_numbers = true)]
    pub x: i32,
    #[arg(allow_negative_numbers = true)]
    pub y: i32,
    #[arg(allow_negative_numbers = true)]
    pub z: i32,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(size) = args.bucket_size {
            self.index.bucket_size = size;
        }
        if let Some(ttl) = args.cache_ttl {
            self.cache.ttl_secs = ttl;
        }
        if let Some(ref level) = args.log_level {
            self.log.level = level.clone();
        }
    }
}
