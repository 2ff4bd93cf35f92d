//! Configuration for the Bastion claim service.
//!
//! Settings persist to disk as a RON file with every section optional, so old
//! files keep loading as fields are added. Command-line flags parsed with
//! clap override what the file says.

mod cli;
mod config;
mod error;

pub use cli::{CliArgs, Command, PointArgs};
pub use config::{CacheConfig, Config, IndexConfig, LogConfig, PermissionsConfig};
pub use error::ConfigError;
