use std::path::PathBuf;

use bastion_config::ConfigError;
use bastion_perms::ServiceError;
use bastion_region::{PlacementError, RegionId, StoreError};

/// Failure to read a world fixture.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse fixture: {0}")]
    Parse(#[source] ron::error::SpannedError),

    /// Some regions name parents that never appear in the fixture.
    #[error("regions with unresolvable parents: {0:?}")]
    Orphans(Vec<RegionId>),
}

/// Any failure surfaced by [`Bastion`](crate::Bastion) or the CLI.
#[derive(Debug, thiserror::Error)]
pub enum BastionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Permissions(#[from] ServiceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error("region {0} already exists")]
    DuplicateRegion(RegionId),

    #[error("unknown region {0}")]
    UnknownRegion(RegionId),

    #[error(transparent)]
    Platform(#[from] crate::platform::PlatformError),
}
