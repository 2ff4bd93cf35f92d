//! World fixtures: a whole claim world in one RON file.

use std::path::Path;

use bastion_region::{GroupName, PermissionGroup, PermissionSet, PlayerId, Region, RegionId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::FixtureError;

/// Regions, groups and permission data to seed a store with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldFixture {
    /// Added to the admins from the config.
    pub admins: Vec<PlayerId>,
    pub groups: Vec<PermissionGroup>,
    /// Region defaults ride along on each region's `default_group`.
    pub regions: Vec<Region>,
    pub grants: Vec<GrantFixture>,
    pub system_default: PermissionSet,
}

/// One per-player, per-region grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantFixture {
    pub player: PlayerId,
    pub region: RegionId,
    pub group: GroupName,
}

impl WorldFixture {
    pub fn from_ron(text: &str) -> Result<Self, FixtureError> {
        ron::from_str(text).map_err(FixtureError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let fixture = Self::from_ron(&text)?;
        tracing::info!(
            path = %path.display(),
            regions = fixture.regions.len(),
            groups = fixture.groups.len(),
            "loaded world fixture"
        );
        Ok(fixture)
    }

    /// Regions ordered so that every parent comes before its children.
    pub fn creation_order(&self) -> Result<Vec<&Region>, FixtureError> {
        let mut placed: FxHashSet<&RegionId> = FxHashSet::default();
        let mut pending: Vec<&Region> = self.regions.iter().collect();
        let mut ordered = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let (ready, waiting): (Vec<&Region>, Vec<&Region>) = pending
                .into_iter()
                .partition(|r| r.parent.as_ref().is_none_or(|p| placed.contains(p)));
            if ready.is_empty() {
                let orphans = waiting.into_iter().map(|r| r.id.clone()).collect();
                return Err(FixtureError::Orphans(orphans));
            }
            placed.extend(ready.iter().copied().map(|r| &r.id));
            ordered.extend(ready);
            pending = waiting;
        }
        Ok(ordered)
    }
}
