use bastion_geometry::{PartitionId, RegionBox, WorldPoint, point_in_box};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::{GroupName, PlayerId, RegionId};

/// Deepest allowed sub-region nesting: root = 0, child = 1, grandchild = 2.
pub const MAX_SUBREGION_DEPTH: u8 = 2;

/// Parent walks stop after this many hops even if the data forms a cycle.
const DEPTH_WALK_LIMIT: u8 = 8;

/// A claimed volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub bounds: RegionBox,
    pub owner: PlayerId,
    /// Present iff this is a sub-region.
    #[serde(default)]
    pub parent: Option<RegionId>,
    /// Group applied to players without a per-region grant.
    #[serde(default)]
    pub default_group: Option<GroupName>,
}

impl Region {
    /// A root region with no default group.
    pub fn root(id: impl Into<RegionId>, owner: impl Into<PlayerId>, bounds: RegionBox) -> Self {
        Self {
            id: id.into(),
            bounds,
            owner: owner.into(),
            parent: None,
            default_group: None,
        }
    }

    /// A sub-region nested under `parent`.
    pub fn child_of(
        id: impl Into<RegionId>,
        parent: impl Into<RegionId>,
        owner: impl Into<PlayerId>,
        bounds: RegionBox,
    ) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::root(id, owner, bounds)
        }
    }

    pub fn with_default_group(mut self, group: impl Into<GroupName>) -> Self {
        self.default_group = Some(group.into());
        self
    }

    pub fn partition(&self) -> PartitionId {
        self.bounds.partition
    }

    pub fn is_sub_region(&self) -> bool {
        self.parent.is_some()
    }

    pub fn contains(&self, point: WorldPoint) -> bool {
        point_in_box(point, &self.bounds)
    }
}

/// Nesting depth of `region`, following `parent` links through `lookup`.
///
/// A parent that `lookup` cannot find ends the walk; the depth reached so far
/// is returned.
pub fn hierarchy_depth(region: &Region, mut lookup: impl FnMut(&RegionId) -> Option<Region>) -> u8 {
    let mut depth = 0;
    let mut next = region.parent.clone();
    while let Some(parent_id) = next {
        depth += 1;
        if depth >= DEPTH_WALK_LIMIT {
            tracing::warn!(region = %region.id, "region parent chain exceeds walk limit");
            break;
        }
        next = match lookup(&parent_id) {
            Some(parent) => parent.parent,
            None => {
                tracing::warn!(region = %region.id, parent = %parent_id, "parent region missing");
                None
            }
        };
    }
    depth
}

/// A set of permission ids. Membership is a plain set-contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(FxHashSet<String>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allows(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    pub fn insert(&mut self, permission: impl Into<String>) -> bool {
        self.0.insert(permission.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A named, creator-scoped set of permission ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub creator: PlayerId,
    pub name: GroupName,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub permissions: PermissionSet,
}

impl PermissionGroup {
    pub fn new<S: Into<String>>(
        creator: impl Into<PlayerId>,
        name: impl Into<GroupName>,
        permissions: impl IntoIterator<Item = S>,
    ) -> Self {
        let name = name.into();
        Self {
            creator: creator.into(),
            display_name: name.to_string(),
            name,
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn allows(&self, permission: &str) -> bool {
        self.permissions.allows(permission)
    }
}
