//! Ordering of the regions that contain a point.
//!
//! Nested regions win over their ancestors: the deepest region containing a
//! point comes first. Siblings are not supposed to overlap, so ties between
//! regions of equal depth keep the index's order and carry no meaning.

use std::sync::Arc;

use bastion_geometry::WorldPoint;
use bastion_region::{Region, RegionId, RegionStore, StoreError, hierarchy_depth};

use crate::{SharedSpatialIndex, SpatialIndex};

/// A region containing the queried point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMatch {
    pub id: RegionId,
    pub region: Region,
    /// 0 for a root region, 1 for its child, 2 for a grandchild.
    pub depth: u8,
}

/// Every region containing `point`, deepest first.
///
/// Ids the index knows about but the store does not are skipped with a
/// warning, as are ids whose lookup fails.
pub fn resolve(
    point: WorldPoint,
    store: &dyn RegionStore,
    index: &SpatialIndex,
) -> Vec<RegionMatch> {
    let mut matches: Vec<RegionMatch> = index
        .query(point)
        .into_iter()
        .filter_map(|id| match store.get(id) {
            Ok(found) => found.or_else(|| {
                tracing::warn!(region = %id, "indexed region missing from store");
                None
            }),
            Err(err) => {
                tracing::warn!(region = %id, %err, "region lookup failed");
                None
            }
        })
        .filter(|region| region.contains(point))
        .map(|region| with_depth(region, store))
        .collect();
    sort_by_priority(&mut matches);
    matches
}

/// Like [`resolve`], but a failing store lookup fails the whole query
/// instead of dropping the candidate.
pub fn try_resolve(
    point: WorldPoint,
    store: &dyn RegionStore,
    index: &SpatialIndex,
) -> Result<Vec<RegionMatch>, StoreError> {
    let mut matches = Vec::new();
    for id in index.query(point) {
        match store.get(id)? {
            Some(region) if region.contains(point) => matches.push(with_depth(region, store)),
            Some(_) => {}
            None => tracing::warn!(region = %id, "indexed region missing from store"),
        }
    }
    sort_by_priority(&mut matches);
    Ok(matches)
}

fn with_depth(region: Region, store: &dyn RegionStore) -> RegionMatch {
    let depth = hierarchy_depth(&region, |parent| store.get(parent).ok().flatten());
    RegionMatch {
        id: region.id.clone(),
        region,
        depth,
    }
}

/// Stable: equal depths keep index order.
fn sort_by_priority(matches: &mut [RegionMatch]) {
    matches.sort_by(|a, b| b.depth.cmp(&a.depth));
}

/// The authoritative region at `point`, if any.
pub fn highest_priority(
    point: WorldPoint,
    store: &dyn RegionStore,
    index: &SpatialIndex,
) -> Option<RegionMatch> {
    resolve(point, store, index).into_iter().next()
}

/// [`resolve`] bound to a region store and the published index.
#[derive(Clone)]
pub struct PriorityResolver {
    regions: Arc<dyn RegionStore>,
    index: Arc<SharedSpatialIndex>,
}

impl PriorityResolver {
    pub fn new(regions: Arc<dyn RegionStore>, index: Arc<SharedSpatialIndex>) -> Self {
        Self { regions, index }
    }

    pub fn resolve(&self, point: WorldPoint) -> Vec<RegionMatch> {
        resolve(point, self.regions.as_ref(), &self.index.snapshot())
    }

    pub fn try_resolve(&self, point: WorldPoint) -> Result<Vec<RegionMatch>, StoreError> {
        try_resolve(point, self.regions.as_ref(), &self.index.snapshot())
    }

    pub fn highest_priority(&self, point: WorldPoint) -> Option<RegionMatch> {
        self.resolve(point).into_iter().next()
    }
}
