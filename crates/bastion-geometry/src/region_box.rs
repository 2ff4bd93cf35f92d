use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::{BlockPos, PartitionId, WorldPoint};

/// Axis-aligned box of blocks inside one partition, inclusive on both ends.
///
/// Invariant: `min.x <= max.x`, `min.y <= max.y`, `min.z <= max.z`.
/// [`RegionBox::new`] enforces this by sorting components. Boxes that come
/// from deserialization are not re-checked; use [`RegionBox::is_normalized`]
/// before trusting them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionBox {
    pub partition: PartitionId,
    pub min: BlockPos,
    pub max: BlockPos,
}

impl RegionBox {
    /// Create a box from two corners, sorting components so that
    /// `min <= max` on every axis.
    pub fn new(partition: PartitionId, a: BlockPos, b: BlockPos) -> Self {
        Self {
            partition,
            min: BlockPos(a.0.min(b.0)),
            max: BlockPos(a.0.max(b.0)),
        }
    }

    /// Returns true if `min <= max` on every axis.
    pub fn is_normalized(&self) -> bool {
        self.min.0.cmple(self.max.0).all()
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains_point(&self, point: WorldPoint) -> bool {
        point_in_box(point, self)
    }

    /// The eight corners, in no particular order.
    pub fn corners(&self) -> [BlockPos; 8] {
        let (lo, hi) = (self.min.0, self.max.0);
        [
            BlockPos::new(lo.x, lo.y, lo.z),
            BlockPos::new(hi.x, lo.y, lo.z),
            BlockPos::new(lo.x, hi.y, lo.z),
            BlockPos::new(lo.x, lo.y, hi.z),
            BlockPos::new(hi.x, hi.y, lo.z),
            BlockPos::new(hi.x, lo.y, hi.z),
            BlockPos::new(lo.x, hi.y, hi.z),
            BlockPos::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Center block, rounding toward `min`.
    pub fn center(&self) -> BlockPos {
        let lo = self.min.0.as_i64vec3();
        let hi = self.max.0.as_i64vec3();
        let mid = lo + (hi - lo) / 2;
        BlockPos(IVec3::new(mid.x as i32, mid.y as i32, mid.z as i32))
    }

    /// Number of blocks covered, saturating at `u64::MAX`.
    pub fn volume(&self) -> u64 {
        let extent = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1).max(0) as u64;
        extent(self.min.x(), self.max.x())
            .saturating_mul(extent(self.min.y(), self.max.y()))
            .saturating_mul(extent(self.min.z(), self.max.z()))
    }
}

/// True iff the partitions match and each coordinate lies in `[min, max]`.
pub fn point_in_box(point: WorldPoint, bounds: &RegionBox) -> bool {
    point.partition == bounds.partition
        && point.pos.0.cmpge(bounds.min.0).all()
        && point.pos.0.cmple(bounds.max.0).all()
}

/// True iff `a` and `b` share at least one block. Touching faces overlap.
pub fn boxes_overlap(a: &RegionBox, b: &RegionBox) -> bool {
    a.partition == b.partition && a.min.0.cmple(b.max.0).all() && a.max.0.cmpge(b.min.0).all()
}

/// True iff every axis interval of `inner` lies within the matching interval
/// of `outer`.
pub fn box_contains(inner: &RegionBox, outer: &RegionBox) -> bool {
    inner.partition == outer.partition
        && inner.min.0.cmpge(outer.min.0).all()
        && inner.max.0.cmple(outer.max.0).all()
}
