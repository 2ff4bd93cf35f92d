//! Block positions, world partitions, and axis-aligned region boxes.
//!
//! Everything here is pure: predicates take their inputs by value or
//! reference and never touch shared state.

mod position;
mod region_box;

pub use position::{BlockPos, PartitionId, WorldPoint};
pub use region_box::{RegionBox, box_contains, boxes_overlap, point_in_box};
