//! Region spatial index and priority resolution.
//!
//! [`SpatialIndex`] buckets region footprints by horizontal cell so that a
//! point query touches one cell. [`SharedSpatialIndex`] publishes rebuilt
//! indexes by pointer swap. [`PriorityResolver`] turns the candidate set into
//! the ordered list of regions that actually contain a point, innermost first.

mod index;
mod priority;
mod shared;

pub use index::{BucketKey, IndexSettings, IndexStats, SpatialIndex};
pub use priority::{PriorityResolver, RegionMatch, highest_priority, resolve, try_resolve};
pub use shared::SharedSpatialIndex;
