//! Claim records and the store boundary.
//!
//! Regions, permission groups, and the per-player/per-region overrides that
//! the resolver reads all live behind the traits in [`store`]. The crate also
//! ships [`MemoryStore`], an in-process implementation of every trait, and
//! [`validate_placement`], the geometric rules a create or resize must obey.

mod ids;
mod memory;
mod model;
mod placement;
pub mod store;

pub use ids::{GroupName, PlayerId, RegionId};
pub use memory::MemoryStore;
pub use model::{MAX_SUBREGION_DEPTH, PermissionGroup, PermissionSet, Region, hierarchy_depth};
pub use placement::{PlacementError, validate_placement};
pub use store::{
    GroupStore, PlayerGrantStore, RegionDefaultStore, RegionStore, StoreError, Stores,
    SystemDefaultStore,
};
