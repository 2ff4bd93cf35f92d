//! Permission resolution for claimed regions.
//!
//! [`PermissionResolver`] walks the resolution chain for one player, region
//! and permission. It reads through a [`CacheLayer`] of four TTL caches in
//! front of the stores. [`PermissionService`] owns the write paths and keeps
//! those caches coherent with the stores.

pub mod cache;
pub mod clock;
pub mod resolver;
pub mod service;
mod ttl;

pub use cache::{CacheLayer, CacheSettings, CacheStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use resolver::{AdminSet, CHAIN, Decision, PermissionResolver, Step};
pub use service::{PermissionService, ServiceError};
pub use ttl::{GrantCache, TtlCache};
