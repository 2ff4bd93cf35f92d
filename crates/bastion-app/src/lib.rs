//! Bastion: region claims and permission checks.
//!
//! [`Bastion`] wires the region store, the published spatial index, the
//! priority resolver and the permission service together, and offers the
//! region mutation API that keeps the index current. [`WorldFixture`] loads a
//! complete world from RON.

mod error;
mod fixture;
pub mod platform;
mod world;

pub use error::{BastionError, FixtureError};
pub use fixture::{GrantFixture, WorldFixture};
pub use platform::PlatformDirs;
pub use world::{Bastion, Verdict};
