//! Boundary traits for the authoritative stores.
//!
//! Every call is fallible: a backend may be unreachable. Absence is not an
//! error and is reported as `Ok(None)`.

use std::sync::Arc;

use crate::{GroupName, PermissionGroup, PermissionSet, PlayerId, Region, RegionId};

/// Failure of an authoritative store backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend returned data that could not be decoded.
    #[error("corrupt record {key}: {reason}")]
    Corrupt {
        /// Key of the offending record.
        key: String,
        /// What was wrong with it.
        reason: String,
    },
}

pub trait RegionStore: Send + Sync {
    fn get_all(&self) -> Result<Vec<Region>, StoreError>;
    fn get(&self, id: &RegionId) -> Result<Option<Region>, StoreError>;
    fn put(&self, region: Region) -> Result<(), StoreError>;
    fn remove(&self, id: &RegionId) -> Result<Option<Region>, StoreError>;
}

pub trait GroupStore: Send + Sync {
    fn get(&self, creator: &PlayerId, name: &GroupName)
    -> Result<Option<PermissionGroup>, StoreError>;

    /// Creator of the group called `name`, if any.
    fn find_creator(&self, name: &GroupName) -> Result<Option<PlayerId>, StoreError>;

    /// Look a group up by name alone.
    ///
    /// The default implementation does the creator lookup and the keyed get
    /// in two hops; a creator that resolves to no record is reported as
    /// absent.
    fn resolve_by_name(&self, name: &GroupName) -> Result<Option<PermissionGroup>, StoreError> {
        match self.find_creator(name)? {
            Some(creator) => self.get(&creator, name),
            None => Ok(None),
        }
    }

    fn put(&self, group: PermissionGroup) -> Result<(), StoreError>;
    fn remove(&self, creator: &PlayerId, name: &GroupName)
    -> Result<Option<PermissionGroup>, StoreError>;
}

pub trait PlayerGrantStore: Send + Sync {
    fn get(&self, player: &PlayerId, region: &RegionId) -> Result<Option<GroupName>, StoreError>;
    fn set(&self, player: &PlayerId, region: &RegionId, group: GroupName)
    -> Result<(), StoreError>;
    /// Returns whether a grant existed.
    fn delete(&self, player: &PlayerId, region: &RegionId) -> Result<bool, StoreError>;
    /// Drop every grant on `region`, returning the affected players.
    fn delete_region(&self, region: &RegionId) -> Result<Vec<PlayerId>, StoreError>;
}

pub trait RegionDefaultStore: Send + Sync {
    fn get(&self, region: &RegionId) -> Result<Option<GroupName>, StoreError>;
    fn set(&self, region: &RegionId, group: Option<GroupName>) -> Result<(), StoreError>;
}

pub trait SystemDefaultStore: Send + Sync {
    fn get(&self) -> Result<PermissionSet, StoreError>;
    fn set(&self, permissions: PermissionSet) -> Result<(), StoreError>;
}

/// Handles to every store, shared by the components that read them.
#[derive(Clone)]
pub struct Stores {
    pub regions: Arc<dyn RegionStore>,
    pub groups: Arc<dyn GroupStore>,
    pub grants: Arc<dyn PlayerGrantStore>,
    pub region_defaults: Arc<dyn RegionDefaultStore>,
    pub system_default: Arc<dyn SystemDefaultStore>,
}

impl Stores {
    /// Use one backend for all five roles.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: RegionStore
            + GroupStore
            + PlayerGrantStore
            + RegionDefaultStore
            + SystemDefaultStore
            + 'static,
    {
        Self {
            regions: store.clone(),
            groups: store.clone(),
            grants: store.clone(),
            region_defaults: store.clone(),
            system_default: store,
        }
    }
}
