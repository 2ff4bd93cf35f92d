//! Write paths for permission data.
//!
//! Every write goes to the authoritative store first and then patches or
//! drops the matching cache entries, so a check issued right after a write
//! sees it without waiting for expiry.

use std::sync::Arc;

use bastion_region::{
    GroupName, PermissionGroup, PermissionSet, PlayerId, RegionId, StoreError, Stores,
};

use crate::cache::CacheLayer;
use crate::resolver::{AdminSet, Decision, PermissionResolver};

/// Errors from permission writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unknown region {0}")]
    UnknownRegion(RegionId),

    #[error("unknown group {0}")]
    UnknownGroup(GroupName),

    #[error("malformed player id {0:?}")]
    MalformedPlayer(PlayerId),
}

/// Reads and writes of permission data over one set of stores and caches.
#[derive(Clone)]
pub struct PermissionService {
    stores: Stores,
    resolver: PermissionResolver,
}

impl PermissionService {
    pub fn new(stores: Stores, cache: Arc<CacheLayer>, admins: Arc<AdminSet>) -> Self {
        let resolver = PermissionResolver::new(stores.clone(), cache, admins);
        Self { stores, resolver }
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    fn cache(&self) -> &CacheLayer {
        self.resolver.cache()
    }

    pub fn check(&self, player: &PlayerId, region: &RegionId, permission: &str) -> bool {
        self.resolver.check(player, region, permission)
    }

    pub fn evaluate(&self, player: &PlayerId, region: &RegionId, permission: &str) -> Decision {
        self.resolver.evaluate(player, region, permission)
    }

    pub fn set_player_grant(
        &self,
        player: &PlayerId,
        region: &RegionId,
        group: GroupName,
    ) -> Result<(), ServiceError> {
        if !player.is_well_formed() {
            return Err(ServiceError::MalformedPlayer(player.clone()));
        }
        self.require_region(region)?;
        self.require_group(&group)?;

        self.stores.grants.set(player, region, group.clone())?;
        tracing::debug!(%player, %region, %group, "player grant set");
        self.cache()
            .put_player_grant(player.clone(), region.clone(), Some(group));
        Ok(())
    }

    /// Returns whether a grant existed.
    pub fn remove_player_grant(
        &self,
        player: &PlayerId,
        region: &RegionId,
    ) -> Result<bool, ServiceError> {
        let existed = self.stores.grants.delete(player, region)?;
        self.cache()
            .put_player_grant(player.clone(), region.clone(), None);
        Ok(existed)
    }

    pub fn set_region_default(
        &self,
        region: &RegionId,
        group: Option<GroupName>,
    ) -> Result<(), ServiceError> {
        self.require_region(region)?;
        if let Some(group) = &group {
            self.require_group(group)?;
        }
        self.stores.region_defaults.set(region, group.clone())?;
        self.cache().put_region_default(region.clone(), group);
        Ok(())
    }

    pub fn set_system_default(&self, permissions: PermissionSet) -> Result<(), ServiceError> {
        self.stores.system_default.set(permissions.clone())?;
        self.cache().put_system_default(permissions);
        Ok(())
    }

    /// Create or redefine a group.
    pub fn define_group(&self, group: PermissionGroup) -> Result<(), ServiceError> {
        let name = group.name.clone();
        self.stores.groups.put(group)?;
        self.cache().drop_group(&name);
        tracing::debug!(group = %name, "group defined");
        Ok(())
    }

    /// Delete a group. Every cache is reset since grants and defaults may
    /// still name it.
    pub fn delete_group(&self, creator: &PlayerId, name: &GroupName) -> Result<bool, ServiceError> {
        let removed = self.stores.groups.remove(creator, name)?;
        self.cache().drop_group(name);
        self.cache().reset_all();
        Ok(removed.is_some())
    }

    /// Drop a deleted region's grants from the store and everything cached
    /// about it. Returns the players whose grants were removed.
    pub fn forget_region(&self, region: &RegionId) -> Result<Vec<PlayerId>, ServiceError> {
        let players = self.stores.grants.delete_region(region)?;
        self.cache().forget_region(region);
        tracing::debug!(%region, grants = players.len(), "region permissions forgotten");
        Ok(players)
    }

    fn require_region(&self, region: &RegionId) -> Result<(), ServiceError> {
        match self.stores.regions.get(region)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::UnknownRegion(region.clone())),
        }
    }

    fn require_group(&self, group: &GroupName) -> Result<(), ServiceError> {
        match self.stores.groups.resolve_by_name(group)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::UnknownGroup(group.clone())),
        }
    }
}
