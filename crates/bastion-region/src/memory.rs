//! In-process store backing every boundary trait.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::store::{
    GroupStore, PlayerGrantStore, RegionDefaultStore, RegionStore, StoreError, SystemDefaultStore,
};
use crate::{GroupName, PermissionGroup, PermissionSet, PlayerId, Region, RegionId};

#[derive(Default)]
struct Tables {
    regions: FxHashMap<RegionId, Region>,
    groups: FxHashMap<(PlayerId, GroupName), PermissionGroup>,
    grants: FxHashMap<(PlayerId, RegionId), GroupName>,
    system_default: PermissionSet,
}

/// Thread-safe in-memory store.
///
/// Region defaults live on the [`Region`] record itself, so
/// [`RegionDefaultStore`] reads and writes `Region::default_group`.
///
/// The store can be switched offline to simulate an unreachable backend, and
/// counts every read so callers can observe cache effectiveness.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    online: AtomicBool,
    reads: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            online: AtomicBool::new(true),
            reads: AtomicU64::new(0),
        }
    }

    /// When offline, every call fails with [`StoreError::Unavailable`].
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    /// Number of read calls served (or refused) so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn read(&self) -> Result<parking_lot::RwLockReadGuard<'_, Tables>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.ensure_online()?;
        Ok(self.tables.read())
    }

    fn write(&self) -> Result<parking_lot::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.ensure_online()?;
        Ok(self.tables.write())
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.online.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".into()))
        }
    }
}

impl RegionStore for MemoryStore {
    fn get_all(&self) -> Result<Vec<Region>, StoreError> {
        Ok(self.read()?.regions.values().cloned().collect())
    }

    fn get(&self, id: &RegionId) -> Result<Option<Region>, StoreError> {
        Ok(self.read()?.regions.get(id).cloned())
    }

    fn put(&self, region: Region) -> Result<(), StoreError> {
        self.write()?.regions.insert(region.id.clone(), region);
        Ok(())
    }

    fn remove(&self, id: &RegionId) -> Result<Option<Region>, StoreError> {
        Ok(self.write()?.regions.remove(id))
    }
}

impl GroupStore for MemoryStore {
    fn get(
        &self,
        creator: &PlayerId,
        name: &GroupName,
    ) -> Result<Option<PermissionGroup>, StoreError> {
        let key = (creator.clone(), name.clone());
        Ok(self.read()?.groups.get(&key).cloned())
    }

    fn find_creator(&self, name: &GroupName) -> Result<Option<PlayerId>, StoreError> {
        // Names are expected to be unique; pick the lowest creator if not.
        Ok(self
            .read()?
            .groups
            .keys()
            .filter(|(_, group)| group == name)
            .map(|(creator, _)| creator)
            .min()
            .cloned())
    }

    fn resolve_by_name(&self, name: &GroupName) -> Result<Option<PermissionGroup>, StoreError> {
        Ok(self
            .read()?
            .groups
            .values()
            .filter(|group| &group.name == name)
            .min_by(|a, b| a.creator.cmp(&b.creator))
            .cloned())
    }

    fn put(&self, group: PermissionGroup) -> Result<(), StoreError> {
        let key = (group.creator.clone(), group.name.clone());
        self.write()?.groups.insert(key, group);
        Ok(())
    }

    fn remove(
        &self,
        creator: &PlayerId,
        name: &GroupName,
    ) -> Result<Option<PermissionGroup>, StoreError> {
        let key = (creator.clone(), name.clone());
        Ok(self.write()?.groups.remove(&key))
    }
}

impl PlayerGrantStore for MemoryStore {
    fn get(&self, player: &PlayerId, region: &RegionId) -> Result<Option<GroupName>, StoreError> {
        let key = (player.clone(), region.clone());
        Ok(self.read()?.grants.get(&key).cloned())
    }

    fn set(
        &self,
        player: &PlayerId,
        region: &RegionId,
        group: GroupName,
    ) -> Result<(), StoreError> {
        self.write()?
            .grants
            .insert((player.clone(), region.clone()), group);
        Ok(())
    }

    fn delete(&self, player: &PlayerId, region: &RegionId) -> Result<bool, StoreError> {
        let key = (player.clone(), region.clone());
        Ok(self.write()?.grants.remove(&key).is_some())
    }

    fn delete_region(&self, region: &RegionId) -> Result<Vec<PlayerId>, StoreError> {
        let mut tables = self.write()?;
        let mut players = Vec::new();
        tables.grants.retain(|(player, granted_region), _| {
            if granted_region == region {
                players.push(player.clone());
                false
            } else {
                true
            }
        });
        Ok(players)
    }
}

impl RegionDefaultStore for MemoryStore {
    fn get(&self, region: &RegionId) -> Result<Option<GroupName>, StoreError> {
        Ok(self
            .read()?
            .regions
            .get(region)
            .and_then(|r| r.default_group.clone()))
    }

    fn set(&self, region: &RegionId, group: Option<GroupName>) -> Result<(), StoreError> {
        match self.write()?.regions.get_mut(region) {
            Some(record) => record.default_group = group,
            None => tracing::warn!(%region, "default group set on unknown region"),
        }
        Ok(())
    }
}

impl SystemDefaultStore for MemoryStore {
    fn get(&self) -> Result<PermissionSet, StoreError> {
        Ok(self.read()?.system_default.clone())
    }

    fn set(&self, permissions: PermissionSet) -> Result<(), StoreError> {
        self.write()?.system_default = permissions;
        Ok(())
    }
}
