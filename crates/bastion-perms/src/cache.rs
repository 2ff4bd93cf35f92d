//! The four caches in front of the permission stores.
//!
//! Every cache is read-through: a miss calls the supplied loader and keeps
//! the answer, "nothing configured" answers included. Single-key writes patch
//! entries in place. Expired entries are dropped by [`CacheLayer::maybe_sweep`],
//! which the resolver calls on its hot path; the sweep itself runs at most
//! once per sweep interval.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bastion_region::{GroupName, PermissionGroup, PermissionSet, PlayerId, RegionId};
use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::ttl::{GrantCache, TtlCache};

/// Expiry and sweep cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Entry counts per cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub player_grants: usize,
    pub region_defaults: usize,
    pub groups: usize,
    pub system_default: usize,
}

pub struct CacheLayer {
    player_grants: GrantCache,
    region_defaults: TtlCache<RegionId, Option<GroupName>>,
    groups: TtlCache<GroupName, Option<PermissionGroup>>,
    system_default: TtlCache<(), PermissionSet>,
    clock: Arc<dyn Clock>,
    settings: CacheSettings,
    last_sweep: Mutex<Instant>,
}

impl Default for CacheLayer {
    fn default() -> Self {
        Self::new(CacheSettings::default(), Arc::new(SystemClock))
    }
}

impl CacheLayer {
    pub fn new(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            player_grants: GrantCache::new(settings.ttl),
            region_defaults: TtlCache::new(settings.ttl),
            groups: TtlCache::new(settings.ttl),
            system_default: TtlCache::new(settings.ttl),
            clock,
            settings,
            last_sweep: Mutex::new(now),
        }
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    pub fn player_grant<E>(
        &self,
        player: &PlayerId,
        region: &RegionId,
        load: impl FnOnce() -> Result<Option<GroupName>, E>,
    ) -> Result<Option<GroupName>, E> {
        self.player_grants
            .get_or_load(player, region, self.clock.now(), load)
    }

    pub fn region_default<E>(
        &self,
        region: &RegionId,
        load: impl FnOnce() -> Result<Option<GroupName>, E>,
    ) -> Result<Option<GroupName>, E> {
        self.region_defaults
            .get_or_load(region, self.clock.now(), load)
    }

    pub fn group<E>(
        &self,
        name: &GroupName,
        load: impl FnOnce() -> Result<Option<PermissionGroup>, E>,
    ) -> Result<Option<PermissionGroup>, E> {
        self.groups.get_or_load(name, self.clock.now(), load)
    }

    pub fn system_default<E>(
        &self,
        load: impl FnOnce() -> Result<PermissionSet, E>,
    ) -> Result<PermissionSet, E> {
        self.system_default.get_or_load(&(), self.clock.now(), load)
    }

    pub fn put_player_grant(&self, player: PlayerId, region: RegionId, group: Option<GroupName>) {
        self.player_grants
            .put(player, region, group, self.clock.now());
    }

    pub fn put_region_default(&self, region: RegionId, group: Option<GroupName>) {
        self.region_defaults.put(region, group, self.clock.now());
    }

    pub fn put_system_default(&self, permissions: PermissionSet) {
        self.system_default.put((), permissions, self.clock.now());
    }

    /// Forget a group whose definition changed or vanished.
    pub fn drop_group(&self, name: &GroupName) {
        self.groups.invalidate(name);
    }

    /// Forget everything cached about a deleted region.
    pub fn forget_region(&self, region: &RegionId) {
        self.region_defaults.invalidate(region);
        self.player_grants.forget_region(region);
    }

    pub fn reset_all(&self) {
        self.player_grants.clear();
        self.region_defaults.clear();
        self.groups.clear();
        self.system_default.clear();
        tracing::debug!("permission caches reset");
    }

    /// Sweep expired entries from every cache if the sweep interval has
    /// passed since the last sweep. Returns whether a sweep ran.
    ///
    /// Concurrent callers do not wait: if another thread holds the gate the
    /// call returns `false` immediately.
    pub fn maybe_sweep(&self) -> bool {
        let now = self.clock.now();
        let Some(mut last) = self.last_sweep.try_lock() else {
            return false;
        };
        if now.saturating_duration_since(*last) < self.settings.sweep_interval {
            return false;
        }
        *last = now;
        drop(last);

        let evicted = self.player_grants.sweep(now)
            + self.region_defaults.sweep(now)
            + self.groups.sweep(now)
            + self.system_default.sweep(now);
        tracing::debug!(evicted, "permission cache sweep");
        true
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            player_grants: self.player_grants.len(),
            region_defaults: self.region_defaults.len(),
            groups: self.groups.len(),
            system_default: self.system_default.len(),
        }
    }
}
