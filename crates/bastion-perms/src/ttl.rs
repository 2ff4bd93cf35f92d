//! Read-through maps whose entries expire after a fixed age.

use std::collections::hash_map;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bastion_region::{GroupName, PlayerId, RegionId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::{FxBuildHasher, FxHashMap};

/// A value together with when, and by which write, it was stored.
#[derive(Debug, Clone)]
struct Stamped<V> {
    value: V,
    refreshed_at: Instant,
    generation: u64,
}

impl<V> Stamped<V> {
    fn new(value: V, now: Instant, generation: u64) -> Self {
        Self {
            value,
            refreshed_at: now,
            generation,
        }
    }

    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.refreshed_at) < ttl
    }
}

/// Monotonic write counter shared by the entries of one cache.
///
/// A loaded value may only replace an entry written before its load began,
/// and may not be stored at all if anything was removed meanwhile.
#[derive(Debug, Default)]
struct Generations {
    next: AtomicU64,
    last_removal: AtomicU64,
}

impl Generations {
    fn current(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }

    fn advance(&self) -> u64 {
        self.next.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Call before removing entries.
    fn mark_removal(&self) {
        let generation = self.advance();
        self.last_removal.fetch_max(generation, Ordering::AcqRel);
    }

    fn removed_since(&self, started: u64) -> bool {
        self.last_removal.load(Ordering::Acquire) > started
    }
}

/// Concurrent key/value cache with per-entry expiry.
///
/// Value and timestamp are written together under the shard lock of their
/// key, so readers never see one updated without the other.
pub struct TtlCache<K, V> {
    entries: DashMap<K, Stamped<V>, FxBuildHasher>,
    generations: Generations,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher),
            generations: Generations::default(),
            ttl,
        }
    }

    /// Fresh cached value, or the loader's result (cached, negatives
    /// included). A failed load caches nothing.
    ///
    /// The loader runs without any lock held. If a [`put`](Self::put) for
    /// the same key lands while it runs, that write is kept and returned
    /// instead of the loaded value.
    pub fn get_or_load<E>(
        &self,
        key: &K,
        now: Instant,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let cached = self
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.value.clone());
        if let Some(value) = cached {
            return Ok(value);
        }

        let started = self.generations.current();
        let value = load()?;
        let generation = self.generations.advance();
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().generation > started {
                    return Ok(entry.get().value.clone());
                }
                entry.insert(Stamped::new(value.clone(), now, generation));
            }
            Entry::Vacant(entry) => {
                if !self.generations.removed_since(started) {
                    entry.insert(Stamped::new(value.clone(), now, generation));
                }
            }
        }
        Ok(value)
    }

    /// Fresh cached value without loading.
    pub fn peek(&self, key: &K, now: Instant) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Write-through patch.
    pub fn put(&self, key: K, value: V, now: Instant) {
        let generation = self.generations.advance();
        self.entries.insert(key, Stamped::new(value, now, generation));
    }

    pub fn invalidate(&self, key: &K) -> bool {
        self.generations.mark_removal();
        self.entries.remove(key).is_some()
    }

    /// Drop every entry older than the TTL. Returns how many were dropped.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) {
        self.generations.mark_removal();
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-player grant cache: `player -> {region -> group or none}`.
pub struct GrantCache {
    players: DashMap<PlayerId, FxHashMap<RegionId, Stamped<Option<GroupName>>>, FxBuildHasher>,
    generations: Generations,
    ttl: Duration,
}

impl GrantCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            players: DashMap::with_hasher(FxBuildHasher),
            generations: Generations::default(),
            ttl,
        }
    }

    /// Same contract as [`TtlCache::get_or_load`].
    pub fn get_or_load<E>(
        &self,
        player: &PlayerId,
        region: &RegionId,
        now: Instant,
        load: impl FnOnce() -> Result<Option<GroupName>, E>,
    ) -> Result<Option<GroupName>, E> {
        let cached = self.players.get(player).and_then(|regions| {
            regions
                .get(region)
                .filter(|entry| entry.is_fresh(now, self.ttl))
                .map(|entry| entry.value.clone())
        });
        if let Some(group) = cached {
            return Ok(group);
        }

        let started = self.generations.current();
        let group = load()?;
        let generation = self.generations.advance();
        let mut regions = self.players.entry(player.clone()).or_default();
        match regions.entry(region.clone()) {
            hash_map::Entry::Occupied(mut entry) => {
                if entry.get().generation > started {
                    return Ok(entry.get().value.clone());
                }
                entry.insert(Stamped::new(group.clone(), now, generation));
            }
            hash_map::Entry::Vacant(entry) => {
                if !self.generations.removed_since(started) {
                    entry.insert(Stamped::new(group.clone(), now, generation));
                }
            }
        }
        let empty = regions.is_empty();
        drop(regions);
        if empty {
            self.players.remove_if(player, |_, regions| regions.is_empty());
        }
        Ok(group)
    }

    pub fn put(&self, player: PlayerId, region: RegionId, group: Option<GroupName>, now: Instant) {
        let generation = self.generations.advance();
        self.players
            .entry(player)
            .or_default()
            .insert(region, Stamped::new(group, now, generation));
    }

    /// Drop every player's entry for `region`.
    pub fn forget_region(&self, region: &RegionId) {
        self.generations.mark_removal();
        self.players.retain(|_, regions| {
            regions.remove(region);
            !regions.is_empty()
        });
    }

    pub fn sweep(&self, now: Instant) -> usize {
        let mut evicted = 0;
        self.players.retain(|_, regions| {
            let before = regions.len();
            regions.retain(|_, entry| entry.is_fresh(now, self.ttl));
            evicted += before - regions.len();
            !regions.is_empty()
        });
        evicted
    }

    pub fn clear(&self) {
        self.generations.mark_removal();
        self.players.clear();
    }

    /// Number of cached `(player, region)` pairs.
    pub fn len(&self) -> usize {
        self.players.iter().map(|regions| regions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_hit_skips_loader() {
        let cache: TtlCache<u32, &str> = TtlCache::new(TTL);
        let t0 = Instant::now();
        let loads = Cell::new(0);
        let load = || {
            loads.set(loads.get() + 1);
            Ok::<_, ()>("value")
        };
        assert_eq!(cache.get_or_load(&1, t0, load), Ok("value"));
        assert_eq!(cache.get_or_load(&1, t0 + Duration::from_secs(30), load), Ok("value"));
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn test_stale_entry_reloads() {
        let cache: TtlCache<u32, u32> = TtlCache::new(TTL);
        let t0 = Instant::now();
        cache.get_or_load(&1, t0, || Ok::<_, ()>(10)).unwrap();
        let later = t0 + TTL;
        assert_eq!(cache.peek(&1, later), None);
        assert_eq!(cache.get_or_load(&1, later, || Ok::<_, ()>(20)), Ok(20));
        assert_eq!(cache.peek(&1, later), Some(20));
    }

    #[test]
    fn test_negative_results_are_cached() {
        let cache: TtlCache<u32, Option<u32>> = TtlCache::new(TTL);
        let t0 = Instant::now();
        cache.get_or_load(&1, t0, || Ok::<_, ()>(None)).unwrap();
        let reloaded = cache.get_or_load(&1, t0, || -> Result<Option<u32>, ()> {
            panic!("negative entry should have been served from cache")
        });
        assert_eq!(reloaded, Ok(None));
    }

    #[test]
    fn test_failed_load_caches_nothing() {
        let cache: TtlCache<u32, u32> = TtlCache::new(TTL);
        let t0 = Instant::now();
        assert_eq!(cache.get_or_load(&1, t0, || Err("down")), Err("down"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_refreshes_timestamp() {
        let cache: TtlCache<u32, u32> = TtlCache::new(TTL);
        let t0 = Instant::now();
        cache.put(1, 10, t0);
        cache.put(1, 11, t0 + Duration::from_secs(50));
        assert_eq!(cache.peek(&1, t0 + Duration::from_secs(90)), Some(11));
    }

    #[test]
    fn test_sweep_evicts_only_expired() {
        let cache: TtlCache<u32, u32> = TtlCache::new(TTL);
        let t0 = Instant::now();
        cache.put(1, 1, t0);
        cache.put(2, 2, t0 + Duration::from_secs(45));
        assert_eq!(cache.sweep(t0 + Duration::from_secs(70)), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&2, t0 + Duration::from_secs(70)), Some(2));
    }

    #[test]
    fn test_put_during_load_is_kept() {
        let cache: TtlCache<u32, Option<&str>> = TtlCache::new(TTL);
        let t0 = Instant::now();
        let loaded = cache.get_or_load(&1, t0, || {
            cache.put(1, Some("patched"), t0);
            Ok::<_, ()>(None)
        });
        assert_eq!(loaded, Ok(Some("patched")));
        assert_eq!(cache.peek(&1, t0), Some(Some("patched")));
    }

    #[test]
    fn test_put_during_reload_of_stale_entry_is_kept() {
        let cache: TtlCache<u32, u32> = TtlCache::new(TTL);
        let t0 = Instant::now();
        cache.put(1, 10, t0);
        let later = t0 + TTL;
        let loaded = cache.get_or_load(&1, later, || {
            cache.put(1, 30, later);
            Ok::<_, ()>(20)
        });
        assert_eq!(loaded, Ok(30));
        assert_eq!(cache.peek(&1, later), Some(30));
    }

    #[test]
    fn test_clear_during_load_stores_nothing() {
        let cache: TtlCache<u32, u32> = TtlCache::new(TTL);
        let t0 = Instant::now();
        let loaded = cache.get_or_load(&1, t0, || {
            cache.clear();
            Ok::<_, ()>(20)
        });
        assert_eq!(loaded, Ok(20));
        assert!(cache.is_empty());

        // Loads that begin afterwards are cached as usual.
        cache.get_or_load(&1, t0, || Ok::<_, ()>(21)).unwrap();
        assert_eq!(cache.peek(&1, t0), Some(21));
    }

    #[test]
    fn test_grant_put_during_load_is_kept() {
        let cache = GrantCache::new(TTL);
        let t0 = Instant::now();
        let bob = PlayerId::from("bob");
        let r1 = RegionId::from("r1");

        let loaded = cache.get_or_load(&bob, &r1, t0, || {
            cache.put(bob.clone(), r1.clone(), Some(GroupName::from("builder")), t0);
            Ok::<_, ()>(None)
        });
        assert_eq!(loaded, Ok(Some(GroupName::from("builder"))));
        let again = cache.get_or_load(&bob, &r1, t0, || -> Result<_, ()> { panic!("cached") });
        assert_eq!(again, Ok(Some(GroupName::from("builder"))));
    }

    #[test]
    fn test_grant_forget_during_load_stores_nothing() {
        let cache = GrantCache::new(TTL);
        let t0 = Instant::now();
        let bob = PlayerId::from("bob");
        let r1 = RegionId::from("r1");

        let loaded = cache.get_or_load(&bob, &r1, t0, || {
            cache.forget_region(&r1);
            Ok::<_, ()>(Some(GroupName::from("builder")))
        });
        assert_eq!(loaded, Ok(Some(GroupName::from("builder"))));
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_grant_cache_nested_entries() {
        let cache = GrantCache::new(TTL);
        let t0 = Instant::now();
        let bob = PlayerId::from("bob");
        let (r1, r2) = (RegionId::from("r1"), RegionId::from("r2"));

        cache.put(bob.clone(), r1.clone(), Some(GroupName::from("builder")), t0);
        cache.put(bob.clone(), r2.clone(), None, t0 + Duration::from_secs(40));
        assert_eq!(cache.len(), 2);

        let hit = cache.get_or_load(&bob, &r1, t0, || -> Result<_, ()> { panic!("cached") });
        assert_eq!(hit, Ok(Some(GroupName::from("builder"))));

        assert_eq!(cache.sweep(t0 + Duration::from_secs(61)), 1);
        cache.forget_region(&r2);
        assert!(cache.is_empty());
    }
}
