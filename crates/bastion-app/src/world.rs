//! The composition root: stores, spatial index and permissions together.
//!
//! Every geometry or hierarchy change made through [`Bastion`] validates the
//! placement, writes the store and then rebuilds and republishes the whole
//! spatial index. Changes run one at a time, so each placement check sees
//! every region stored before it.

use std::fmt;
use std::sync::Arc;

use bastion_config::Config;
use bastion_geometry::{RegionBox, WorldPoint};
use bastion_perms::{
    AdminSet, CacheLayer, CacheSettings, Clock, Decision, PermissionService, Step, SystemClock,
};
use bastion_region::{MemoryStore, PlayerId, Region, RegionId, Stores, validate_placement};
use bastion_spatial::{IndexSettings, PriorityResolver, RegionMatch, SharedSpatialIndex};
use parking_lot::Mutex;

use crate::error::BastionError;
use crate::fixture::WorldFixture;

/// Answer to "may this player do this here?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No region claims the point.
    Unclaimed,
    /// `region` decided, through `decision.step`.
    Claimed { region: RegionId, decision: Decision },
    /// The region store could not be read, so nothing is allowed.
    Unavailable,
}

impl Verdict {
    pub fn allowed(&self) -> bool {
        match self {
            Self::Unclaimed => true,
            Self::Claimed { decision, .. } => decision.allowed,
            Self::Unavailable => false,
        }
    }

    pub fn region(&self) -> Option<&RegionId> {
        match self {
            Self::Claimed { region, .. } => Some(region),
            Self::Unclaimed | Self::Unavailable => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unclaimed => f.write_str("allowed: unclaimed land"),
            Self::Claimed { region, decision } => {
                let verb = if decision.allowed { "allowed" } else { "denied" };
                write!(f, "{verb}: {} in region {region}", decision.step)
            }
            Self::Unavailable => f.write_str("denied: region store unavailable"),
        }
    }
}

fn index_settings(config: &Config) -> IndexSettings {
    IndexSettings {
        bucket_size: config.index.bucket_size,
        max_bucket_span: config.index.max_bucket_span,
    }
}

fn cache_settings(config: &Config) -> CacheSettings {
    CacheSettings {
        ttl: config.cache.ttl(),
        sweep_interval: config.cache.sweep_interval(),
    }
}

pub struct Bastion {
    stores: Stores,
    index: Arc<SharedSpatialIndex>,
    priority: PriorityResolver,
    permissions: PermissionService,
    max_depth: u8,
    /// Held from placement check through index rebuild.
    mutations: Mutex<()>,
}

impl Bastion {
    pub fn new(stores: Stores, config: &Config) -> Result<Self, BastionError> {
        Self::with_clock(stores, config, Arc::new(SystemClock))
    }

    /// Build over `stores`, with cache freshness measured by `clock`.
    pub fn with_clock(
        stores: Stores,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BastionError> {
        let index = Arc::new(SharedSpatialIndex::new(index_settings(config)));
        index.rebuild(stores.regions.as_ref())?;

        let cache = Arc::new(CacheLayer::new(cache_settings(config), clock));
        let admins = Arc::new(AdminSet::new(
            config.permissions.admins.iter().map(PlayerId::new),
        ));
        let permissions = PermissionService::new(stores.clone(), cache, admins);
        let priority = PriorityResolver::new(stores.regions.clone(), index.clone());

        Ok(Self {
            stores,
            index,
            priority,
            permissions,
            max_depth: config.permissions.max_depth,
            mutations: Mutex::new(()),
        })
    }

    /// A fresh instance over an empty [`MemoryStore`].
    pub fn in_memory(config: &Config) -> Result<(Arc<MemoryStore>, Self), BastionError> {
        let store = Arc::new(MemoryStore::new());
        let bastion = Self::new(Stores::from_shared(store.clone()), config)?;
        Ok((store, bastion))
    }

    /// An in-memory instance seeded from `fixture`.
    pub fn from_fixture(fixture: &WorldFixture, config: &Config) -> Result<Self, BastionError> {
        let (_, bastion) = Self::in_memory(config)?;
        bastion.load_fixture(fixture)?;
        Ok(bastion)
    }

    /// Write everything in `fixture` through the normal validation paths.
    pub fn load_fixture(&self, fixture: &WorldFixture) -> Result<(), BastionError> {
        let admins = self.permissions.resolver().admins();
        for admin in &fixture.admins {
            admins.grant(admin.clone());
        }
        for group in &fixture.groups {
            self.permissions.define_group(group.clone())?;
        }
        self.permissions
            .set_system_default(fixture.system_default.clone())?;

        {
            let _mutating = self.mutations.lock();
            for region in fixture.creation_order()? {
                self.insert_region(region.clone())?;
            }
            self.rebuild_index()?;
        }

        for grant in &fixture.grants {
            self.permissions
                .set_player_grant(&grant.player, &grant.region, grant.group.clone())?;
        }
        Ok(())
    }

    pub fn permissions(&self) -> &PermissionService {
        &self.permissions
    }

    pub fn index(&self) -> &Arc<SharedSpatialIndex> {
        &self.index
    }

    pub fn create_region(&self, region: Region) -> Result<(), BastionError> {
        let _mutating = self.mutations.lock();
        self.insert_region(region)?;
        self.rebuild_index()
    }

    /// Move or reshape a region. Its parent and children must still contain
    /// or fit inside it afterwards.
    pub fn resize_region(&self, id: &RegionId, bounds: RegionBox) -> Result<Region, BastionError> {
        let _mutating = self.mutations.lock();
        let existing = self.stores.regions.get_all()?;
        let current = existing
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| BastionError::UnknownRegion(id.clone()))?;
        let resized = Region {
            bounds,
            ..current.clone()
        };
        validate_placement(&resized, &existing, self.max_depth)?;

        self.stores.regions.put(resized.clone())?;
        tracing::info!(region = %id, ?bounds, "region resized");
        self.rebuild_index()?;
        Ok(resized)
    }

    /// Delete a region and every sub-region beneath it, along with their
    /// grants. Returns the deleted ids, the requested region first.
    pub fn delete_region(&self, id: &RegionId) -> Result<Vec<RegionId>, BastionError> {
        let _mutating = self.mutations.lock();
        let existing = self.stores.regions.get_all()?;
        if !existing.iter().any(|r| &r.id == id) {
            return Err(BastionError::UnknownRegion(id.clone()));
        }

        let mut doomed = vec![id.clone()];
        let mut next = 0;
        while next < doomed.len() {
            let children: Vec<RegionId> = existing
                .iter()
                .filter(|r| r.parent.as_ref() == Some(&doomed[next]) && !doomed.contains(&r.id))
                .map(|r| r.id.clone())
                .collect();
            doomed.extend(children);
            next += 1;
        }

        // Children first, so no record ever points at a missing parent.
        for region in doomed.iter().rev() {
            self.stores.regions.remove(region)?;
            self.permissions.forget_region(region)?;
        }
        tracing::info!(region = %id, removed = doomed.len(), "region deleted");
        self.rebuild_index()?;
        Ok(doomed)
    }

    /// Regions containing `point`, highest priority first.
    pub fn regions_at(&self, point: WorldPoint) -> Vec<RegionMatch> {
        self.priority.resolve(point)
    }

    pub fn check(&self, player: &PlayerId, region: &RegionId, permission: &str) -> bool {
        self.permissions.check(player, region, permission)
    }

    /// Decide `permission` for `player` at `point`.
    ///
    /// Regions containing the point are consulted innermost first; the first
    /// one with a rule that applies decides. When none has one, the system
    /// default decides on behalf of the innermost region.
    pub fn check_at(&self, player: &PlayerId, point: WorldPoint, permission: &str) -> Verdict {
        let candidates = match self.priority.try_resolve(point) {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::warn!(%point, %err, "region store unavailable, denying");
                return Verdict::Unavailable;
            }
        };
        let Some(innermost) = candidates.first() else {
            return Verdict::Unclaimed;
        };

        let resolver = self.permissions.resolver();
        let mut reached_default = false;
        for candidate in &candidates {
            match resolver.evaluate_chain(player, &candidate.id, permission) {
                Ok(Some(decision)) => {
                    return Verdict::Claimed {
                        region: candidate.id.clone(),
                        decision,
                    };
                }
                Ok(None) => reached_default = true,
                Err(decision) if decision.step == Step::UnknownRegion => {
                    tracing::warn!(region = %candidate.id, "candidate vanished during check");
                }
                Err(decision) => {
                    return Verdict::Claimed {
                        region: candidate.id.clone(),
                        decision,
                    };
                }
            }
        }

        let decision = if reached_default {
            resolver.system_default(permission)
        } else {
            Decision::deny(Step::UnknownRegion)
        };
        Verdict::Claimed {
            region: innermost.id.clone(),
            decision,
        }
    }

    fn insert_region(&self, region: Region) -> Result<(), BastionError> {
        let existing = self.stores.regions.get_all()?;
        if existing.iter().any(|r| r.id == region.id) {
            return Err(BastionError::DuplicateRegion(region.id));
        }
        validate_placement(&region, &existing, self.max_depth)?;
        tracing::info!(region = %region.id, owner = %region.owner, "region created");
        self.stores.regions.put(region)?;
        Ok(())
    }

    fn rebuild_index(&self) -> Result<(), BastionError> {
        let index = self.index.rebuild(self.stores.regions.as_ref())?;
        let stats = index.stats();
        tracing::debug!(
            regions = stats.regions,
            skipped = stats.skipped,
            overflow = stats.overflow,
            cells = stats.cells,
            "spatial index rebuilt"
        );
        Ok(())
    }
}
