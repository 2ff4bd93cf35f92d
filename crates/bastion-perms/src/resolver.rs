//! The permission resolution chain.
//!
//! A check walks [`CHAIN`] in order. Each step either does not apply (nothing
//! is configured for it, or what is configured points at a group that no
//! longer exists) or it decides. The first deciding step is final, whether it
//! allows or denies.

use std::fmt;
use std::sync::Arc;

use bastion_region::{GroupName, PlayerId, Region, RegionId, StoreError, Stores};
use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use crate::cache::CacheLayer;

/// The rule that produced a [`Decision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    GlobalAdmin,
    RegionOwner,
    ParentOwner,
    SubRegionGrant,
    SubRegionDefault,
    RegionGrant,
    ParentGrant,
    RegionDefault,
    ParentDefault,
    SystemDefault,
    /// The region does not exist or could not be read.
    UnknownRegion,
    /// The player identity is not usable.
    MalformedPlayer,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GlobalAdmin => "global admin",
            Self::RegionOwner => "region owner",
            Self::ParentOwner => "parent owner",
            Self::SubRegionGrant => "sub-region grant",
            Self::SubRegionDefault => "sub-region default group",
            Self::RegionGrant => "region grant",
            Self::ParentGrant => "parent grant",
            Self::RegionDefault => "region default group",
            Self::ParentDefault => "parent default group",
            Self::SystemDefault => "system default",
            Self::UnknownRegion => "unknown region",
            Self::MalformedPlayer => "malformed player",
        };
        f.write_str(name)
    }
}

/// Resolution order. Every step but the last may be inapplicable.
pub const CHAIN: [Step; 10] = [
    Step::GlobalAdmin,
    Step::RegionOwner,
    Step::ParentOwner,
    Step::SubRegionGrant,
    Step::SubRegionDefault,
    Step::RegionGrant,
    Step::ParentGrant,
    Step::RegionDefault,
    Step::ParentDefault,
    Step::SystemDefault,
];

/// Outcome of a check, with the step that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub step: Step,
}

impl Decision {
    pub fn allow(step: Step) -> Self {
        Self {
            allowed: true,
            step,
        }
    }

    pub fn deny(step: Step) -> Self {
        Self {
            allowed: false,
            step,
        }
    }
}

/// Players who bypass every region rule.
#[derive(Debug, Default)]
pub struct AdminSet {
    players: RwLock<FxHashSet<PlayerId>>,
}

impl AdminSet {
    pub fn new(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            players: RwLock::new(players.into_iter().collect()),
        }
    }

    pub fn contains(&self, player: &PlayerId) -> bool {
        self.players.read().contains(player)
    }

    pub fn grant(&self, player: PlayerId) -> bool {
        self.players.write().insert(player)
    }

    pub fn revoke(&self, player: &PlayerId) -> bool {
        self.players.write().remove(player)
    }
}

/// The region under check and, for sub-regions, its parent.
struct Subject {
    region: Region,
    parent: Option<Region>,
}

#[derive(Clone)]
pub struct PermissionResolver {
    stores: Stores,
    cache: Arc<CacheLayer>,
    admins: Arc<AdminSet>,
}

impl PermissionResolver {
    pub fn new(stores: Stores, cache: Arc<CacheLayer>, admins: Arc<AdminSet>) -> Self {
        Self {
            stores,
            cache,
            admins,
        }
    }

    pub fn cache(&self) -> &Arc<CacheLayer> {
        &self.cache
    }

    pub fn admins(&self) -> &Arc<AdminSet> {
        &self.admins
    }

    /// May `player` do `permission` in `region`?
    pub fn check(&self, player: &PlayerId, region: &RegionId, permission: &str) -> bool {
        self.evaluate(player, region, permission).allowed
    }

    /// Run the full chain, ending at the system default.
    pub fn evaluate(&self, player: &PlayerId, region: &RegionId, permission: &str) -> Decision {
        match self.evaluate_chain(player, region, permission) {
            Ok(Some(decision)) => decision,
            Ok(None) => self.system_default(permission),
            Err(decision) => decision,
        }
    }

    /// The last-resort decision, used when no region rule applies.
    pub fn system_default(&self, permission: &str) -> Decision {
        Decision {
            allowed: self.system_default_allows(permission),
            step: Step::SystemDefault,
        }
    }

    /// Run every region-level step, stopping short of the system default.
    ///
    /// `Ok(None)` means no region rule applied. `Err` carries the deny for an
    /// unknown region or malformed player.
    pub fn evaluate_chain(
        &self,
        player: &PlayerId,
        region: &RegionId,
        permission: &str,
    ) -> Result<Option<Decision>, Decision> {
        self.cache.maybe_sweep();

        if !player.is_well_formed() {
            tracing::warn!(player = %player, "permission check with malformed player id");
            return Err(Decision::deny(Step::MalformedPlayer));
        }
        let subject = self
            .load_subject(region)
            .ok_or(Decision::deny(Step::UnknownRegion))?;

        let decided = CHAIN[..CHAIN.len() - 1]
            .iter()
            .find_map(|step| self.apply(*step, &subject, player, permission));
        if let Some(decision) = decided {
            tracing::trace!(
                player = %player,
                region = %region,
                permission,
                step = %decision.step,
                allowed = decision.allowed,
                "permission resolved"
            );
        }
        Ok(decided)
    }

    fn load_subject(&self, id: &RegionId) -> Option<Subject> {
        let region = match self.stores.regions.get(id) {
            Ok(Some(region)) => region,
            Ok(None) => {
                tracing::debug!(region = %id, "check against unknown region");
                return None;
            }
            Err(err) => {
                tracing::warn!(region = %id, %err, "region lookup failed, denying");
                return None;
            }
        };
        let parent = region.parent.as_ref().and_then(|parent_id| {
            match self.stores.regions.get(parent_id) {
                Ok(Some(parent)) => Some(parent),
                Ok(None) => {
                    tracing::warn!(
                        region = %id,
                        parent = %parent_id,
                        "parent region missing, skipping parent rules"
                    );
                    None
                }
                Err(err) => {
                    tracing::warn!(
                        region = %id,
                        parent = %parent_id,
                        %err,
                        "parent lookup failed, skipping parent rules"
                    );
                    None
                }
            }
        });
        Some(Subject { region, parent })
    }

    fn apply(
        &self,
        step: Step,
        subject: &Subject,
        player: &PlayerId,
        permission: &str,
    ) -> Option<Decision> {
        let region = &subject.region;
        let parent = subject.parent.as_ref();
        let sub_region = region.is_sub_region();

        match step {
            Step::GlobalAdmin => self.admins.contains(player).then(|| Decision::allow(step)),
            Step::RegionOwner => (&region.owner == player).then(|| Decision::allow(step)),
            Step::ParentOwner => parent
                .filter(|p| &p.owner == player)
                .map(|_| Decision::allow(step)),
            Step::SubRegionGrant if sub_region => {
                self.grant_rule(step, player, &region.id, permission)
            }
            Step::SubRegionDefault if sub_region => {
                self.default_rule(step, &region.id, permission)
            }
            Step::RegionGrant => self.grant_rule(step, player, &region.id, permission),
            Step::ParentGrant => {
                parent.and_then(|p| self.grant_rule(step, player, &p.id, permission))
            }
            Step::RegionDefault => self.default_rule(step, &region.id, permission),
            Step::ParentDefault => parent.and_then(|p| self.default_rule(step, &p.id, permission)),
            Step::SystemDefault => Some(self.system_default(permission)),
            Step::SubRegionGrant
            | Step::SubRegionDefault
            | Step::UnknownRegion
            | Step::MalformedPlayer => None,
        }
    }

    fn grant_rule(
        &self,
        step: Step,
        player: &PlayerId,
        region: &RegionId,
        permission: &str,
    ) -> Option<Decision> {
        let group = self
            .cache
            .player_grant(player, region, || self.stores.grants.get(player, region))
            .inspect_err(|err| tracing::warn!(%player, %region, %err, "grant lookup failed"))
            .ok()??;
        self.group_rule(step, &group, permission)
    }

    fn default_rule(&self, step: Step, region: &RegionId, permission: &str) -> Option<Decision> {
        let group = self
            .cache
            .region_default(region, || self.stores.region_defaults.get(region))
            .inspect_err(|err| tracing::warn!(%region, %err, "default group lookup failed"))
            .ok()??;
        self.group_rule(step, &group, permission)
    }

    /// Membership test against `group`; `None` if the group is dangling.
    fn group_rule(&self, step: Step, group: &GroupName, permission: &str) -> Option<Decision> {
        let resolved: Result<_, StoreError> = self
            .cache
            .group(group, || self.stores.groups.resolve_by_name(group));
        match resolved {
            Ok(Some(found)) => Some(Decision {
                allowed: found.allows(permission),
                step,
            }),
            Ok(None) => {
                tracing::warn!(%group, %step, "group reference is dangling, skipping step");
                None
            }
            Err(err) => {
                tracing::warn!(%group, %step, %err, "group lookup failed, skipping step");
                None
            }
        }
    }

    fn system_default_allows(&self, permission: &str) -> bool {
        match self
            .cache
            .system_default(|| self.stores.system_default.get())
        {
            Ok(set) => set.allows(permission),
            Err(err) => {
                tracing::warn!(%err, "system default unavailable, denying");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
