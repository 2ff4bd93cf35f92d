//! Geometric rules a region must satisfy before it is created or resized.

use bastion_geometry::{box_contains, boxes_overlap};
use rustc_hash::FxHashMap;

use crate::{MAX_SUBREGION_DEPTH, Region, RegionId, hierarchy_depth};

/// Why a region cannot be placed where requested.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("region {0} has min > max on some axis")]
    Malformed(RegionId),

    #[error("region {0} is its own parent")]
    SelfParent(RegionId),

    #[error("parent region {0} does not exist")]
    MissingParent(RegionId),

    #[error("region {region} would sit at depth {depth}, max is {max}")]
    TooDeep {
        region: RegionId,
        depth: u8,
        max: u8,
    },

    #[error("region {region} does not fit inside parent {parent}")]
    OutsideParent { region: RegionId, parent: RegionId },

    #[error("sub-region {child} would no longer fit inside {region}")]
    ChildOutside { region: RegionId, child: RegionId },

    #[error("region {region} overlaps unrelated region {other}")]
    Overlaps { region: RegionId, other: RegionId },
}

/// Check `candidate` against every other region.
///
/// `existing` may contain a previous version of `candidate` (a resize); it is
/// ignored. Overlap is only allowed along a direct ancestor/descendant line.
pub fn validate_placement(
    candidate: &Region,
    existing: &[Region],
    max_depth: u8,
) -> Result<(), PlacementError> {
    let max_depth = max_depth.min(MAX_SUBREGION_DEPTH);
    if !candidate.bounds.is_normalized() {
        return Err(PlacementError::Malformed(candidate.id.clone()));
    }

    let others: FxHashMap<&RegionId, &Region> = existing
        .iter()
        .filter(|r| r.id != candidate.id)
        .map(|r| (&r.id, r))
        .collect();
    let lookup = |id: &RegionId| -> Option<Region> {
        if id == &candidate.id {
            Some(candidate.clone())
        } else {
            others.get(id).map(|r| (*r).clone())
        }
    };

    if let Some(parent_id) = &candidate.parent {
        if parent_id == &candidate.id {
            return Err(PlacementError::SelfParent(candidate.id.clone()));
        }
        let parent = others
            .get(parent_id)
            .ok_or_else(|| PlacementError::MissingParent(parent_id.clone()))?;
        let depth = hierarchy_depth(candidate, lookup);
        if depth > max_depth {
            return Err(PlacementError::TooDeep {
                region: candidate.id.clone(),
                depth,
                max: max_depth,
            });
        }
        if !box_contains(&candidate.bounds, &parent.bounds) {
            return Err(PlacementError::OutsideParent {
                region: candidate.id.clone(),
                parent: parent_id.clone(),
            });
        }
    }

    for other in others.values() {
        if other.parent.as_ref() == Some(&candidate.id)
            && !box_contains(&other.bounds, &candidate.bounds)
        {
            return Err(PlacementError::ChildOutside {
                region: candidate.id.clone(),
                child: other.id.clone(),
            });
        }
        if boxes_overlap(&candidate.bounds, &other.bounds)
            && !is_ancestor(&other.id, candidate, lookup)
            && !is_ancestor(&candidate.id, other, lookup)
        {
            return Err(PlacementError::Overlaps {
                region: candidate.id.clone(),
                other: other.id.clone(),
            });
        }
    }
    Ok(())
}

fn is_ancestor(
    ancestor: &RegionId,
    region: &Region,
    lookup: impl Fn(&RegionId) -> Option<Region>,
) -> bool {
    let mut next = region.parent.clone();
    for _ in 0..=MAX_SUBREGION_DEPTH {
        let Some(id) = next else {
            return false;
        };
        if &id == ancestor {
            return true;
        }
        next = lookup(&id).and_then(|r| r.parent);
    }
    false
}

#[cfg(test)]
mod tests {
    use bastion_geometry::{BlockPos, PartitionId, RegionBox};

    use super::*;

    fn bounds(lo: (i32, i32, i32), hi: (i32, i32, i32)) -> RegionBox {
        RegionBox::new(
            PartitionId(0),
            BlockPos::new(lo.0, lo.1, lo.2),
            BlockPos::new(hi.0, hi.1, hi.2),
        )
    }

    fn world() -> Vec<Region> {
        vec![
            Region::root("r1", "alice", bounds((0, 0, 0), (10, 10, 10))),
            Region::child_of("r2", "r1", "alice", bounds((2, 0, 2), (5, 10, 5))),
        ]
    }

    #[test]
    fn test_disjoint_root_is_accepted() {
        let r = Region::root("r3", "bob", bounds((20, 0, 20), (30, 10, 30)));
        assert_eq!(validate_placement(&r, &world(), 2), Ok(()));
    }

    #[test]
    fn test_overlapping_root_is_rejected() {
        let r = Region::root("r3", "bob", bounds((8, 0, 8), (30, 10, 30)));
        assert_eq!(
            validate_placement(&r, &world(), 2),
            Err(PlacementError::Overlaps {
                region: RegionId::from("r3"),
                other: RegionId::from("r1"),
            })
        );
    }

    #[test]
    fn test_grandchild_inside_chain_is_accepted() {
        let r = Region::child_of("r3", "r2", "alice", bounds((3, 0, 3), (4, 4, 4)));
        assert_eq!(validate_placement(&r, &world(), 2), Ok(()));
    }

    #[test]
    fn test_great_grandchild_is_too_deep() {
        let mut regions = world();
        regions.push(Region::child_of("r3", "r2", "alice", bounds((3, 0, 3), (4, 4, 4))));
        let r = Region::child_of("r4", "r3", "alice", bounds((3, 0, 3), (3, 1, 3)));
        assert!(matches!(
            validate_placement(&r, &regions, 2),
            Err(PlacementError::TooDeep { depth: 3, .. })
        ));
    }

    #[test]
    fn test_child_must_fit_parent() {
        let r = Region::child_of("r3", "r1", "alice", bounds((8, 0, 8), (12, 4, 12)));
        assert!(matches!(
            validate_placement(&r, &world(), 2),
            Err(PlacementError::OutsideParent { .. })
        ));
    }

    #[test]
    fn test_sibling_overlap_is_rejected() {
        let r = Region::child_of("r3", "r1", "alice", bounds((4, 0, 4), (8, 4, 8)));
        assert!(matches!(
            validate_placement(&r, &world(), 2),
            Err(PlacementError::Overlaps { .. })
        ));
    }

    #[test]
    fn test_missing_parent() {
        let r = Region::child_of("r3", "nope", "alice", bounds((4, 0, 4), (8, 4, 8)));
        assert_eq!(
            validate_placement(&r, &world(), 2),
            Err(PlacementError::MissingParent(RegionId::from("nope")))
        );
    }

    #[test]
    fn test_shrinking_parent_below_child_is_rejected() {
        let shrunk = Region::root("r1", "alice", bounds((0, 0, 0), (3, 10, 3)));
        assert!(matches!(
            validate_placement(&shrunk, &world(), 2),
            Err(PlacementError::ChildOutside { .. })
        ));
    }

    #[test]
    fn test_resize_ignores_previous_self() {
        let grown = Region::root("r1", "alice", bounds((-5, 0, -5), (15, 10, 15)));
        assert_eq!(validate_placement(&grown, &world(), 2), Ok(()));
    }

    #[test]
    fn test_malformed_box() {
        let mut r = Region::root("r3", "bob", bounds((20, 0, 20), (30, 10, 30)));
        std::mem::swap(&mut r.bounds.min, &mut r.bounds.max);
        assert_eq!(
            validate_placement(&r, &world(), 2),
            Err(PlacementError::Malformed(RegionId::from("r3")))
        );
    }
}
