//! Whole-system behavior through the `Bastion` API.

use std::sync::Arc;
use std::time::Duration;

use bastion_app::{Bastion, BastionError, Verdict, WorldFixture};
use bastion_config::Config;
use bastion_geometry::{BlockPos, PartitionId, RegionBox, WorldPoint};
use bastion_perms::{Decision, ManualClock, Step};
use bastion_region::{
    MemoryStore, PermissionGroup, PlacementError, PlayerId, Region, RegionDefaultStore, RegionId,
    RegionStore, Stores,
};

fn bounds(lo: (i32, i32, i32), hi: (i32, i32, i32)) -> RegionBox {
    RegionBox::new(
        PartitionId(0),
        BlockPos::new(lo.0, lo.1, lo.2),
        BlockPos::new(hi.0, hi.1, hi.2),
    )
}

fn at(x: i32, y: i32, z: i32) -> WorldPoint {
    WorldPoint::new(PartitionId(0), BlockPos::new(x, y, z))
}

fn player(name: &str) -> PlayerId {
    PlayerId::from(name)
}

fn region(id: &str) -> RegionId {
    RegionId::from(id)
}

/// R1 (0,0,0)-(10,10,10) contains R2 (2,0,2)-(5,10,5), both owned by alice.
/// Groups `builder = {break}` and `visitor = {}`; empty system default.
fn scenario() -> (Arc<MemoryStore>, Bastion) {
    let (store, bastion) = Bastion::in_memory(&Config::default()).unwrap();
    bastion
        .create_region(Region::root("R1", "alice", bounds((0, 0, 0), (10, 10, 10))))
        .unwrap();
    bastion
        .create_region(Region::child_of("R2", "R1", "alice", bounds((2, 0, 2), (5, 10, 5))))
        .unwrap();

    let permissions = bastion.permissions();
    permissions
        .define_group(PermissionGroup::new("alice", "builder", ["break"]))
        .unwrap();
    permissions
        .define_group(PermissionGroup::new("alice", "visitor", [] as [&str; 0]))
        .unwrap();
    (store, bastion)
}

#[test]
fn test_region_default_then_grant_override() {
    let (_, bastion) = scenario();
    let bob = player("bob");

    assert!(!bastion.check(&bob, &region("R2"), "break"));

    bastion
        .permissions()
        .set_region_default(&region("R2"), Some("builder".into()))
        .unwrap();
    assert!(bastion.check(&bob, &region("R2"), "break"));

    bastion
        .permissions()
        .set_player_grant(&bob, &region("R2"), "visitor".into())
        .unwrap();
    assert!(!bastion.check(&bob, &region("R2"), "break"));
}

#[test]
fn test_check_at_uses_innermost_region() {
    let (_, bastion) = scenario();
    bastion
        .permissions()
        .set_region_default(&region("R2"), Some("builder".into()))
        .unwrap();

    let inner = bastion.check_at(&player("bob"), at(3, 5, 3), "break");
    assert_eq!(
        inner,
        Verdict::Claimed {
            region: region("R2"),
            decision: Decision::allow(Step::SubRegionDefault),
        }
    );

    let outer = bastion.check_at(&player("bob"), at(8, 5, 8), "break");
    assert_eq!(outer.region(), Some(&region("R1")));
    assert!(!outer.allowed());

    let outside = bastion.check_at(&player("bob"), at(20, 5, 20), "break");
    assert_eq!(outside, Verdict::Unclaimed);
    assert!(outside.allowed());
}

#[test]
fn test_check_at_falls_through_to_outer_candidates() {
    let (_, bastion) = scenario();
    bastion
        .create_region(Region::child_of("R3", "R2", "carol", bounds((3, 0, 3), (4, 10, 4))))
        .unwrap();
    bastion
        .permissions()
        .set_region_default(&region("R1"), Some("builder".into()))
        .unwrap();

    // R3's own chain only reaches R2; R1's default is found through R2.
    let verdict = bastion.check_at(&player("bob"), at(3, 5, 3), "break");
    assert_eq!(
        verdict,
        Verdict::Claimed {
            region: region("R2"),
            decision: Decision::allow(Step::ParentDefault),
        }
    );
}

#[test]
fn test_check_at_system_default_attributed_to_innermost() {
    let (_, bastion) = scenario();
    bastion
        .permissions()
        .set_system_default(["enter"].into_iter().collect())
        .unwrap();
    let verdict = bastion.check_at(&player("bob"), at(3, 5, 3), "enter");
    assert_eq!(
        verdict,
        Verdict::Claimed {
            region: region("R2"),
            decision: Decision::allow(Step::SystemDefault),
        }
    );
}

#[test]
fn test_regions_at_orders_by_depth() {
    let (_, bastion) = scenario();
    let ids: Vec<_> = bastion
        .regions_at(at(2, 0, 5))
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec![region("R2"), region("R1")]);
}

#[test]
fn test_create_rejects_overlap_and_duplicates() {
    let (_, bastion) = scenario();
    let overlapping = Region::root("R9", "mallory", bounds((9, 0, 9), (20, 10, 20)));
    assert!(matches!(
        bastion.create_region(overlapping),
        Err(BastionError::Placement(PlacementError::Overlaps { .. }))
    ));

    let duplicate = Region::root("R1", "mallory", bounds((50, 0, 50), (60, 10, 60)));
    assert!(matches!(
        bastion.create_region(duplicate),
        Err(BastionError::DuplicateRegion(_))
    ));
    assert!(bastion.regions_at(at(55, 5, 55)).is_empty());
}

#[test]
fn test_new_region_is_indexed_immediately() {
    let (_, bastion) = scenario();
    bastion
        .create_region(Region::root("R5", "dave", bounds((-40, 0, -40), (-20, 10, -20))))
        .unwrap();
    let found = bastion.regions_at(at(-30, 0, -30));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, region("R5"));
}

#[test]
fn test_resize_moves_region_in_index() {
    let (_, bastion) = scenario();
    bastion
        .create_region(Region::root("R5", "dave", bounds((100, 0, 100), (110, 10, 110))))
        .unwrap();
    let resized = bastion
        .resize_region(&region("R5"), bounds((200, 0, 200), (210, 10, 210)))
        .unwrap();
    assert_eq!(resized.owner, player("dave"));
    assert!(bastion.regions_at(at(105, 5, 105)).is_empty());
    assert_eq!(bastion.regions_at(at(205, 5, 205))[0].id, region("R5"));
}

#[test]
fn test_resize_cannot_strand_sub_region() {
    let (_, bastion) = scenario();
    let shrunk = bastion.resize_region(&region("R1"), bounds((6, 0, 6), (10, 10, 10)));
    assert!(matches!(
        shrunk,
        Err(BastionError::Placement(PlacementError::ChildOutside { .. }))
    ));
    assert_eq!(bastion.regions_at(at(3, 5, 3)).len(), 2);
}

#[test]
fn test_resize_unknown_region() {
    let (_, bastion) = scenario();
    assert!(matches!(
        bastion.resize_region(&region("nope"), bounds((0, 0, 0), (1, 1, 1))),
        Err(BastionError::UnknownRegion(_))
    ));
}

#[test]
fn test_delete_cascades_to_sub_regions() {
    let (_, bastion) = scenario();
    bastion
        .create_region(Region::child_of("R3", "R2", "carol", bounds((3, 0, 3), (4, 10, 4))))
        .unwrap();
    bastion
        .permissions()
        .set_player_grant(&player("bob"), &region("R2"), "builder".into())
        .unwrap();

    let removed = bastion.delete_region(&region("R1")).unwrap();
    assert_eq!(removed, vec![region("R1"), region("R2"), region("R3")]);
    assert!(bastion.regions_at(at(3, 5, 3)).is_empty());
    assert_eq!(
        bastion.permissions().evaluate(&player("bob"), &region("R2"), "break"),
        Decision::deny(Step::UnknownRegion)
    );
    assert_eq!(bastion.check_at(&player("bob"), at(3, 5, 3), "break"), Verdict::Unclaimed);
}

#[test]
fn test_wide_region_is_claimed_everywhere() {
    let (_, bastion) = Bastion::in_memory(&Config::default()).unwrap();
    bastion
        .create_region(Region::root("big", "alice", bounds((0, 0, 0), (70_000, 255, 10))))
        .unwrap();

    for x in [5, 35_000, 70_000] {
        let verdict = bastion.check_at(&player("mallory"), at(x, 5, 5), "break");
        assert_eq!(verdict.region(), Some(&region("big")), "x = {x}");
        assert!(!verdict.allowed());
        assert_eq!(bastion.regions_at(at(x, 5, 5)).len(), 1);
    }
    assert_eq!(
        bastion.check_at(&player("mallory"), at(70_001, 5, 5), "break"),
        Verdict::Unclaimed
    );
    assert_eq!(bastion.index().snapshot().stats().overflow, 1);
}

#[test]
fn test_concurrent_creates_keep_regions_disjoint() {
    let (store, bastion) = Bastion::in_memory(&Config::default()).unwrap();
    let created: usize = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let bastion = &bastion;
                scope.spawn(move || {
                    let claim = Region::root(
                        format!("plot-{i}"),
                        "racer",
                        bounds((i, 0, i), (20 + i, 10, 20 + i)),
                    );
                    bastion.create_region(claim).is_ok()
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| usize::from(worker.join().unwrap()))
            .sum()
    });

    assert_eq!(created, 1);
    assert_eq!(store.get_all().unwrap().len(), 1);
    assert_eq!(bastion.regions_at(at(10, 5, 10)).len(), 1);
}

#[test]
fn test_store_outage_denies_in_claimed_land() {
    let (store, bastion) = scenario();
    store.set_online(false);
    let verdict = bastion.check_at(&player("alice"), at(3, 5, 3), "break");
    assert_eq!(verdict, Verdict::Unavailable);
    assert!(!verdict.allowed());
    let late = Region::root("R7", "x", bounds((90, 0, 90), (95, 5, 95)));
    assert!(bastion.create_region(late).is_err());
}

#[test]
fn test_unpatched_change_appears_after_ttl() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new());
    let bastion =
        Bastion::with_clock(Stores::from_shared(store.clone()), &Config::default(), clock.clone())
            .unwrap();
    bastion
        .create_region(Region::root("R1", "alice", bounds((0, 0, 0), (10, 10, 10))))
        .unwrap();
    bastion
        .permissions()
        .define_group(PermissionGroup::new("alice", "builder", ["break"]))
        .unwrap();

    assert!(!bastion.check(&player("bob"), &region("R1"), "break"));
    // Written behind the service's back: only expiry makes it visible.
    RegionDefaultStore::set(&*store, &region("R1"), Some("builder".into())).unwrap();
    assert!(!bastion.check(&player("bob"), &region("R1"), "break"));

    clock.advance(Duration::from_secs(301));
    assert!(bastion.check(&player("bob"), &region("R1"), "break"));
}

#[test]
fn test_config_drives_index_and_admins() {
    let mut config = Config::default();
    config.index.bucket_size = 32;
    config.permissions.admins = vec!["root".to_string()];
    let (_, bastion) = Bastion::in_memory(&config).unwrap();
    assert_eq!(bastion.index().settings().bucket_size, 32);

    bastion
        .create_region(Region::root("R1", "alice", bounds((0, 0, 0), (10, 10, 10))))
        .unwrap();
    assert_eq!(
        bastion.check_at(&player("root"), at(1, 1, 1), "break"),
        Verdict::Claimed {
            region: region("R1"),
            decision: Decision::allow(Step::GlobalAdmin),
        }
    );
}

#[test]
fn test_demo_world() {
    let fixture = WorldFixture::from_ron(include_str!("../fixtures/demo_world.ron")).unwrap();
    let bastion = Bastion::from_fixture(&fixture, &Config::default()).unwrap();

    // Citizens may open doors in town but not build.
    assert!(bastion.check_at(&player("frank"), at(0, 64, 0), "open_door").allowed());
    assert!(!bastion.check_at(&player("frank"), at(0, 64, 0), "break").allowed());
    // dave holds a builder grant on the town.
    assert!(bastion.check_at(&player("dave"), at(0, 64, 0), "break").allowed());
    // bob owns the workshop, alice owns the town around it.
    let workshop = at(15, 70, 15);
    assert_eq!(
        bastion.check_at(&player("bob"), workshop, "break"),
        Verdict::Claimed {
            region: region("workshop"),
            decision: Decision::allow(Step::RegionOwner),
        }
    );
    assert_eq!(
        bastion.check_at(&player("alice"), workshop, "break"),
        Verdict::Claimed {
            region: region("workshop"),
            decision: Decision::allow(Step::ParentOwner),
        }
    );
    // The farm is in another partition.
    let farm = WorldPoint::new(PartitionId(1), BlockPos::new(230, 10, 0));
    assert!(bastion.check_at(&player("erin"), farm, "harvest").allowed());
    assert!(!bastion.check_at(&player("frank"), farm, "harvest").allowed());
    assert!(bastion.check_at(&player("moderator"), farm, "harvest").allowed());
}
