//! Bucketed lookup from horizontal cell to the regions whose footprint
//! covers it.
//!
//! The vertical axis is not bucketed: a region occupies every cell its x/z
//! extent spans, whatever its height. The index is derived data and is only
//! ever built whole from the full region set.

use bastion_geometry::{PartitionId, WorldPoint};
use bastion_region::{Region, RegionId};
use rustc_hash::FxHashMap;

/// Tuning for [`SpatialIndex::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSettings {
    /// Edge length of a bucket in blocks. Zero is treated as one.
    pub bucket_size: u32,
    /// Regions spanning more buckets than this on either horizontal axis are
    /// not bucketed. They go on their partition's overflow list, which every
    /// query in that partition scans.
    pub max_bucket_span: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            bucket_size: 16,
            max_bucket_span: 4096,
        }
    }
}

/// Horizontal cell coordinate: `floor(coord / bucket_size)` on x and z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub x: i32,
    pub z: i32,
}

impl BucketKey {
    pub fn containing(x: i32, z: i32, bucket_size: u32) -> Self {
        let size = bucket_size.max(1) as i64;
        Self {
            x: i64::from(x).div_euclid(size) as i32,
            z: i64::from(z).div_euclid(size) as i32,
        }
    }
}

/// Summary figures for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub regions: usize,
    pub skipped: usize,
    /// Indexed regions too wide to bucket.
    pub overflow: usize,
    pub cells: usize,
    pub entries: usize,
}

/// `partition -> cell -> region ids`, ids in ascending order within a cell.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    partitions: FxHashMap<PartitionId, FxHashMap<BucketKey, Vec<RegionId>>>,
    /// Regions wider than `max_bucket_span`, ascending, per partition.
    overflow: FxHashMap<PartitionId, Vec<RegionId>>,
    settings: IndexSettings,
    stats: IndexStats,
}

impl SpatialIndex {
    /// An index that answers every query with nothing.
    pub fn empty(settings: IndexSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Build from every region. Malformed regions are skipped with a
    /// warning; building never fails.
    pub fn build<'a>(
        regions: impl IntoIterator<Item = &'a Region>,
        settings: IndexSettings,
    ) -> Self {
        let mut index = Self::empty(settings);
        let mut sorted: Vec<&Region> = regions.into_iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        for region in sorted {
            if index.insert(region) {
                index.stats.regions += 1;
            } else {
                index.stats.skipped += 1;
            }
        }
        index.stats.cells = index.partitions.values().map(FxHashMap::len).sum();
        tracing::debug!(
            regions = index.stats.regions,
            skipped = index.stats.skipped,
            overflow = index.stats.overflow,
            cells = index.stats.cells,
            "spatial index built"
        );
        index
    }

    fn insert(&mut self, region: &Region) -> bool {
        let bounds = &region.bounds;
        if !bounds.is_normalized() {
            tracing::warn!(region = %region.id, "skipping region with malformed bounds");
            return false;
        }
        let size = self.settings.bucket_size;
        let lo = BucketKey::containing(bounds.min.x(), bounds.min.z(), size);
        let hi = BucketKey::containing(bounds.max.x(), bounds.max.z(), size);
        let span_x = i64::from(hi.x) - i64::from(lo.x) + 1;
        let span_z = i64::from(hi.z) - i64::from(lo.z) + 1;
        let max_span = i64::from(self.settings.max_bucket_span);
        if span_x > max_span || span_z > max_span {
            tracing::warn!(
                region = %region.id,
                span_x,
                span_z,
                max_span,
                "region spans too many buckets, scanning it on every query"
            );
            self.overflow
                .entry(bounds.partition)
                .or_default()
                .push(region.id.clone());
            self.stats.overflow += 1;
            return true;
        }

        let cells = self.partitions.entry(bounds.partition).or_default();
        for bx in lo.x..=hi.x {
            for bz in lo.z..=hi.z {
                cells
                    .entry(BucketKey { x: bx, z: bz })
                    .or_default()
                    .push(region.id.clone());
                self.stats.entries += 1;
            }
        }
        true
    }

    /// Candidate region ids for `point`, in ascending order. Callers still
    /// need to test each candidate's box: a region can touch a bucket without
    /// covering all of it.
    pub fn query(&self, point: WorldPoint) -> Vec<&RegionId> {
        let key = BucketKey::containing(point.pos.x(), point.pos.z(), self.settings.bucket_size);
        let cell = self
            .partitions
            .get(&point.partition)
            .and_then(|cells| cells.get(&key))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let wide = self
            .overflow
            .get(&point.partition)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut ids: Vec<&RegionId> = cell.iter().chain(wide).collect();
        if !wide.is_empty() {
            ids.sort();
        }
        ids
    }

    pub fn settings(&self) -> IndexSettings {
        self.settings
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }
}
