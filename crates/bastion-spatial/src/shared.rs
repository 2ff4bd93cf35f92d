use std::sync::Arc;

use bastion_region::{RegionStore, StoreError};
use parking_lot::{Mutex, RwLock};

use crate::{IndexSettings, SpatialIndex};

/// The published spatial index.
///
/// Rebuilds happen outside the read lock; that lock is only held to clone or
/// replace the `Arc`, so readers see either the old index or the new one.
/// Writers take `writer` for the whole read-build-publish sequence, so an
/// index built from an older store read is never published over a newer one.
pub struct SharedSpatialIndex {
    current: RwLock<Arc<SpatialIndex>>,
    writer: Mutex<()>,
    settings: IndexSettings,
}

impl SharedSpatialIndex {
    pub fn new(settings: IndexSettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(SpatialIndex::empty(settings))),
            writer: Mutex::new(()),
            settings,
        }
    }

    /// The index as of now. Holding the snapshot does not block rebuilds.
    pub fn snapshot(&self) -> Arc<SpatialIndex> {
        Arc::clone(&self.current.read())
    }

    pub fn publish(&self, index: SpatialIndex) -> Arc<SpatialIndex> {
        let _writer = self.writer.lock();
        self.swap(index)
    }

    /// Rebuild from every region in `store` and publish the result.
    ///
    /// Concurrent rebuilds run one at a time. If the store cannot be read
    /// the last good index stays published.
    pub fn rebuild(&self, store: &dyn RegionStore) -> Result<Arc<SpatialIndex>, StoreError> {
        let _writer = self.writer.lock();
        let regions = store.get_all().inspect_err(|err| {
            tracing::warn!(%err, "region store unreadable, keeping previous spatial index");
        })?;
        let index = SpatialIndex::build(regions.iter(), self.settings);
        tracing::debug!(regions = regions.len(), "publishing rebuilt spatial index");
        Ok(self.swap(index))
    }

    fn swap(&self, index: SpatialIndex) -> Arc<SpatialIndex> {
        let index = Arc::new(index);
        *self.current.write() = Arc::clone(&index);
        index
    }

    pub fn settings(&self) -> IndexSettings {
        self.settings
    }
}
