use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::Result;
use crate::mock::{Mock, MockType};

/// Counts reported for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockCounts {
    pub total: usize,
    pub config: usize,
    pub data: usize,
}

/// The store contract the engine consumes.
///
/// Implementations must serialize the operations; the matcher tolerates
/// losing an update race by re-reading the snapshot and failing the
/// in-flight command.
#[async_trait]
pub trait MockStore: Send + Sync {
    /// Snapshot of every mock still carrying `is_filtered = true`, config
    /// mocks included. Order is arbitrary; callers select.
    async fn get_unfiltered_mocks(&self) -> Result<Vec<Arc<Mock>>>;

    /// Compare-and-swap consumption: replace `old` (which must still be the
    /// live, unconsumed instance) with `new`, stamping the next sort order.
    /// Returns false when a racing matcher already consumed `old`.
    async fn update_unfiltered_mock(&self, old: &Arc<Mock>, new: Mock) -> bool;

    /// Remove a mock outright (one-shot full-auth handshakes).
    async fn delete_unfiltered_mock(&self, mock: &Arc<Mock>) -> bool;

    /// Totals for logging and post-mortem.
    async fn get_mysql_counts(&self) -> MockCounts;
}

/// The in-memory store used for a replay session: a single mutex around the
/// mock set, snapshots taken under the lock and processed outside it.
#[derive(Debug, Default)]
pub struct InMemoryMockStore {
    mocks: Mutex<Vec<Arc<Mock>>>,
    consumed: AtomicU64,
}

impl InMemoryMockStore {
    pub fn new(mocks: Vec<Mock>) -> Self {
        Self {
            mocks: Mutex::new(mocks.into_iter().map(Arc::new).collect()),
            consumed: AtomicU64::new(0),
        }
    }

    /// Mocks consumed so far, in consumption order. This is the surface
    /// external reporting reads `sort_order` through.
    pub fn consumed_mocks(&self) -> Vec<Arc<Mock>> {
        let mut consumed: Vec<Arc<Mock>> = self
            .lock()
            .iter()
            .filter(|mock| !mock.is_filtered)
            .cloned()
            .collect();
        consumed.sort_by_key(|mock| mock.sort_order);

        consumed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<Mock>>> {
        // a poisoned lock means a panic mid-snapshot; the data itself is
        // still a consistent Vec
        self.mocks.lock().unwrap_or_else(|err| err.into_inner())
    }
}

#[async_trait]
impl MockStore for InMemoryMockStore {
    async fn get_unfiltered_mocks(&self) -> Result<Vec<Arc<Mock>>> {
        Ok(self
            .lock()
            .iter()
            .filter(|mock| mock.is_filtered)
            .cloned()
            .collect())
    }

    async fn update_unfiltered_mock(&self, old: &Arc<Mock>, new: Mock) -> bool {
        let mut mocks = self.lock();

        let Some(slot) = mocks
            .iter_mut()
            .find(|existing| Arc::ptr_eq(existing, old) && existing.is_filtered)
        else {
            return false;
        };

        let mut new = new;
        new.is_filtered = false;
        new.sort_order = self.consumed.fetch_add(1, Ordering::SeqCst) + 1;
        *slot = Arc::new(new);

        true
    }

    async fn delete_unfiltered_mock(&self, mock: &Arc<Mock>) -> bool {
        let mut mocks = self.lock();

        let before = mocks.len();
        mocks.retain(|existing| !Arc::ptr_eq(existing, mock));

        mocks.len() != before
    }

    async fn get_mysql_counts(&self) -> MockCounts {
        let mocks = self.lock();

        let config = mocks
            .iter()
            .filter(|mock| mock.mock_type() == MockType::Config)
            .count();

        MockCounts {
            total: mocks.len(),
            config,
            data: mocks.len() - config,
        }
    }
}
