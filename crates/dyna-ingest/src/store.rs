//! Persistence seam for dataset records.
//!
//! The pipeline only needs to create records and look them up again; the
//! concrete backend lives with the caller. [`InMemoryDatasetStore`] backs the
//! CLI and the tests.

use crate::error::{PipelineError, Result};
use crate::types::{DatasetRecord, NewDataset};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Record store used by [`DatasetProcessor`](crate::pipeline::DatasetProcessor).
///
/// Implementations must serialize their own writes; the processor may be
/// shared across threads.
pub trait DatasetStore: Send + Sync {
    /// Persist a new record and return it with its assigned id.
    fn create(&self, dataset: NewDataset) -> Result<DatasetRecord>;

    /// Look up a record by id.
    fn get(&self, id: u64) -> Result<Option<DatasetRecord>>;

    /// Remove a record. Returns whether it existed.
    fn delete(&self, id: u64) -> Result<bool>;
}

#[derive(Debug, Default)]
struct StoreState {
    next_id: u64,
    records: BTreeMap<u64, DatasetRecord>,
}

/// Process-local [`DatasetStore`] with sequential ids starting at 1.
#[derive(Debug, Default)]
pub struct InMemoryDatasetStore {
    state: RwLock<StoreState>,
}

static_assertions::assert_impl_all!(InMemoryDatasetStore: Send, Sync);

impl InMemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records, ordered by id.
    pub fn list(&self) -> Vec<DatasetRecord> {
        self.state.read().records.values().cloned().collect()
    }
}

impl DatasetStore for InMemoryDatasetStore {
    fn create(&self, dataset: NewDataset) -> Result<DatasetRecord> {
        let mut state = self.state.write();
        state.next_id = state
            .next_id
            .checked_add(1)
            .ok_or_else(|| PipelineError::Storage("dataset id space exhausted".to_string()))?;

        let record = DatasetRecord::from_new(state.next_id, dataset, Utc::now());
        state.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn get(&self, id: u64) -> Result<Option<DatasetRecord>> {
        Ok(self.state.read().records.get(&id).cloned())
    }

    fn delete(&self, id: u64) -> Result<bool> {
        Ok(self.state.write().records.remove(&id).is_some())
    }
}
