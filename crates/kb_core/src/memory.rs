//! In-memory record store.
//!
//! Backs the default service mode and every engine test. Insertion order is
//! preserved through a monotonic `seq` counter; all mutation happens under a
//! single short-lived mutex, which keeps each operation atomic without
//! blocking across await points.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::store::{PairKey, RecordRow, RecordSpace, RecordStore};

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<(RecordSpace, PairKey), RecordRow>,
    next_seq: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across both spaces. Test helper.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(
        &self,
        space: RecordSpace,
        pair: &PairKey,
    ) -> Result<Option<RecordRow>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.records.get(&(space, pair.clone())).cloned())
    }

    async fn insert_new(
        &self,
        space: RecordSpace,
        pair: &PairKey,
        state: &str,
        body: &str,
    ) -> Result<RecordRow, StoreError> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.records.get(&(space, pair.clone())) {
            return Err(StoreError::Exists {
                state: existing.state.clone(),
            });
        }
        let now = Utc::now();
        inner.next_seq += 1;
        let row = RecordRow {
            pair: pair.clone(),
            state: state.to_string(),
            body: body.to_string(),
            seq: inner.next_seq,
            created_at: now,
            updated_at: now,
        };
        inner.records.insert((space, pair.clone()), row.clone());
        Ok(row)
    }

    async fn compare_and_swap(
        &self,
        space: RecordSpace,
        pair: &PairKey,
        expected_state: &str,
        new_state: &str,
        body: &str,
    ) -> Result<RecordRow, StoreError> {
        let mut inner = self.inner.lock();
        let row = inner
            .records
            .get_mut(&(space, pair.clone()))
            .ok_or(StoreError::NotFound)?;
        if row.state != expected_state {
            return Err(StoreError::StateMismatch {
                expected: expected_state.to_string(),
                found: row.state.clone(),
            });
        }
        row.state = new_state.to_string();
        row.body = body.to_string();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn scan(&self, space: RecordSpace) -> Result<Vec<RecordRow>, StoreError> {
        let inner = self.inner.lock();
        let mut rows: Vec<RecordRow> = inner
            .records
            .iter()
            .filter(|((s, _), _)| *s == space)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by_key(|row| row.seq);
        Ok(rows)
    }

    async fn remove(&self, space: RecordSpace, pair: &PairKey) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        Ok(inner.records.remove(&(space, pair.clone())).is_some())
    }
}
