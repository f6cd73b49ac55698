//! Derived lookup views.
//!
//! Polling queries are served from `(pubkey, role, state)` point lookups.
//! The index is a cache, never a second source of truth: it is only mutated
//! after the store commit it mirrors (under the same per-pair lock), and it
//! can always be reconstructed with `rebuild` from a full store scan.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::store::{PairKey, RecordRow, RecordSpace, RecordStore};

/// Which side of the pair a public key occupies in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Initiator,
    Responder,
}

type IndexKey = (String, Role, String);

/// Role/state views over one record space.
#[derive(Clone)]
pub struct LookupIndex {
    space: RecordSpace,
    // BTreeMap keyed by seq keeps each view in insertion order.
    inner: Arc<RwLock<HashMap<IndexKey, BTreeMap<i64, PairKey>>>>,
}

impl LookupIndex {
    pub fn new(space: RecordSpace) -> Self {
        Self {
            space,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a freshly inserted record under both of its keys.
    pub fn insert(&self, row: &RecordRow) {
        let mut inner = self.inner.write();
        Self::add(&mut inner, row, &row.state);
    }

    /// Move a record's entries from `old_state` to its current state.
    pub fn transition(&self, old_state: &str, row: &RecordRow) {
        let mut inner = self.inner.write();
        Self::drop_entries(&mut inner, row, old_state);
        Self::add(&mut inner, row, &row.state);
    }

    /// Remove a record's entries entirely (explicit deletion / expiry).
    pub fn remove(&self, row: &RecordRow) {
        let mut inner = self.inner.write();
        Self::drop_entries(&mut inner, row, &row.state);
    }

    /// Point lookup: pairs where `pubkey` plays `role` and the record is in
    /// `state`, in insertion order.
    pub fn lookup(&self, pubkey: &str, role: Role, state: &str) -> Vec<PairKey> {
        let inner = self.inner.read();
        inner
            .get(&(pubkey.to_string(), role, state.to_string()))
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Throw away the current views and rebuild them from a full scan.
    pub async fn rebuild(&self, store: &dyn RecordStore) -> Result<(), StoreError> {
        let rows = store.scan(self.space).await?;
        let mut fresh: HashMap<IndexKey, BTreeMap<i64, PairKey>> = HashMap::new();
        for row in &rows {
            Self::add(&mut fresh, row, &row.state);
        }
        *self.inner.write() = fresh;
        Ok(())
    }

    fn add(map: &mut HashMap<IndexKey, BTreeMap<i64, PairKey>>, row: &RecordRow, state: &str) {
        for (key, role) in [
            (row.pair.initiator.clone(), Role::Initiator),
            (row.pair.responder.clone(), Role::Responder),
        ] {
            map.entry((key, role, state.to_string()))
                .or_default()
                .insert(row.seq, row.pair.clone());
        }
    }

    fn drop_entries(
        map: &mut HashMap<IndexKey, BTreeMap<i64, PairKey>>,
        row: &RecordRow,
        state: &str,
    ) {
        for (key, role) in [
            (row.pair.initiator.clone(), Role::Initiator),
            (row.pair.responder.clone(), Role::Responder),
        ] {
            let index_key = (key, role, state.to_string());
            if let Some(entries) = map.get_mut(&index_key) {
                entries.remove(&row.seq);
                if entries.is_empty() {
                    map.remove(&index_key);
                }
            }
        }
    }
}
