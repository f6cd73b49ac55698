//! The record store capability.
//!
//! Storage is injected into the state machines as a trait object so they can
//! be tested against the in-memory substitute and deployed against SQLite.
//! The contract every implementation must honour:
//!
//! - one record per ordered pair per record space,
//! - `insert_new` and `compare_and_swap` are atomic check-then-write
//!   operations: a failed write leaves the previous committed row intact,
//! - `scan` returns rows in insertion (`seq`) order — it is the rebuild
//!   source for the lookup index,
//! - `remove` is the explicit deletion/archival operation; the state machines
//!   themselves never delete.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// The two record spaces. Same key shape, fully disjoint records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordSpace {
    Conversations,
    Exchanges,
}

impl RecordSpace {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSpace::Conversations => "conversations",
            RecordSpace::Exchanges => "exchanges",
        }
    }
}

/// Primary key: the ordered pair of base64 Falcon public keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub initiator: String,
    pub responder: String,
}

impl PairKey {
    pub fn new(initiator: impl Into<String>, responder: impl Into<String>) -> Self {
        Self {
            initiator: initiator.into(),
            responder: responder.into(),
        }
    }
}

/// One stored record: the current state plus the serialised record body.
/// `seq` is assigned once at insert and provides the stable insertion order
/// the list endpoints promise.
#[derive(Debug, Clone)]
pub struct RecordRow {
    pub pair: PairKey,
    pub state: String,
    pub body: String,
    pub seq: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, space: RecordSpace, pair: &PairKey)
        -> Result<Option<RecordRow>, StoreError>;

    /// Create the first record for a pair. Fails with `Exists { state }` if
    /// ANY record (open or terminal) already occupies the pair.
    async fn insert_new(
        &self,
        space: RecordSpace,
        pair: &PairKey,
        state: &str,
        body: &str,
    ) -> Result<RecordRow, StoreError>;

    /// Atomically replace state and body if and only if the current state is
    /// `expected_state`. `NotFound` if the pair has no record,
    /// `StateMismatch` if it is in any other state.
    async fn compare_and_swap(
        &self,
        space: RecordSpace,
        pair: &PairKey,
        expected_state: &str,
        new_state: &str,
        body: &str,
    ) -> Result<RecordRow, StoreError>;

    /// Full scan in `seq` order. Index rebuilds and expiry sweeps only.
    async fn scan(&self, space: RecordSpace) -> Result<Vec<RecordRow>, StoreError>;

    /// Explicit deletion. Returns whether a record was removed.
    async fn remove(&self, space: RecordSpace, pair: &PairKey) -> Result<bool, StoreError>;
}
