//! Per-pair mutual exclusion.
//!
//! Every transition is a check-current-state-then-write sequence that must be
//! atomic per ordered pair. Handing out one async mutex per pair serializes
//! transitions on the same record while leaving unrelated pairs fully
//! concurrent; the store's compare-and-swap remains the final guard.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::store::PairKey;

#[derive(Default)]
pub struct PairLocks {
    inner: Mutex<HashMap<PairKey, Arc<AsyncMutex<()>>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding transitions for `pair`. Callers hold the returned
    /// Arc across the await on `.lock()`.
    pub fn lock_for(&self, pair: &PairKey) -> Arc<AsyncMutex<()>> {
        let mut inner = self.inner.lock();
        inner
            .entry(pair.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drop the registry entry for a removed record. Safe even if another
    /// task still holds the Arc; it will simply be the last owner.
    pub fn discard(&self, pair: &PairKey) {
        self.inner.lock().remove(pair);
    }
}
