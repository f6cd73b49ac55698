//! Exchange state machine: INIT → PAIRED → COMPLETE.
//!
//! The stricter four-step handshake. Each transition is role-gated: the
//! initiator opens the exchange, the responder pairs it with an encapsulated
//! secret, and the initiator's finalisation acknowledgment closes it. The two
//! parties never talk to each other — each polls its own role/state view.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use kb_crypto::keys::key_tag;
use kb_crypto::SignatureVerifier;
use kb_proto::api::{ExchangeCompleteRequest, ExchangeInitRequest, ExchangePairRequest};
use kb_proto::payload;
use kb_proto::record::{Exchange, ExchangeState};

use crate::error::CoreError;
use crate::index::{LookupIndex, Role};
use crate::locks::PairLocks;
use crate::store::{PairKey, RecordSpace, RecordStore};
use crate::validate::{decode_b64, decode_pubkey, distinct_pair};

const SPACE: RecordSpace = RecordSpace::Exchanges;

pub struct ExchangeEngine {
    store: Arc<dyn RecordStore>,
    verifier: Arc<dyn SignatureVerifier>,
    index: LookupIndex,
    locks: PairLocks,
}

impl ExchangeEngine {
    pub async fn new(
        store: Arc<dyn RecordStore>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Result<Self, CoreError> {
        let index = LookupIndex::new(SPACE);
        index.rebuild(store.as_ref()).await.map_err(CoreError::from)?;
        Ok(Self {
            store,
            verifier,
            index,
            locks: PairLocks::new(),
        })
    }

    /// Create an INIT exchange for the pair.
    pub async fn init(&self, req: ExchangeInitRequest) -> Result<Exchange, CoreError> {
        let pair = PairKey::new(&req.initiator_falcon_pubkey, &req.responder_falcon_pubkey);
        distinct_pair(&pair)?;
        let initiator_pk = decode_pubkey("initiator_falcon_pubkey", &req.initiator_falcon_pubkey)?;
        decode_pubkey("responder_falcon_pubkey", &req.responder_falcon_pubkey)?;
        decode_b64("initiator_kyber_pubkey", &req.initiator_kyber_pubkey)?;
        let signature = decode_b64("initiator_signature", &req.initiator_signature)?;

        let signed =
            payload::exchange_init(&req.responder_falcon_pubkey, &req.initiator_kyber_pubkey)?;
        if !self.verifier.verify(&initiator_pk, &signed, &signature) {
            return Err(CoreError::Unauthenticated);
        }

        let now = Utc::now();
        let exchange = Exchange {
            initiator_falcon_pubkey: req.initiator_falcon_pubkey.clone(),
            responder_falcon_pubkey: req.responder_falcon_pubkey.clone(),
            initiator_kyber_pubkey: req.initiator_kyber_pubkey,
            initiator_signature: req.initiator_signature,
            state: ExchangeState::Init,
            encapsulated_secret: None,
            responder_signature: None,
            created_at: now,
            updated_at: now,
        };
        let body = serde_json::to_string(&exchange)?;

        let guard = self.locks.lock_for(&pair);
        let _held = guard.lock().await;

        let row = self
            .store
            .insert_new(SPACE, &pair, ExchangeState::Init.as_str(), &body)
            .await?;
        self.index.insert(&row);

        debug!(
            initiator = %key_tag(&pair.initiator),
            responder = %key_tag(&pair.responder),
            "exchange initiated"
        );
        Ok(exchange)
    }

    /// INIT exchanges awaiting `pubkey`'s pairing action (as responder).
    pub async fn list_initiated(&self, pubkey: &str) -> Result<Vec<Exchange>, CoreError> {
        self.collect(pubkey, Role::Responder, ExchangeState::Init.as_str())
            .await
    }

    /// Transition INIT → PAIRED, storing the responder's encapsulated secret
    /// verbatim.
    pub async fn pair(&self, req: ExchangePairRequest) -> Result<Exchange, CoreError> {
        let pair = PairKey::new(&req.initiator_falcon_pubkey, &req.responder_falcon_pubkey);
        distinct_pair(&pair)?;
        decode_pubkey("initiator_falcon_pubkey", &req.initiator_falcon_pubkey)?;
        let responder_pk = decode_pubkey("responder_falcon_pubkey", &req.responder_falcon_pubkey)?;
        decode_b64("encapsulated_secret", &req.encapsulated_secret)?;
        let signature = decode_b64("responder_signature", &req.responder_signature)?;

        let guard = self.locks.lock_for(&pair);
        let _held = guard.lock().await;

        let row = self
            .store
            .get(SPACE, &pair)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound)?;
        if row.state != ExchangeState::Init.as_str() {
            return Err(CoreError::InvalidState {
                expected: ExchangeState::Init.as_str().to_string(),
                found: row.state,
            });
        }

        let signed =
            payload::exchange_pair(&req.initiator_falcon_pubkey, &req.encapsulated_secret)?;
        if !self.verifier.verify(&responder_pk, &signed, &signature) {
            return Err(CoreError::Unauthenticated);
        }

        let mut exchange: Exchange = serde_json::from_str(&row.body)?;
        exchange.state = ExchangeState::Paired;
        exchange.encapsulated_secret = Some(req.encapsulated_secret);
        exchange.responder_signature = Some(req.responder_signature);
        exchange.updated_at = Utc::now();
        let body = serde_json::to_string(&exchange)?;

        let new_row = self
            .store
            .compare_and_swap(
                SPACE,
                &pair,
                ExchangeState::Init.as_str(),
                ExchangeState::Paired.as_str(),
                &body,
            )
            .await?;
        self.index.transition(ExchangeState::Init.as_str(), &new_row);

        debug!(
            initiator = %key_tag(&pair.initiator),
            responder = %key_tag(&pair.responder),
            "exchange paired"
        );
        Ok(exchange)
    }

    /// PAIRED exchanges awaiting finalisation by `pubkey` (as initiator).
    pub async fn list_paired(&self, pubkey: &str) -> Result<Vec<Exchange>, CoreError> {
        self.collect(pubkey, Role::Initiator, ExchangeState::Paired.as_str())
            .await
    }

    /// Transition PAIRED → COMPLETE. A pure acknowledgment: no new material,
    /// gated on the caller naming the exact pair.
    pub async fn complete(&self, req: ExchangeCompleteRequest) -> Result<Exchange, CoreError> {
        let pair = PairKey::new(&req.initiator_falcon_pubkey, &req.responder_falcon_pubkey);
        distinct_pair(&pair)?;
        decode_pubkey("initiator_falcon_pubkey", &req.initiator_falcon_pubkey)?;
        decode_pubkey("responder_falcon_pubkey", &req.responder_falcon_pubkey)?;

        let guard = self.locks.lock_for(&pair);
        let _held = guard.lock().await;

        let row = self
            .store
            .get(SPACE, &pair)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound)?;
        if row.state != ExchangeState::Paired.as_str() {
            return Err(CoreError::InvalidState {
                expected: ExchangeState::Paired.as_str().to_string(),
                found: row.state,
            });
        }

        let mut exchange: Exchange = serde_json::from_str(&row.body)?;
        exchange.state = ExchangeState::Complete;
        exchange.updated_at = Utc::now();
        let body = serde_json::to_string(&exchange)?;

        let new_row = self
            .store
            .compare_and_swap(
                SPACE,
                &pair,
                ExchangeState::Paired.as_str(),
                ExchangeState::Complete.as_str(),
                &body,
            )
            .await?;
        self.index
            .transition(ExchangeState::Paired.as_str(), &new_row);

        debug!(
            initiator = %key_tag(&pair.initiator),
            responder = %key_tag(&pair.responder),
            "exchange completed"
        );
        Ok(exchange)
    }

    /// COMPLETE exchanges where `pubkey` was the responder.
    pub async fn list_completed(&self, pubkey: &str) -> Result<Vec<Exchange>, CoreError> {
        self.collect(pubkey, Role::Responder, ExchangeState::Complete.as_str())
            .await
    }

    /// Remove INIT and PAIRED exchanges older than `max_age`. COMPLETE
    /// records are immutable and never swept.
    pub async fn sweep_expired(&self, max_age: Duration) -> Result<usize, CoreError> {
        let cutoff = Utc::now() - max_age;
        let mut removed = 0usize;
        for row in self.store.scan(SPACE).await.map_err(CoreError::from)? {
            if row.state == ExchangeState::Complete.as_str() || row.created_at >= cutoff {
                continue;
            }
            let guard = self.locks.lock_for(&row.pair);
            let _held = guard.lock().await;
            match self.store.get(SPACE, &row.pair).await.map_err(CoreError::from)? {
                Some(current)
                    if current.state != ExchangeState::Complete.as_str()
                        && current.created_at < cutoff =>
                {
                    self.store
                        .remove(SPACE, &row.pair)
                        .await
                        .map_err(CoreError::from)?;
                    self.index.remove(&current);
                    self.locks.discard(&row.pair);
                    removed += 1;
                }
                _ => {}
            }
        }
        Ok(removed)
    }

    async fn collect(
        &self,
        pubkey: &str,
        role: Role,
        state: &str,
    ) -> Result<Vec<Exchange>, CoreError> {
        let mut out = Vec::new();
        for pair in self.index.lookup(pubkey, role, state) {
            match self.store.get(SPACE, &pair).await.map_err(CoreError::from)? {
                Some(row) if row.state == state => {
                    out.push(serde_json::from_str(&row.body)?);
                }
                _ => {
                    warn!(
                        initiator = %key_tag(&pair.initiator),
                        responder = %key_tag(&pair.responder),
                        "stale exchange index entry skipped"
                    );
                }
            }
        }
        Ok(out)
    }
}
