//! Conversation state machine: PENDING → COMPLETE.
//!
//! The initiator publishes a Kyber public key for the responder to poll;
//! the responder answers with a ciphertext. Every transition verifies the
//! caller's signature over the canonical payload before any state is touched,
//! and each pair's check-then-write runs under that pair's lock with the
//! store CAS as the final guard.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use kb_crypto::keys::key_tag;
use kb_crypto::SignatureVerifier;
use kb_proto::api::{ConversationCompleteRequest, ConversationInitiateRequest};
use kb_proto::payload;
use kb_proto::record::{Conversation, ConversationStatus};

use crate::error::{CoreError, StoreError};
use crate::index::{LookupIndex, Role};
use crate::locks::PairLocks;
use crate::store::{PairKey, RecordSpace, RecordStore};
use crate::validate::{decode_b64, decode_pubkey, distinct_pair};

const SPACE: RecordSpace = RecordSpace::Conversations;

pub struct ConversationEngine {
    store: Arc<dyn RecordStore>,
    verifier: Arc<dyn SignatureVerifier>,
    index: LookupIndex,
    locks: PairLocks,
}

impl ConversationEngine {
    /// Wire the engine to its store and verifier, rebuilding the lookup
    /// views from whatever the store already holds.
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

    /// Create a PENDING conversation for the pair.
    pub async fn initiate(
        &self,
        req: ConversationInitiateRequest,
    ) -> Result<Conversation, CoreError> {
        let pair = PairKey::new(&req.initiator_falcon_pubkey, &req.responder_falcon_pubkey);
        distinct_pair(&pair)?;
        let initiator_pk = decode_pubkey("initiator_falcon_pubkey", &req.initiator_falcon_pubkey)?;
        decode_pubkey("responder_falcon_pubkey", &req.responder_falcon_pubkey)?;
        decode_b64("kyber_pubkey", &req.kyber_pubkey)?;
        let signature = decode_b64("signature", &req.signature)?;

        // Authenticate before looking at any state: an unauthenticated caller
        // learns nothing about the pair, not even that it exists.
        let signed =
            payload::conversation_initiate(&req.responder_falcon_pubkey, &req.kyber_pubkey)?;
        if !self.verifier.verify(&initiator_pk, &signed, &signature) {
            return Err(CoreError::Unauthenticated);
        }

        let now = Utc::now();
        let conversation = Conversation {
            initiator_falcon_pubkey: req.initiator_falcon_pubkey.clone(),
            responder_falcon_pubkey: req.responder_falcon_pubkey.clone(),
            kyber_pubkey: req.kyber_pubkey,
            initiator_signature: req.signature,
            status: ConversationStatus::Pending,
            kyber_ciphertext: None,
            completion_signature: None,
            created_at: now,
            updated_at: now,
        };
        let body = serde_json::to_string(&conversation)?;

        let guard = self.locks.lock_for(&pair);
        let _held = guard.lock().await;

        let row = self
            .store
            .insert_new(SPACE, &pair, ConversationStatus::Pending.as_str(), &body)
            .await?;
        self.index.insert(&row);

        debug!(
            initiator = %key_tag(&pair.initiator),
            responder = %key_tag(&pair.responder),
            "conversation initiated"
        );
        Ok(conversation)
    }

    /// PENDING conversations awaiting `pubkey` as responder, oldest first.
    pub async fn list_pending(&self, pubkey: &str) -> Result<Vec<Conversation>, CoreError> {
        self.collect(pubkey, Role::Responder, ConversationStatus::Pending.as_str())
            .await
    }

    /// Transition PENDING → COMPLETE, storing the responder's ciphertext.
    pub async fn complete(
        &self,
        req: ConversationCompleteRequest,
    ) -> Result<Conversation, CoreError> {
        let pair = PairKey::new(&req.initiator_falcon_pubkey, &req.responder_falcon_pubkey);
        distinct_pair(&pair)?;
        decode_pubkey("initiator_falcon_pubkey", &req.initiator_falcon_pubkey)?;
        let responder_pk = decode_pubkey("responder_falcon_pubkey", &req.responder_falcon_pubkey)?;
        decode_b64("kyber_ciphertext", &req.kyber_ciphertext)?;
        let signature = decode_b64("signature", &req.signature)?;

        let guard = self.locks.lock_for(&pair);
        let _held = guard.lock().await;

        let row = self
            .store
            .get(SPACE, &pair)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound)?;
        if row.state != ConversationStatus::Pending.as_str() {
            // Already advanced; distinguishable from "never started".
            return Err(CoreError::Conflict { state: row.state });
        }

        let signed =
            payload::conversation_complete(&req.initiator_falcon_pubkey, &req.kyber_ciphertext)?;
        if !self.verifier.verify(&responder_pk, &signed, &signature) {
            return Err(CoreError::Unauthenticated);
        }

        let mut conversation: Conversation = serde_json::from_str(&row.body)?;
        conversation.status = ConversationStatus::Complete;
        conversation.kyber_ciphertext = Some(req.kyber_ciphertext);
        conversation.completion_signature = Some(req.signature);
        conversation.updated_at = Utc::now();
        let body = serde_json::to_string(&conversation)?;

        let new_row = self
            .store
            .compare_and_swap(
                SPACE,
                &pair,
                ConversationStatus::Pending.as_str(),
                ConversationStatus::Complete.as_str(),
                &body,
            )
            .await
            .map_err(|err| match err {
                StoreError::NotFound => CoreError::NotFound,
                StoreError::StateMismatch { found, .. } => CoreError::Conflict { state: found },
                other => CoreError::Store(other),
            })?;
        self.index
            .transition(ConversationStatus::Pending.as_str(), &new_row);

        debug!(
            initiator = %key_tag(&pair.initiator),
            responder = %key_tag(&pair.responder),
            "conversation completed"
        );
        Ok(conversation)
    }

    /// Remove PENDING conversations older than `max_age`. COMPLETE records
    /// are immutable and never swept.
    pub async fn sweep_expired(&self, max_age: Duration) -> Result<usize, CoreError> {
        let cutoff = Utc::now() - max_age;
        let mut removed = 0usize;
        for row in self.store.scan(SPACE).await.map_err(CoreError::from)? {
            if row.state != ConversationStatus::Pending.as_str() || row.created_at >= cutoff {
                continue;
            }
            let guard = self.locks.lock_for(&row.pair);
            let _held = guard.lock().await;
            // Re-check under the lock; the record may have advanced since the scan.
            match self.store.get(SPACE, &row.pair).await.map_err(CoreError::from)? {
                Some(current)
                    if current.state == ConversationStatus::Pending.as_str()
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
    ) -> Result<Vec<Conversation>, CoreError> {
        let mut out = Vec::new();
        for pair in self.index.lookup(pubkey, role, state) {
            match self.store.get(SPACE, &pair).await.map_err(CoreError::from)? {
                Some(row) if row.state == state => {
                    out.push(serde_json::from_str(&row.body)?);
                }
                _ => {
                    // The index lost a race with a concurrent sweep; the next
                    // transition or rebuild will reconcile it.
                    warn!(
                        initiator = %key_tag(&pair.initiator),
                        responder = %key_tag(&pair.responder),
                        "stale conversation index entry skipped"
                    );
                }
            }
        }
        Ok(out)
    }
}
