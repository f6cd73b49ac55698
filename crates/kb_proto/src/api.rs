//! API request/response types shared between clients and the coordinator.
//! These map directly to JSON bodies on the wire.
//!
//! List endpoints return bare arrays of records; errors are always an
//! `ErrorResponse` with a stable machine-readable `code`.

use serde::{Deserialize, Serialize};

// ── Conversations ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationInitiateRequest {
    /// Base64 Falcon-512 public key of the caller (the initiator).
    pub initiator_falcon_pubkey: String,
    pub responder_falcon_pubkey: String,
    /// Base64 Kyber public key for the responder to encapsulate against.
    pub kyber_pubkey: String,
    /// Base64 Falcon signature by the initiator over the canonical
    /// initiate payload.
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationCompleteRequest {
    pub initiator_falcon_pubkey: String,
    /// Base64 Falcon-512 public key of the caller (the responder).
    pub responder_falcon_pubkey: String,
    /// Base64 Kyber ciphertext produced by the responder.
    pub kyber_ciphertext: String,
    /// Base64 Falcon signature by the responder over the canonical
    /// complete payload.
    pub signature: String,
}

// ── Exchanges ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeInitRequest {
    pub initiator_falcon_pubkey: String,
    pub responder_falcon_pubkey: String,
    pub initiator_kyber_pubkey: String,
    pub initiator_signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangePairRequest {
    pub initiator_falcon_pubkey: String,
    pub responder_falcon_pubkey: String,
    /// Base64 encapsulated secret, stored verbatim for the initiator to poll.
    pub encapsulated_secret: String,
    pub responder_signature: String,
}

/// Pure finalisation acknowledgment — carries no new cryptographic material,
/// so no signature (the transition is gated on naming the exact pair).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeCompleteRequest {
    pub initiator_falcon_pubkey: String,
    pub responder_falcon_pubkey: String,
}

// ── Common ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}
