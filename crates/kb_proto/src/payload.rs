//! Canonical byte forms of each transition's signed payload.
//!
//! Every state transition is authenticated by a Falcon signature over one of
//! these payloads. The byte form is a fixed part of the protocol: signing and
//! verifying sides MUST produce identical bytes, so payloads are built with
//! `serde_json::json!` (serde_json's default map keeps keys sorted) and the
//! fields are written alphabetically. Each payload carries a domain-separating
//! `op` tag and a `version` so a signature for one transition can never be
//! replayed for another.

use serde_json::json;

pub const PAYLOAD_VERSION: u8 = 1;

/// Signed by the initiator: binds the responder identity to the offered
/// Kyber public key.
pub fn conversation_initiate(
    responder_falcon_pubkey: &str,
    kyber_pubkey: &str,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&json!({
        "kyber_pubkey": kyber_pubkey,
        "op": "conversation.initiate",
        "responder_falcon_pubkey": responder_falcon_pubkey,
        "version": PAYLOAD_VERSION,
    }))
}

/// Signed by the responder: binds the initiator identity to the returned
/// Kyber ciphertext.
pub fn conversation_complete(
    initiator_falcon_pubkey: &str,
    kyber_ciphertext: &str,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&json!({
        "initiator_falcon_pubkey": initiator_falcon_pubkey,
        "kyber_ciphertext": kyber_ciphertext,
        "op": "conversation.complete",
        "version": PAYLOAD_VERSION,
    }))
}

/// Signed by the initiator: binds the responder identity to the offered
/// Kyber public key.
pub fn exchange_init(
    responder_falcon_pubkey: &str,
    initiator_kyber_pubkey: &str,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&json!({
        "initiator_kyber_pubkey": initiator_kyber_pubkey,
        "op": "exchange.init",
        "responder_falcon_pubkey": responder_falcon_pubkey,
        "version": PAYLOAD_VERSION,
    }))
}

/// Signed by the responder: binds the initiator identity to the
/// encapsulated secret.
pub fn exchange_pair(
    initiator_falcon_pubkey: &str,
    encapsulated_secret: &str,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&json!({
        "encapsulated_secret": encapsulated_secret,
        "initiator_falcon_pubkey": initiator_falcon_pubkey,
        "op": "exchange.pair",
        "version": PAYLOAD_VERSION,
    }))
}
