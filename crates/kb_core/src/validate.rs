//! Field validation shared by both state machines.
//!
//! Validation failures are rejected before any signature check or store
//! access; nothing in this module touches state.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use kb_crypto::PublicKeyBytes;

use crate::error::CoreError;
use crate::store::PairKey;

/// Decode a required base64url field, naming the field in the error.
pub fn decode_b64(field: &'static str, value: &str) -> Result<Vec<u8>, CoreError> {
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| CoreError::Validation(format!("{field} is not valid base64url")))
}

/// Decode a Falcon public-key field. Every key a request names is decoded,
/// whether or not the operation verifies against it — a malformed key is a
/// malformed request, not a miss on an existing record.
pub fn decode_pubkey(field: &'static str, value: &str) -> Result<Vec<u8>, CoreError> {
    PublicKeyBytes::from_b64(value)
        .map(|pk| pk.0)
        .map_err(|_| CoreError::Validation(format!("{field} is not a valid base64url key")))
}

/// An ordered pair must name two distinct parties; a handshake with oneself
/// would let a single signature satisfy both roles.
pub fn distinct_pair(pair: &PairKey) -> Result<(), CoreError> {
    if pair.initiator == pair.responder {
        return Err(CoreError::Validation(
            "initiator and responder keys must differ".into(),
        ));
    }
    Ok(())
}
