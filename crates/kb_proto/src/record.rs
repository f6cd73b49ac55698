//! The two handshake record types.
//!
//! Both are keyed by the ordered pair (initiator key, responder key) and live
//! in separate record spaces. State only ever moves forward: a record is
//! created by the first transition, mutated by the next in-sequence one, and
//! is immutable once terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lightweight two-state handshake: the initiator publishes a Kyber public
/// key, the responder answers with a ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Base64 Falcon-512 public key of the initiating party.
    pub initiator_falcon_pubkey: String,
    /// Base64 Falcon-512 public key of the responding party.
    pub responder_falcon_pubkey: String,
    /// Base64 Kyber public key published by the initiator (opaque here).
    pub kyber_pubkey: String,
    /// Base64 Falcon signature over the canonical initiate payload.
    pub initiator_signature: String,
    pub status: ConversationStatus,
    /// Set on completion: base64 Kyber ciphertext from the responder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyber_ciphertext: Option<String>,
    /// Set on completion: base64 Falcon signature over the canonical
    /// complete payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_signature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Pending,
    Complete,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Pending => "pending",
            ConversationStatus::Complete => "complete",
        }
    }
}

/// Stricter four-step handshake with an explicit pairing acknowledgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub initiator_falcon_pubkey: String,
    pub responder_falcon_pubkey: String,
    /// Base64 Kyber public key published by the initiator (opaque here).
    pub initiator_kyber_pubkey: String,
    /// Base64 Falcon signature over the canonical init payload.
    pub initiator_signature: String,
    pub state: ExchangeState,
    /// Set on pairing: base64 encapsulated secret from the responder,
    /// stored verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encapsulated_secret: Option<String>,
    /// Set on pairing: base64 Falcon signature over the canonical pair payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responder_signature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeState {
    Init,
    Paired,
    Complete,
}

impl ExchangeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeState::Init => "init",
            ExchangeState::Paired => "paired",
            ExchangeState::Complete => "complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_serialise_snake_case() {
        assert_eq!(
            serde_json::to_string(&ExchangeState::Paired).expect("serialise"),
            "\"paired\""
        );
        assert_eq!(
            serde_json::to_string(&ConversationStatus::Pending).expect("serialise"),
            "\"pending\""
        );
    }

    #[test]
    fn optional_fields_absent_until_set() {
        let conv = Conversation {
            initiator_falcon_pubkey: "a".into(),
            responder_falcon_pubkey: "b".into(),
            kyber_pubkey: "k".into(),
            initiator_signature: "s".into(),
            status: ConversationStatus::Pending,
            kyber_ciphertext: None,
            completion_signature: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&conv).expect("serialise");
        assert!(!json.contains("kyber_ciphertext"));
        assert!(!json.contains("completion_signature"));
    }
}
