//! kb_proto — Wire types and canonical payloads for the Keybridge coordinator
//!
//! All on-wire types are serialised to JSON. Key, signature, and KEM material
//! travels base64url-encoded (no padding) and is opaque to the coordinator —
//! it is stored and returned verbatim, never decapsulated.
//!
//! # Modules
//! - `api`     — request/response bodies shared between clients and the service
//! - `record`  — the Conversation and Exchange records and their states
//! - `payload` — canonical byte forms of each transition's signed payload

pub mod api;
pub mod payload;
pub mod record;

pub use record::{Conversation, ConversationStatus, Exchange, ExchangeState};
