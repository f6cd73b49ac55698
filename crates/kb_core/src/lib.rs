//! kb_core — Keybridge key-exchange coordination engine
//!
//! The two parties of a handshake are never connected at the same time; they
//! coordinate solely by polling shared server state. This crate owns that
//! state: per-pair records, the role/state lookup index the polling queries
//! are served from, and the two state machines that advance records under
//! per-pair mutual exclusion.
//!
//! # Module layout
//! - `store`        — the injectable `RecordStore` capability (get/insert/CAS)
//! - `memory`       — in-memory store (tests, default service mode)
//! - `sqlite`       — durable SQLite store via sqlx
//! - `index`        — derived `(pubkey, role, state)` lookup views
//! - `locks`        — per-pair async mutexes (no global lock)
//! - `conversation` — PENDING → COMPLETE handshake
//! - `exchange`     — INIT → PAIRED → COMPLETE handshake
//! - `error`        — store and engine error taxonomies

pub mod conversation;
pub mod error;
pub mod exchange;
pub mod index;
pub mod locks;
pub mod memory;
pub mod sqlite;
pub mod store;

mod validate;

pub use conversation::ConversationEngine;
pub use error::{CoreError, StoreError};
pub use exchange::ExchangeEngine;
pub use index::{LookupIndex, Role};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{PairKey, RecordRow, RecordSpace, RecordStore};
