//! kb_crypto — Falcon signature boundary for the Keybridge coordinator
//!
//! # Design principles
//! - NO custom crypto; Falcon-512 comes from the audited pqcrypto bindings.
//! - The coordinator never signs and never holds secret key material; it only
//!   verifies detached signatures submitted by clients.
//! - All public APIs take/return opaque newtypes to prevent accidental misuse.
//!
//! # Module layout
//! - `keys`     — public-key newtype + client/test keypair helper
//! - `verifier` — the pure `SignatureVerifier` boundary and its Falcon impl
//! - `error`    — unified error type

pub mod error;
pub mod keys;
pub mod verifier;

pub use error::CryptoError;
pub use keys::{FalconKeyPair, PublicKeyBytes};
pub use verifier::{FalconVerifier, SignatureVerifier};
