//! Falcon key material.
//!
//! Each party is identified by one long-term Falcon-512 public key; the
//! coordinator treats it as an opaque byte string and only ever feeds it to
//! the verifier. `FalconKeyPair` exists for the client side of the protocol
//! and for tests — the service itself never generates or holds secret keys.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use pqcrypto_falcon::falcon512;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _};

use crate::error::CryptoError;

// ── Newtype wrapper ───────────────────────────────────────────────────────────

/// Falcon-512 public key bytes, base64url-encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKeyBytes(pub Vec<u8>);

impl PublicKeyBytes {
    pub fn to_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    pub fn from_b64(s: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD.decode(s)?;
        if bytes.is_empty() {
            return Err(CryptoError::InvalidKey("Public key is empty".into()));
        }
        Ok(Self(bytes))
    }
}

/// Short log tag for a base64-encoded public key. Raw keys are ~1.2 KB of
/// base64 and must never appear in log lines.
pub fn key_tag(b64: &str) -> String {
    let hash = match URL_SAFE_NO_PAD.decode(b64) {
        Ok(bytes) => blake3::hash(&bytes),
        Err(_) => blake3::hash(b64.as_bytes()),
    };
    hex::encode(&hash.as_bytes()[..6])
}

// ── Keypair (client / test side) ──────────────────────────────────────────────

/// Long-term Falcon-512 signing keypair.
pub struct FalconKeyPair {
    pub public: PublicKeyBytes,
    secret: falcon512::SecretKey,
}

impl FalconKeyPair {
    pub fn generate() -> Self {
        let (pk, sk) = falcon512::keypair();
        Self {
            public: PublicKeyBytes(pk.as_bytes().to_vec()),
            secret: sk,
        }
    }

    /// Sign arbitrary bytes; returns the raw detached Falcon signature.
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        falcon512::detached_sign(msg, &self.secret)
            .as_bytes()
            .to_vec()
    }

    /// Sign and base64url-encode, matching the wire form of signatures.
    pub fn sign_b64(&self, msg: &[u8]) -> String {
        URL_SAFE_NO_PAD.encode(self.sign(msg))
    }

    /// Export the public key in base64 form for requests.
    pub fn public_b64(&self) -> String {
        self.public.to_b64()
    }
}
