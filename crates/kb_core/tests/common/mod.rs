//! Shared test fixtures: a deterministic stand-in for the Falcon verifier so
//! engine tests exercise authentication logic without real PQ keygen.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use kb_crypto::SignatureVerifier;

/// Accepts exactly the signatures produced by `sign_as`: the keyed BLAKE3
/// digest of (public key || message). Tampering with any byte of the key,
/// message, or signature makes verification fail, which is all the engines
/// rely on.
pub struct StubVerifier;

impl SignatureVerifier for StubVerifier {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        signature == stub_sig_bytes(public_key, message)
    }
}

pub fn stub_sig_bytes(public_key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(public_key);
    hasher.update(message);
    hasher.finalize().as_bytes().to_vec()
}

pub fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A party's base64 "public key" for stub tests.
pub fn key(name: &str) -> String {
    b64(name.as_bytes())
}

/// Sign `message` as the holder of `key_b64`.
pub fn sign_as(key_b64: &str, message: &[u8]) -> String {
    let pk = URL_SAFE_NO_PAD.decode(key_b64).expect("key is valid base64");
    b64(&stub_sig_bytes(&pk, message))
}
