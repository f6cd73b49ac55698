//! The signature verification boundary.
//!
//! The coordinator authenticates every state transition against the caller's
//! claimed public key. Verification is pure and side-effect-free: given the
//! same (key, message, signature) triple it always returns the same answer,
//! so the state machines can call it before touching any state.

use pqcrypto_falcon::falcon512;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _};

/// Pure verification contract the state machines are written against.
/// Malformed input must verify as `false`, never panic or mutate anything.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

/// Falcon-512 detached-signature verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct FalconVerifier;

impl SignatureVerifier for FalconVerifier {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let pk = match falcon512::PublicKey::from_bytes(public_key) {
            Ok(pk) => pk,
            Err(_) => return false,
        };
        let sig = match falcon512::DetachedSignature::from_bytes(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        falcon512::verify_detached_signature(&sig, message, &pk).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::FalconKeyPair;

    #[test]
    fn valid_signature_verifies() {
        let pair = FalconKeyPair::generate();
        let msg = b"exchange init payload";
        let sig = pair.sign(msg);
        assert!(FalconVerifier.verify(&pair.public.0, msg, &sig));
    }

    #[test]
    fn tampered_message_fails() {
        let pair = FalconKeyPair::generate();
        let sig = pair.sign(b"original payload");
        assert!(!FalconVerifier.verify(&pair.public.0, b"oriGinal payload", &sig));
    }

    #[test]
    fn wrong_key_fails() {
        let signer = FalconKeyPair::generate();
        let other = FalconKeyPair::generate();
        let msg = b"payload";
        let sig = signer.sign(msg);
        assert!(!FalconVerifier.verify(&other.public.0, msg, &sig));
    }

    #[test]
    fn malformed_input_is_false_not_panic() {
        assert!(!FalconVerifier.verify(b"short", b"msg", b"sig"));
        assert!(!FalconVerifier.verify(&[], b"msg", &[]));
    }
}
