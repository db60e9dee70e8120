//! Origin verification (the cross-domain trust boundary)
//!
//! The router never authenticates deliveries itself. It checks the per-domain
//! sender allow-list and then asks an [`OriginVerifier`] whether the proof
//! attached by the relay network is acceptable.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use protocol_core::{Address, DomainId};
use std::fmt;
use tracing::debug;

/// Domain-separation prefix for relay signatures
const RELAY_SIGNING_CONTEXT: &[u8] = b"deltran.rail.relay.v1";

/// Bytes a relay signs for one delivery
pub fn signing_message(source_domain: DomainId, sender: &Address, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(RELAY_SIGNING_CONTEXT.len() + 4 + 32 + payload.len());
    message.extend_from_slice(RELAY_SIGNING_CONTEXT);
    message.extend_from_slice(&source_domain.get().to_be_bytes());
    message.extend_from_slice(sender.as_bytes());
    message.extend_from_slice(payload);
    message
}

/// Sign a delivery as a relay
pub fn sign_delivery(
    key: &SigningKey,
    source_domain: DomainId,
    sender: &Address,
    payload: &[u8],
) -> Vec<u8> {
    key.sign(&signing_message(source_domain, sender, payload))
        .to_bytes()
        .to_vec()
}

/// Delivery proof check
pub trait OriginVerifier: fmt::Debug + Send {
    /// Accept or reject the proof for a delivery
    fn verify(&self, source_domain: DomainId, sender: &Address, payload: &[u8], proof: &[u8])
        -> bool;

    /// Clone into a box
    fn clone_box(&self) -> Box<dyn OriginVerifier>;
}

impl Clone for Box<dyn OriginVerifier> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Accepts every proof: the relay network already authenticated the delivery
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedRelay;

impl OriginVerifier for TrustedRelay {
    fn verify(&self, _: DomainId, _: &Address, _: &[u8], _: &[u8]) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn OriginVerifier> {
        Box::new(*self)
    }
}

/// Requires an Ed25519 signature by the relay key
#[derive(Debug, Clone)]
pub struct SignedRelay {
    relay_key: VerifyingKey,
}

impl SignedRelay {
    /// Create verifier for a relay public key
    pub fn new(relay_key: VerifyingKey) -> Self {
        Self { relay_key }
    }

    /// Relay public key
    pub fn relay_key(&self) -> &VerifyingKey {
        &self.relay_key
    }
}

impl OriginVerifier for SignedRelay {
    fn verify(
        &self,
        source_domain: DomainId,
        sender: &Address,
        payload: &[u8],
        proof: &[u8],
    ) -> bool {
        let Ok(signature) = Signature::from_slice(proof) else {
            debug!(len = proof.len(), "malformed relay signature");
            return false;
        };
        self.relay_key
            .verify(&signing_message(source_domain, sender, payload), &signature)
            .is_ok()
    }

    fn clone_box(&self) -> Box<dyn OriginVerifier> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay() -> SigningKey {
        SigningKey::from_bytes(&[11u8; 32])
    }

    #[test]
    fn test_signed_relay_accepts_valid_proof() {
        let key = relay();
        let verifier = SignedRelay::new(key.verifying_key());
        let sender = Address::derive("router-1");
        let proof = sign_delivery(&key, DomainId(1), &sender, b"payload");

        assert!(verifier.verify(DomainId(1), &sender, b"payload", &proof));
    }

    #[test]
    fn test_signed_relay_rejects_tampering() {
        let key = relay();
        let verifier = SignedRelay::new(key.verifying_key());
        let sender = Address::derive("router-1");
        let proof = sign_delivery(&key, DomainId(1), &sender, b"payload");

        assert!(!verifier.verify(DomainId(2), &sender, b"payload", &proof));
        assert!(!verifier.verify(DomainId(1), &Address::derive("x"), b"payload", &proof));
        assert!(!verifier.verify(DomainId(1), &sender, b"payloaD", &proof));
        assert!(!verifier.verify(DomainId(1), &sender, b"payload", &proof[..63]));

        let forged = sign_delivery(
            &SigningKey::from_bytes(&[12u8; 32]),
            DomainId(1),
            &sender,
            b"payload",
        );
        assert!(!verifier.verify(DomainId(1), &sender, b"payload", &forged));
    }

    #[test]
    fn test_trusted_relay() {
        assert!(TrustedRelay.verify(DomainId(9), &Address::ZERO, b"", b""));
    }
}
