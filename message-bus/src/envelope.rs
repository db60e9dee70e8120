//! Cross-domain delivery envelope
//!
//! The delivery service transports opaque bytes. The router wraps the
//! original payload with the metadata the receiving domain needs to import
//! the message under its source identifier.

use bincode::Options;
use protocol_core::{Address, DomainId, Error, MessageId, MessageType, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Upper bound on an encoded envelope (1 MiB)
pub const MAX_ENVELOPE_LEN: u64 = 1 << 20;

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_ENVELOPE_LEN)
        .reject_trailing_bytes()
}

/// Payload carried between routing domains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryEnvelope {
    /// Identifier assigned by the origin domain
    pub message_id: MessageId,

    /// Message type
    pub message_type: MessageType,

    /// Origin domain
    pub origin_domain: DomainId,

    /// Original submitter at the origin
    pub submitter: Address,

    /// Tag-addressed payload, unchanged
    pub body: Vec<u8>,
}

impl DeliveryEnvelope {
    /// Serialize to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        codec()
            .serialize(self)
            .map_err(|e| Error::Envelope(format!("encode failed: {}", e)))
    }

    /// Deserialize from bytes (bounded, no trailing bytes)
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        codec()
            .deserialize(bytes)
            .map_err(|e| Error::Envelope(format!("decode failed: {}", e)))
    }
}

/// SHA-256 digest of encoded envelope bytes
pub fn envelope_digest(bytes: &[u8]) -> [u8; 32] {
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::digest(bytes));
    digest
}
