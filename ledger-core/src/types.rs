//! Message record types
//!
//! Records are never deleted: the registry is the append-only audit trail
//! of everything the rail accepted, including the full status history.

use chrono::{DateTime, Utc};
use protocol_core::{Address, DomainId, MessageId, MessageStatus, MessageType};
use serde::{Deserialize, Serialize};

/// Opaque reference to the submitted payload (digest + length)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadRef {
    /// BLAKE3 digest of the payload bytes
    pub digest: [u8; 32],
    /// Payload length in bytes
    pub len: usize,
}

impl PayloadRef {
    /// Reference a payload
    pub fn of(payload: &[u8]) -> Self {
        Self {
            digest: *blake3::hash(payload).as_bytes(),
            len: payload.len(),
        }
    }

    /// Check if the payload matches this reference
    pub fn matches(&self, payload: &[u8]) -> bool {
        self.len == payload.len() && self.digest == *blake3::hash(payload).as_bytes()
    }
}

/// One entry of a record's status history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Status entered
    pub status: MessageStatus,
    /// When it was entered
    pub at: DateTime<Utc>,
}

/// Message record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Message identifier
    pub message_id: MessageId,

    /// Message type tag
    pub message_type: MessageType,

    /// Current status
    pub status: MessageStatus,

    /// Submitting institution (or remote sender for inbound deliveries)
    pub submitter: Address,

    /// Domain the message was created on
    pub origin_domain: DomainId,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Payload reference
    pub payload_ref: PayloadRef,

    /// Every status the record passed through, oldest first
    pub history: Vec<StatusChange>,
}

impl MessageRecord {
    /// New record in `Pending`
    pub fn pending(
        message_id: MessageId,
        message_type: MessageType,
        submitter: Address,
        origin_domain: DomainId,
        payload_ref: PayloadRef,
    ) -> Self {
        let now = Utc::now();
        Self {
            message_id,
            message_type,
            status: MessageStatus::Pending,
            submitter,
            origin_domain,
            created_at: now,
            payload_ref,
            history: vec![StatusChange {
                status: MessageStatus::Pending,
                at: now,
            }],
        }
    }

    /// Check if record is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the message arrived from another domain
    pub fn is_inbound(&self, local: DomainId) -> bool {
        self.origin_domain != local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_ref() {
        let payload = b"pacs.008 body";
        let reference = PayloadRef::of(payload);
        assert_eq!(reference.len, payload.len());
        assert!(reference.matches(payload));
        assert!(!reference.matches(b"pacs.008 bodz"));
    }

    #[test]
    fn test_pending_record() {
        let record = MessageRecord::pending(
            MessageId::from_bytes([1u8; 32]),
            MessageType::credit_transfer(),
            Address::derive("bank-a"),
            DomainId(1),
            PayloadRef::of(&[]),
        );
        assert_eq!(record.status, MessageStatus::Pending);
        assert_eq!(record.history.len(), 1);
        assert!(!record.is_terminal());
        assert!(record.is_inbound(DomainId(2)));
    }
}
