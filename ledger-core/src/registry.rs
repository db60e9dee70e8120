//! Message registry
//!
//! Owns every message record of the local domain. Identifiers are derived
//! from the submission content and the submitter's nonce, so resubmitting
//! the same instruction with the same nonce is detected as a replay while
//! two distinct submissions in the same ledger unit never collide.

use crate::types::{MessageRecord, PayloadRef, StatusChange};
use chrono::Utc;
use protocol_core::{
    Address, DomainId, Error, Journal, MessageId, MessageStatus, MessageType, Result,
    Transactional,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Domain-separation prefix for message id derivation
const MESSAGE_ID_CONTEXT: &[u8] = b"deltran.rail.message-id.v1";

/// Derive a message identifier.
///
/// Every variable-length input is length-prefixed so that no two distinct
/// submissions share a preimage.
pub fn derive_message_id(
    domain: DomainId,
    submitter: &Address,
    message_type: &MessageType,
    payload: &[u8],
    nonce: u64,
) -> MessageId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(MESSAGE_ID_CONTEXT);
    hasher.update(&domain.get().to_be_bytes());
    hasher.update(submitter.as_bytes());
    hasher.update(&(message_type.as_str().len() as u64).to_be_bytes());
    hasher.update(message_type.as_str().as_bytes());
    hasher.update(&(payload.len() as u64).to_be_bytes());
    hasher.update(payload);
    hasher.update(&nonce.to_be_bytes());
    MessageId::from_bytes(*hasher.finalize().as_bytes())
}

/// Inverse of one registry write
#[derive(Debug, Clone)]
enum Undo {
    Created(MessageId),
    Status(MessageId, MessageStatus),
}

/// Message registry for one domain
#[derive(Debug, Clone)]
pub struct MessageRegistry {
    /// Local routing domain
    domain: DomainId,

    /// Records by id
    records: HashMap<MessageId, MessageRecord>,

    /// Creation order
    order: Vec<MessageId>,

    /// Writes of the open command
    journal: Journal<Undo>,
}

impl MessageRegistry {
    /// Create empty registry for a domain
    pub fn new(domain: DomainId) -> Self {
        Self {
            domain,
            records: HashMap::new(),
            order: Vec::new(),
            journal: Journal::new(),
        }
    }

    /// Local domain
    pub fn domain(&self) -> DomainId {
        self.domain
    }

    /// Create a `Pending` record for a local submission
    pub fn create_record(
        &mut self,
        message_type: MessageType,
        submitter: Address,
        payload: &[u8],
        nonce: u64,
    ) -> Result<MessageId> {
        let message_id = derive_message_id(self.domain, &submitter, &message_type, payload, nonce);
        let record = MessageRecord::pending(
            message_id,
            message_type,
            submitter,
            self.domain,
            PayloadRef::of(payload),
        );
        self.insert(record)?;
        Ok(message_id)
    }

    /// Create a `Pending` record for a message delivered from another domain,
    /// keeping the identifier assigned at the source
    pub fn import_record(
        &mut self,
        message_id: MessageId,
        message_type: MessageType,
        sender: Address,
        origin_domain: DomainId,
        payload: &[u8],
    ) -> Result<()> {
        let record = MessageRecord::pending(
            message_id,
            message_type,
            sender,
            origin_domain,
            PayloadRef::of(payload),
        );
        self.insert(record)
    }

    fn insert(&mut self, record: MessageRecord) -> Result<()> {
        let message_id = record.message_id;
        if self.records.contains_key(&message_id) {
            return Err(Error::DuplicateMessage(message_id));
        }

        info!(
            %message_id,
            message_type = %record.message_type,
            origin = %record.origin_domain,
            "message record created"
        );
        self.records.insert(message_id, record);
        self.order.push(message_id);
        self.journal.record(Undo::Created(message_id));
        Ok(())
    }

    /// Move a record to a new status. Returns the previous status.
    pub fn update_status(
        &mut self,
        message_id: &MessageId,
        status: MessageStatus,
    ) -> Result<MessageStatus> {
        let record = self
            .records
            .get_mut(message_id)
            .ok_or(Error::UnknownMessage(*message_id))?;

        let previous = record.status;
        if !previous.can_transition_to(status) {
            return Err(Error::InvalidTransition {
                from: previous,
                to: status,
            });
        }

        record.status = status;
        record.history.push(StatusChange {
            status,
            at: Utc::now(),
        });
        self.journal.record(Undo::Status(*message_id, previous));
        debug!(%message_id, from = %previous, to = %status, "status updated");
        Ok(previous)
    }

    /// Read-only lookup
    pub fn get_record(&self, message_id: &MessageId) -> Option<&MessageRecord> {
        self.records.get(message_id)
    }

    /// Lookup that fails with `UnknownMessage`
    pub fn record(&self, message_id: &MessageId) -> Result<&MessageRecord> {
        self.get_record(message_id)
            .ok_or(Error::UnknownMessage(*message_id))
    }

    /// Check existence
    pub fn contains(&self, message_id: &MessageId) -> bool {
        self.records.contains_key(message_id)
    }

    /// Records in creation order
    pub fn records(&self) -> impl Iterator<Item = &MessageRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Number of records with the given status
    pub fn count_by_status(&self, status: MessageStatus) -> usize {
        self.records.values().filter(|r| r.status == status).count()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Transactional for MessageRegistry {
    fn begin(&mut self) {
        self.journal.begin();
    }

    fn commit(&mut self) {
        self.journal.commit();
    }

    fn rollback(&mut self) {
        let mut undone = 0usize;
        for undo in self.journal.unwind() {
            match undo {
                Undo::Created(message_id) => {
                    self.records.remove(&message_id);
                    // Records created by the command sit at the tail
                    if self.order.last() == Some(&message_id) {
                        self.order.pop();
                    } else {
                        self.order.retain(|id| *id != message_id);
                    }
                }
                Undo::Status(message_id, previous) => {
                    if let Some(record) = self.records.get_mut(&message_id) {
                        record.status = previous;
                        record.history.pop();
                    }
                }
            }
            undone += 1;
        }
        if undone > 0 {
            debug!(undone, "registry writes rolled back");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MessageRegistry {
        MessageRegistry::new(DomainId(1))
    }

    #[test]
    fn test_create_and_lookup() {
        let mut registry = registry();
        let bank = Address::derive("bank-a");
        let id = registry
            .create_record(MessageType::credit_transfer(), bank, b"payload", 1)
            .unwrap();

        let record = registry.get_record(&id).unwrap();
        assert_eq!(record.status, MessageStatus::Pending);
        assert_eq!(record.submitter, bank);
        assert_eq!(record.origin_domain, DomainId(1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = registry();
        let bank = Address::derive("bank-a");
        let id = registry
            .create_record(MessageType::credit_transfer(), bank, b"payload", 1)
            .unwrap();

        let err = registry
            .create_record(MessageType::credit_transfer(), bank, b"payload", 1)
            .unwrap_err();
        assert_eq!(err, Error::DuplicateMessage(id));
        assert_eq!(registry.len(), 1);

        // Same content, next nonce: a distinct submission
        assert!(registry
            .create_record(MessageType::credit_transfer(), bank, b"payload", 2)
            .is_ok());
    }

    #[test]
    fn test_import_keeps_source_id() {
        let mut registry = registry();
        let id = MessageId::from_bytes([9u8; 32]);
        let sender = Address::derive("remote-router");
        registry
            .import_record(id, MessageType::credit_transfer(), sender, DomainId(2), b"x")
            .unwrap();

        assert!(registry.get_record(&id).unwrap().is_inbound(DomainId(1)));
        assert_eq!(
            registry.import_record(id, MessageType::credit_transfer(), sender, DomainId(2), b"x"),
            Err(Error::DuplicateMessage(id))
        );
    }

    #[test]
    fn test_status_monotonic() {
        let mut registry = registry();
        let id = registry
            .create_record(MessageType::credit_transfer(), Address::derive("b"), b"p", 0)
            .unwrap();

        assert_eq!(
            registry.update_status(&id, MessageStatus::Validated),
            Ok(MessageStatus::Pending)
        );
        assert_eq!(
            registry.update_status(&id, MessageStatus::Completed),
            Ok(MessageStatus::Validated)
        );
        assert_eq!(
            registry.update_status(&id, MessageStatus::Failed),
            Err(Error::InvalidTransition {
                from: MessageStatus::Completed,
                to: MessageStatus::Failed
            })
        );

        let record = registry.get_record(&id).unwrap();
        assert_eq!(record.history.len(), 3);
        assert_eq!(registry.count_by_status(MessageStatus::Completed), 1);
    }

    #[test]
    fn test_unknown_message() {
        let mut registry = registry();
        let id = MessageId::from_bytes([3u8; 32]);
        assert_eq!(
            registry.update_status(&id, MessageStatus::Validated),
            Err(Error::UnknownMessage(id))
        );
        assert!(registry.record(&id).is_err());
    }

    #[test]
    fn test_rollback_undoes_command_writes() {
        let mut registry = registry();
        let bank = Address::derive("bank-a");
        let kept = registry
            .create_record(MessageType::credit_transfer(), bank, b"first", 1)
            .unwrap();

        registry.begin();
        registry.update_status(&kept, MessageStatus::Validated).unwrap();
        let created = registry
            .create_record(MessageType::credit_transfer(), bank, b"second", 1)
            .unwrap();
        registry.update_status(&created, MessageStatus::Validated).unwrap();
        registry.rollback();

        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(&created));
        let record = registry.get_record(&kept).unwrap();
        assert_eq!(record.status, MessageStatus::Pending);
        assert_eq!(record.history.len(), 1);
        assert_eq!(registry.records().count(), 1);

        // The rolled-back submission can be made again
        assert_eq!(
            registry.create_record(MessageType::credit_transfer(), bank, b"second", 1),
            Ok(created)
        );
    }

    #[test]
    fn test_commit_keeps_writes() {
        let mut registry = registry();
        registry.begin();
        let id = registry
            .create_record(MessageType::credit_transfer(), Address::derive("b"), b"p", 0)
            .unwrap();
        registry.commit();
        registry.rollback();

        assert!(registry.contains(&id));
    }
}
