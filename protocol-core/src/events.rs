//! Audit events
//!
//! Events are append-only audit signals. Nothing in the rail reads them to
//! make decisions; they exist for operators, reconciliation and tests.

use crate::access::Capability;
use crate::journal::Transactional;
use crate::types::{Address, DomainId, MessageId, MessageStatus, MessageType, SettlementId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event emitted by a rail component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// Schema registered or overwritten
    SchemaRegistered {
        /// Message type
        message_type: MessageType,
        /// Number of required fields
        required_fields: usize,
    },
    /// Handler registered for a message type
    HandlerRegistered {
        /// Message type
        message_type: MessageType,
        /// Handler address
        handler: Address,
    },
    /// Post-processing action set for a message type
    RequiredActionSet {
        /// Message type
        message_type: MessageType,
        /// Action label
        action: String,
    },
    /// Route registered or overwritten
    TargetRegistered {
        /// Local handler address
        handler: Address,
        /// Destination domain
        domain: DomainId,
        /// Remote target address
        target: Address,
    },
    /// Trusted origin sender set for a source domain
    TrustedOriginSet {
        /// Source domain
        domain: DomainId,
        /// Sender address
        sender: Address,
        /// Trusted or untrusted
        trusted: bool,
    },
    /// Capability granted
    CapabilityGranted {
        /// Account
        account: Address,
        /// Capability
        capability: Capability,
    },
    /// Capability revoked
    CapabilityRevoked {
        /// Account
        account: Address,
        /// Capability
        capability: Capability,
    },
    /// Component paused
    Paused {
        /// Component name
        component: String,
        /// Caller
        by: Address,
    },
    /// Component unpaused
    Unpaused {
        /// Component name
        component: String,
        /// Caller
        by: Address,
    },
    /// Message settled by its handler
    MessageCompleted {
        /// Message identifier
        message_id: MessageId,
        /// Settlement identifier
        settlement_id: SettlementId,
        /// Debtor agent
        debtor: Address,
        /// Creditor agent
        creditor: Address,
        /// Asset
        asset: Address,
        /// Amount (minor units)
        amount: u128,
        /// Instruction identifier
        instruction_id: [u8; 32],
    },
    /// Message handed to the delivery service
    MessageRouted {
        /// Message identifier
        message_id: MessageId,
        /// Destination domain
        domain: DomainId,
        /// Remote target
        target: Address,
        /// Fee paid
        fee: u128,
    },
    /// Inbound delivery accepted
    MessageReceived {
        /// Message identifier (as assigned by the source domain)
        message_id: MessageId,
        /// Source domain
        domain: DomainId,
        /// Source sender
        sender: Address,
    },
    /// Message record status changed
    StatusChanged {
        /// Message identifier
        message_id: MessageId,
        /// New status
        status: MessageStatus,
    },
}

/// Sequenced event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number (starting at 1)
    pub sequence: u64,
    /// Emission timestamp
    pub emitted_at: DateTime<Utc>,
    /// Event payload
    pub event: ProtocolEvent,
}

/// Append-only event log
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,

    /// Length at the start of the open command
    mark: Option<usize>,
}

impl EventLog {
    /// Create empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning its sequence number
    pub fn emit(&mut self, event: ProtocolEvent) -> u64 {
        let sequence = self.records.len() as u64 + 1;
        tracing::debug!(sequence, ?event, "event emitted");
        self.records.push(EventRecord {
            sequence,
            emitted_at: Utc::now(),
            event,
        });
        sequence
    }

    /// Events with a sequence number strictly greater than `sequence`
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = (sequence as usize).min(self.records.len());
        &self.records[start..]
    }

    /// All events
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Sequence number of the latest event (0 when empty)
    pub fn last_sequence(&self) -> u64 {
        self.records.len() as u64
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Completion events only
    pub fn completions(&self) -> impl Iterator<Item = &ProtocolEvent> {
        self.records
            .iter()
            .map(|r| &r.event)
            .filter(|e| matches!(e, ProtocolEvent::MessageCompleted { .. }))
    }
}

impl Transactional for EventLog {
    fn begin(&mut self) {
        self.mark = Some(self.records.len());
    }

    fn commit(&mut self) {
        self.mark = None;
    }

    /// Drop every event emitted since `begin`
    fn rollback(&mut self) {
        if let Some(mark) = self.mark.take() {
            self.records.truncate(mark);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequencing() {
        let mut log = EventLog::new();
        let first = log.emit(ProtocolEvent::Paused {
            component: "router".into(),
            by: Address::derive("ops"),
        });
        let second = log.emit(ProtocolEvent::Unpaused {
            component: "router".into(),
            by: Address::derive("ops"),
        });

        assert_eq!((first, second), (1, 2));
        assert_eq!(log.since(1).len(), 1);
        assert_eq!(log.since(5).len(), 0);
        assert_eq!(log.completions().count(), 0);
    }

    #[test]
    fn test_rollback_truncates_to_mark() {
        let ops = Address::derive("ops");
        let mut log = EventLog::new();
        log.emit(ProtocolEvent::Paused {
            component: "router".into(),
            by: ops,
        });

        log.begin();
        log.emit(ProtocolEvent::Unpaused {
            component: "router".into(),
            by: ops,
        });
        log.rollback();
        assert_eq!(log.len(), 1);

        // Sequence numbers continue from the surviving tail
        log.begin();
        assert_eq!(
            log.emit(ProtocolEvent::Unpaused {
                component: "router".into(),
                by: ops,
            }),
            2
        );
        log.commit();
        log.rollback();
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_event_json_shape() {
        let event = ProtocolEvent::SchemaRegistered {
            message_type: MessageType::credit_transfer(),
            required_fields: 5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["schema_registered"]["message_type"], "pacs.008");
        assert_eq!(json["schema_registered"]["required_fields"], 5);
    }
}
