//! Core types for the settlement controller

use chrono::{DateTime, Utc};
use protocol_core::{Address, MessageId, SettlementId};
use serde::{Deserialize, Serialize};

/// Completed settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// Message that triggered the settlement
    pub message_id: MessageId,

    /// Settlement identifier (never zero)
    pub settlement_id: SettlementId,

    /// Asset moved
    pub asset: Address,

    /// Amount moved (minor units)
    pub amount: u128,

    /// Credited party
    pub beneficiary: Address,

    /// Completion timestamp
    pub settled_at: DateTime<Utc>,
}
