//! Core identity and lifecycle types shared by every component
//!
//! Identities are fixed 32-byte values, matching the field width of the
//! wire format, so a decoded field converts into an identity without copying
//! through an intermediate representation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Width of every identity and field value on the wire
pub const IDENTITY_LEN: usize = 32;

/// 32-byte participant, asset, handler or contract identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; IDENTITY_LEN]);

impl Address {
    /// The null identity
    pub const ZERO: Address = Address([0u8; IDENTITY_LEN]);

    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a stable address from a human-readable label (BIC, LEI, service name)
    pub fn derive(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Check for the null identity
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; IDENTITY_LEN]
    }

    /// Parse from a 64-character hex string (optional `0x` prefix)
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).ok()?;
        let bytes: [u8; IDENTITY_LEN] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

impl FromStr for Address {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::from_hex(s).ok_or_else(|| crate::Error::Config(format!("invalid address: {}", s)))
    }
}

/// Globally unique message identifier (BLAKE3 digest of submission content + nonce)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId([u8; IDENTITY_LEN]);

impl MessageId {
    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..12]))
    }
}

/// Routing domain (independent settlement chain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(pub u32);

impl DomainId {
    /// Numeric value
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "domain-{}", self.0)
    }
}

/// Message type tag (e.g. `pacs.008` for FI-to-FI credit transfer)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageType(String);

impl MessageType {
    /// ISO 20022 FI-to-FI customer credit transfer
    pub const CREDIT_TRANSFER: &'static str = "pacs.008";

    /// Create new message type
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Credit transfer message type
    pub fn credit_transfer() -> Self {
        Self::new(Self::CREDIT_TRANSFER)
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageStatus {
    /// Record created, nothing validated yet
    Pending = 1,
    /// Schema validation passed
    Validated = 2,
    /// Handed to the delivery service for another domain
    Routed = 3,
    /// Processing finished (terminal)
    Completed = 4,
    /// Processing failed (terminal)
    Failed = 5,
}

impl MessageStatus {
    /// Check if status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Completed | MessageStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            MessageStatus::Pending => 0,
            MessageStatus::Validated => 1,
            MessageStatus::Routed => 2,
            MessageStatus::Completed => 3,
            MessageStatus::Failed => 3,
        }
    }

    /// Check if transition is valid (monotonic, never out of a terminal state)
    pub fn can_transition_to(&self, next: MessageStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == MessageStatus::Failed || next.rank() > self.rank()
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MessageStatus::Pending => "PENDING",
            MessageStatus::Validated => "VALIDATED",
            MessageStatus::Routed => "ROUTED",
            MessageStatus::Completed => "COMPLETED",
            MessageStatus::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// Settlement identifier returned by the settlement controller.
///
/// The nil UUID plays the role of the "zero" identifier and never counts as
/// a successful settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettlementId(Uuid);

impl SettlementId {
    /// The unsuccessful (zero) identifier
    pub fn zero() -> Self {
        Self(Uuid::nil())
    }

    /// Generate a fresh time-ordered identifier
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Zero identifiers are never successful
    pub fn is_zero(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
