//! Error types for protocol operations
//!
//! One taxonomy is shared by every component of the rail so that a failure
//! raised deep inside a handler reaches the submitter unchanged.

use crate::access::Capability;
use crate::types::{MessageId, MessageStatus, MessageType};
use thiserror::Error;

/// Protocol result type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed payload or field value
    Format,
    /// Missing capability or untrusted origin
    Authorization,
    /// Replayed message identifier
    Duplication,
    /// Liquidity, routing or fee shortfall
    Resource,
    /// Paused component or administrative refusal
    Administrative,
    /// Envelope, delivery or configuration fault
    Internal,
}

impl ErrorKind {
    /// Stable label (used as a metrics dimension)
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Format => "format",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Duplication => "duplication",
            ErrorKind::Resource => "resource",
            ErrorKind::Administrative => "administrative",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No schema registered for the message type
    #[error("Unknown message type: {0}")]
    UnknownMessageType(MessageType),

    /// A required field tag is absent from the payload
    #[error("Missing required field {field} for {message_type}")]
    MissingRequiredField {
        /// Message type being validated
        message_type: MessageType,
        /// Absent field tag
        field: String,
    },

    /// Message identifier already recorded or already settled
    #[error("Duplicate message: {0}")]
    DuplicateMessage(MessageId),

    /// Status change would regress or leave a terminal state
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current status
        from: MessageStatus,
        /// Requested status
        to: MessageStatus,
    },

    /// No record for the message identifier
    #[error("Unknown message: {0}")]
    UnknownMessage(MessageId),

    /// Processor has no handler for the message type
    #[error("No handler registered for {0}")]
    NoHandlerRegistered(MessageType),

    /// Payload length does not match the fixed field layout
    #[error("Invalid payload length: expected {expected} bytes, got {actual}")]
    InvalidPayloadLength {
        /// Expected byte length
        expected: usize,
        /// Actual byte length
        actual: usize,
    },

    /// Field values are structurally invalid (null identities etc.)
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// Amount outside the accepted bounds
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Liquidity pool could not complete the transfer
    #[error("Settlement failed: {0}")]
    SettlementFailed(String),

    /// A settlement for the same message is already executing
    #[error("Settlement already in flight for {0}")]
    SettlementInProgress(MessageId),

    /// No target registered for the handler/domain pair
    #[error("Route not found: handler {handler} on domain {domain}")]
    RouteNotFound {
        /// Handler address (hex)
        handler: String,
        /// Routing domain
        domain: u32,
    },

    /// Supplied delivery fee is below the quote
    #[error("Insufficient fee: required {required}, supplied {supplied}")]
    InsufficientFee {
        /// Quoted fee
        required: u128,
        /// Fee supplied by the caller
        supplied: u128,
    },

    /// Inbound delivery sender is not trusted for its source domain
    #[error("Unauthorized origin: sender {sender} on domain {domain}")]
    UnauthorizedOrigin {
        /// Source domain
        domain: u32,
        /// Claimed sender (hex)
        sender: String,
    },

    /// Relay proof rejected by the origin verifier
    #[error("Invalid delivery proof from domain {0}")]
    InvalidDeliveryProof(u32),

    /// Caller lacks the capability required by the entry point
    #[error("Unauthorized: caller {caller} lacks {capability:?}")]
    Unauthorized {
        /// Caller address (hex)
        caller: String,
        /// Required capability
        capability: Capability,
    },

    /// Component is paused
    #[error("Paused: {0}")]
    Paused(String),

    /// Component entered while already executing
    #[error("Re-entrant call rejected: {0}")]
    Reentrancy(String),

    /// Message type requires routing but no remote destination was given
    #[error("Missing destination for {0}")]
    MissingDestination(MessageType),

    /// External delivery service refused the message
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Delivery envelope could not be encoded or decoded
    #[error("Envelope error: {0}")]
    Envelope(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownMessageType(_)
            | Error::MissingRequiredField { .. }
            | Error::InvalidPayloadLength { .. }
            | Error::InvalidMessageFormat(_)
            | Error::InvalidAmount(_)
            | Error::MissingDestination(_) => ErrorKind::Format,

            Error::Unauthorized { .. }
            | Error::UnauthorizedOrigin { .. }
            | Error::InvalidDeliveryProof(_) => ErrorKind::Authorization,

            Error::DuplicateMessage(_) | Error::SettlementInProgress(_) => ErrorKind::Duplication,

            Error::SettlementFailed(_)
            | Error::RouteNotFound { .. }
            | Error::InsufficientFee { .. }
            | Error::NoHandlerRegistered(_)
            | Error::UnknownMessage(_) => ErrorKind::Resource,

            Error::Paused(_) | Error::Reentrancy(_) | Error::InvalidTransition { .. } => {
                ErrorKind::Administrative
            }

            Error::Delivery(_) | Error::Envelope(_) | Error::Config(_) => ErrorKind::Internal,
        }
    }
}
