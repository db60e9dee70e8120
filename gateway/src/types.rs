//! Gateway request and response types

use bytes::Bytes;
use message_bus::{DeliveryReceipt, MessageHandler, PendingDelivery, RequiredAction, TargetRoute};
use protocol_core::{
    Address, Capability, DomainId, FieldTag, MessageId, MessageStatus, MessageType, SettlementId,
};

/// Addresses of the components of one domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identities {
    /// Genesis administrator
    pub admin: Address,

    /// Delivery service principal (holds `Deliver`)
    pub relay: Address,

    /// Message processor (holds `ProcessorInvoke`)
    pub processor: Address,

    /// Message router (the sender seen by remote domains)
    pub router: Address,

    /// Credit-transfer handler (holds `SettlementInvoke`)
    pub credit_transfer_handler: Address,
}

impl Identities {
    /// Derive component addresses for a domain
    pub fn for_domain(domain: DomainId, admin: Address, relay: Address) -> Self {
        let component = |name: &str| Address::derive(&format!("{}/{}", domain, name));
        Self {
            admin,
            relay,
            processor: component("processor"),
            router: component("router"),
            credit_transfer_handler: component("credit-transfer-handler"),
        }
    }
}

/// Message submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Message type tag
    pub message_type: MessageType,

    /// Fixed-layout payload
    pub payload: Vec<u8>,

    /// Submitter nonce (distinguishes repeated identical instructions)
    pub nonce: u64,

    /// Remote destination, if the message leaves the domain
    pub destination: Option<DomainId>,

    /// Delivery fee offered (ignored for local messages)
    pub fee: u128,
}

impl Submission {
    /// Local submission
    pub fn new(message_type: MessageType, payload: Vec<u8>, nonce: u64) -> Self {
        Self {
            message_type,
            payload,
            nonce,
            destination: None,
            fee: 0,
        }
    }

    /// Forward to a remote domain, offering `fee`
    pub fn to_domain(mut self, domain: DomainId, fee: u128) -> Self {
        self.destination = Some(domain);
        self.fee = fee;
        self
    }
}

/// Outcome of an accepted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Message identifier
    pub message_id: MessageId,

    /// Status after processing (`Completed` or `Routed`)
    pub status: MessageStatus,

    /// Settlement performed by the handler
    pub settlement_id: Option<SettlementId>,

    /// Delivery receipt, when the message was routed
    pub delivery: Option<DeliveryReceipt>,
}

/// Inbound cross-domain delivery as handed over by the delivery service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundDelivery {
    /// Source domain
    pub source_domain: DomainId,

    /// Sending router at the source
    pub sender: Address,

    /// Encoded envelope
    pub payload: Vec<u8>,

    /// Relay proof
    pub proof: Vec<u8>,
}

impl From<PendingDelivery> for InboundDelivery {
    fn from(delivery: PendingDelivery) -> Self {
        Self {
            source_domain: delivery.source_domain,
            sender: delivery.sender,
            payload: delivery.payload,
            proof: delivery.proof,
        }
    }
}

/// Administrative command
#[derive(Debug, Clone)]
pub enum AdminCommand {
    /// Register (or overwrite) a message schema
    RegisterMessageFormat {
        /// Message type
        message_type: MessageType,
        /// Required fields, in layout order
        required_fields: Vec<FieldTag>,
        /// Opaque schema descriptor
        descriptor: Bytes,
    },

    /// Install a handler and register it for its message type
    InstallHandler(Box<dyn MessageHandler>),

    /// Point a message type at an installed handler
    RegisterMessageHandler {
        /// Message type
        message_type: MessageType,
        /// Handler address
        handler: Address,
    },

    /// Set the post-processing action for a message type
    SetRequiredAction {
        /// Message type
        message_type: MessageType,
        /// Action
        action: RequiredAction,
    },

    /// Register (or overwrite) a route
    RegisterTarget {
        /// Local handler
        handler: Address,
        /// Destination domain
        domain: DomainId,
        /// Route
        route: TargetRoute,
    },

    /// Trust or distrust a remote sender
    SetTrustedOrigin {
        /// Source domain
        domain: DomainId,
        /// Sender address
        sender: Address,
        /// Trusted or untrusted
        trusted: bool,
    },

    /// Grant a capability
    Grant {
        /// Account
        account: Address,
        /// Capability
        capability: Capability,
    },

    /// Revoke a capability
    Revoke {
        /// Account
        account: Address,
        /// Capability
        capability: Capability,
    },

    /// Pause an installed handler
    PauseHandler(Address),

    /// Unpause an installed handler
    UnpauseHandler(Address),

    /// Pause the router
    PauseRouter,

    /// Unpause the router
    UnpauseRouter,
}

impl AdminCommand {
    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::RegisterMessageFormat { .. } => "register_message_format",
            Self::InstallHandler(_) => "install_handler",
            Self::RegisterMessageHandler { .. } => "register_message_handler",
            Self::SetRequiredAction { .. } => "set_required_action",
            Self::RegisterTarget { .. } => "register_target",
            Self::SetTrustedOrigin { .. } => "set_trusted_origin",
            Self::Grant { .. } => "grant",
            Self::Revoke { .. } => "revoke",
            Self::PauseHandler(_) => "pause_handler",
            Self::UnpauseHandler(_) => "unpause_handler",
            Self::PauseRouter => "pause_router",
            Self::UnpauseRouter => "unpause_router",
        }
    }
}
