//! Message pipeline and cross-domain routing
//!
//! Provides the components between schema validation and the delivery
//! network:
//! - Type-specific message handlers (credit transfer) with replay protection
//! - The message processor (type → handler, type → required action)
//! - The target registry (handler + domain → remote route)
//! - The message router (outbound delivery, inbound authentication)
//! - The delivery service and origin verifier trust boundaries

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod delivery;
pub mod envelope;
pub mod handlers;
pub mod processor;
pub mod router;
pub mod targets;
pub mod verifier;

pub use delivery::{
    DeliveryReceipt, DeliveryService, FeeSchedule, LoopbackDelivery, Outbox, PendingDelivery,
};
pub use envelope::{envelope_digest, DeliveryEnvelope};
pub use handlers::{AmountBounds, CreditTransfer, CreditTransferHandler, MessageHandler};
pub use processor::{MessageProcessor, RequiredAction};
pub use protocol_core::{Error, Result};
pub use router::{InboundMessage, MessageRouter, RouteRequest};
pub use targets::{RouteKind, TargetRegistry, TargetRoute};
pub use verifier::{sign_delivery, OriginVerifier, SignedRelay, TrustedRelay};
