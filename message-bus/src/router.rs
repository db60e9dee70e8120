//! Message router
//!
//! Outbound: resolve the target, price the delivery, hand the envelope to
//! the delivery service and mark the record `Routed`.
//!
//! Inbound: authenticate the delivery (caller, pause state, origin
//! allow-list, relay proof, envelope) and return the authenticated message.
//! The coordinator then runs it through the same validation and settlement
//! pipeline as a local submission.

use crate::delivery::{DeliveryReceipt, DeliveryService};
use crate::envelope::DeliveryEnvelope;
use crate::handlers::emit_pause_change;
use crate::targets::{TargetRegistry, TargetRoute};
use crate::verifier::OriginVerifier;
use ledger_core::{MessageRecord, MessageRegistry};
use protocol_core::{
    Address, CallContext, Capability, DomainId, Error, MessageId, MessageStatus, PauseSwitch,
    ProtocolEvent, ReentrancyGuard, Result,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Authenticated inbound delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Source domain
    pub source_domain: DomainId,

    /// Sending router at the source
    pub sender: Address,

    /// Decoded envelope
    pub envelope: DeliveryEnvelope,
}

/// Outbound routing request
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'p> {
    /// Message to route
    pub message_id: MessageId,

    /// Local handler whose route table entry is used
    pub handler: Address,

    /// Destination domain
    pub target_domain: DomainId,

    /// Original payload
    pub payload: &'p [u8],

    /// Fee offered by the caller
    pub fee: u128,
}

/// Message router
#[derive(Debug, Clone)]
pub struct MessageRouter {
    address: Address,
    local_domain: DomainId,
    targets: TargetRegistry,
    delivery: Box<dyn DeliveryService>,
    verifier: Box<dyn OriginVerifier>,
    trusted_origins: HashMap<DomainId, HashSet<Address>>,
    pause: PauseSwitch,
    guard: ReentrancyGuard,
}

impl MessageRouter {
    /// Create router
    pub fn new(
        address: Address,
        local_domain: DomainId,
        delivery: Box<dyn DeliveryService>,
        verifier: Box<dyn OriginVerifier>,
    ) -> Self {
        Self {
            address,
            local_domain,
            targets: TargetRegistry::new(),
            delivery,
            verifier,
            trusted_origins: HashMap::new(),
            pause: PauseSwitch::new("message-router"),
            guard: ReentrancyGuard::new("message-router"),
        }
    }

    /// Router identity (the sender seen by remote domains)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Local domain
    pub fn local_domain(&self) -> DomainId {
        self.local_domain
    }

    /// Route table
    pub fn targets(&self) -> &TargetRegistry {
        &self.targets
    }

    /// Register or overwrite a route (admin only)
    pub fn register_target(
        &mut self,
        ctx: &mut CallContext<'_>,
        handler: Address,
        domain: DomainId,
        route: TargetRoute,
    ) -> Result<()> {
        self.targets.register_target(ctx, handler, domain, route)
    }

    /// Trust or distrust a sender for a source domain (admin only)
    pub fn set_trusted_origin(
        &mut self,
        ctx: &mut CallContext<'_>,
        domain: DomainId,
        sender: Address,
        trusted: bool,
    ) -> Result<()> {
        ctx.require(Capability::Admin)?;
        if trusted {
            self.trusted_origins.entry(domain).or_default().insert(sender);
        } else if let Some(senders) = self.trusted_origins.get_mut(&domain) {
            senders.remove(&sender);
        }

        info!(%domain, %sender, trusted, "trusted origin updated");
        ctx.emit(ProtocolEvent::TrustedOriginSet {
            domain,
            sender,
            trusted,
        });
        Ok(())
    }

    /// Check the origin allow-list
    pub fn is_trusted_origin(&self, domain: DomainId, sender: &Address) -> bool {
        self.trusted_origins
            .get(&domain)
            .map(|senders| senders.contains(sender))
            .unwrap_or(false)
    }

    /// Pause (requires `EmergencyPause`)
    pub fn pause(&mut self, ctx: &mut CallContext<'_>) -> Result<bool> {
        let changed = self.pause.pause(ctx.access, &ctx.caller)?;
        emit_pause_change(ctx, self.pause.component(), true, changed);
        Ok(changed)
    }

    /// Unpause (requires `Admin`)
    pub fn unpause(&mut self, ctx: &mut CallContext<'_>) -> Result<bool> {
        let changed = self.pause.unpause(ctx.access, &ctx.caller)?;
        emit_pause_change(ctx, self.pause.component(), false, changed);
        Ok(changed)
    }

    /// Check pause state
    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    /// Delivery fee for an envelope
    pub fn quote(&self, target_domain: DomainId, envelope: &DeliveryEnvelope) -> Result<u128> {
        let bytes = envelope.encode()?;
        Ok(self.delivery.quote(target_domain, bytes.len()))
    }

    /// Envelope carrying a local record's payload
    pub fn envelope_for(&self, record: &MessageRecord, payload: &[u8]) -> DeliveryEnvelope {
        DeliveryEnvelope {
            message_id: record.message_id,
            message_type: record.message_type.clone(),
            origin_domain: self.local_domain,
            submitter: record.submitter,
            body: payload.to_vec(),
        }
    }

    /// Route a message to a remote domain (caller must hold `Submit`)
    pub fn route(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut MessageRegistry,
        request: RouteRequest<'_>,
    ) -> Result<DeliveryReceipt> {
        ctx.require(Capability::Submit)?;
        self.pause.ensure_active()?;
        self.guard.enter()?;
        let result = self.route_inner(ctx, registry, request);
        self.guard.exit();
        result
    }

    fn route_inner(
        &mut self,
        ctx: &mut CallContext<'_>,
        registry: &mut MessageRegistry,
        request: RouteRequest<'_>,
    ) -> Result<DeliveryReceipt> {
        let RouteRequest {
            message_id,
            handler,
            target_domain,
            payload,
            fee,
        } = request;

        if target_domain == self.local_domain {
            return Err(Error::Config(format!(
                "{} is the local domain",
                target_domain
            )));
        }

        let target = self.targets.resolve(&handler, target_domain)?.target_address;
        let bytes = self
            .envelope_for(registry.record(&message_id)?, payload)
            .encode()?;

        let required = self.delivery.quote(target_domain, bytes.len());
        if fee < required {
            warn!(%message_id, required, supplied = fee, "delivery fee too low");
            return Err(Error::InsufficientFee {
                required,
                supplied: fee,
            });
        }

        // Last fallible local write before the external hand-off
        registry.update_status(&message_id, MessageStatus::Routed)?;
        let receipt = self
            .delivery
            .send(target_domain, self.address, target, &bytes, fee)?;

        ctx.emit(ProtocolEvent::StatusChanged {
            message_id,
            status: MessageStatus::Routed,
        });
        ctx.emit(ProtocolEvent::MessageRouted {
            message_id,
            domain: target_domain,
            target,
            fee,
        });

        info!(%message_id, domain = %target_domain, %target, fee, "message routed");
        Ok(receipt)
    }

    /// Authenticate an inbound delivery (caller must hold `Deliver`).
    ///
    /// A routed message is settled twice, once per domain: the source settles
    /// it against its own pool before routing, and the destination settles it
    /// again against its pool when the delivery arrives. Each side's
    /// processed-message set still admits the id only once.
    pub fn receive_message(
        &mut self,
        ctx: &mut CallContext<'_>,
        source_domain: DomainId,
        sender: Address,
        payload: &[u8],
        proof: &[u8],
    ) -> Result<InboundMessage> {
        ctx.require(Capability::Deliver)?;
        self.pause.ensure_active()?;
        self.guard.enter()?;
        let result = self.authenticate(source_domain, sender, payload, proof);
        self.guard.exit();

        let inbound = result?;
        ctx.emit(ProtocolEvent::MessageReceived {
            message_id: inbound.envelope.message_id,
            domain: source_domain,
            sender,
        });
        info!(
            message_id = %inbound.envelope.message_id,
            domain = %source_domain,
            %sender,
            "inbound delivery accepted"
        );
        Ok(inbound)
    }

    fn authenticate(
        &self,
        source_domain: DomainId,
        sender: Address,
        payload: &[u8],
        proof: &[u8],
    ) -> Result<InboundMessage> {
        if !self.is_trusted_origin(source_domain, &sender) {
            warn!(domain = %source_domain, %sender, "delivery from untrusted origin");
            return Err(Error::UnauthorizedOrigin {
                domain: source_domain.get(),
                sender: sender.to_string(),
            });
        }

        if !self.verifier.verify(source_domain, &sender, payload, proof) {
            warn!(domain = %source_domain, %sender, "delivery proof rejected");
            return Err(Error::InvalidDeliveryProof(source_domain.get()));
        }

        let envelope = DeliveryEnvelope::decode(payload)?;
        if envelope.origin_domain != source_domain {
            return Err(Error::Envelope(format!(
                "envelope claims {} but arrived from {}",
                envelope.origin_domain, source_domain
            )));
        }

        debug!(message_id = %envelope.message_id, "delivery authenticated");
        Ok(InboundMessage {
            source_domain,
            sender,
            envelope,
        })
    }
}
