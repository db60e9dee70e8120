//! External delivery service interface
//!
//! The rail consumes an authenticated-delivery service; it does not
//! implement one. [`LoopbackDelivery`] is an in-process stand-in: it prices
//! deliveries with a linear fee schedule and parks them in a shared outbox
//! from which a relay task (or a test) hands them to the destination ledger.

use crate::envelope::envelope_digest;
use crate::verifier::sign_delivery;
use chrono::{DateTime, Utc};
use ed25519_dalek::SigningKey;
use parking_lot::Mutex;
use protocol_core::{Address, DomainId, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Proof that the delivery service accepted a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Delivery identifier assigned by the service
    pub delivery_id: Uuid,

    /// Destination domain
    pub domain: DomainId,

    /// Destination address
    pub target: Address,

    /// Fee charged
    pub fee: u128,

    /// SHA-256 of the transported bytes
    pub payload_digest: [u8; 32],

    /// Acceptance timestamp
    pub sent_at: DateTime<Utc>,
}

/// Authenticated-delivery service
pub trait DeliveryService: fmt::Debug + Send {
    /// Fee for delivering `payload_len` bytes to `domain`
    fn quote(&self, domain: DomainId, payload_len: usize) -> u128;

    /// Hand a payload to the service
    fn send(
        &mut self,
        domain: DomainId,
        sender: Address,
        target: Address,
        payload: &[u8],
        fee: u128,
    ) -> Result<DeliveryReceipt>;

    /// Clone into a box
    fn clone_box(&self) -> Box<dyn DeliveryService>;
}

impl Clone for Box<dyn DeliveryService> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Delivery waiting in the loopback outbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelivery {
    /// Delivery identifier
    pub delivery_id: Uuid,

    /// Origin domain
    pub source_domain: DomainId,

    /// Sending router
    pub sender: Address,

    /// Destination domain
    pub target_domain: DomainId,

    /// Destination address
    pub target: Address,

    /// Transported bytes
    pub payload: Vec<u8>,

    /// Relay proof (empty when the relay does not sign)
    pub proof: Vec<u8>,
}

/// Shared FIFO of pending deliveries
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    inner: Arc<Mutex<VecDeque<PendingDelivery>>>,
}

impl Outbox {
    /// Create empty outbox
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, delivery: PendingDelivery) {
        self.inner.lock().push_back(delivery);
    }

    /// Take the oldest delivery
    pub fn pop(&self) -> Option<PendingDelivery> {
        self.inner.lock().pop_front()
    }

    /// Take the oldest delivery addressed to `domain`, leaving the rest queued
    pub fn pop_for(&self, domain: DomainId) -> Option<PendingDelivery> {
        let mut inner = self.inner.lock();
        let index = inner.iter().position(|d| d.target_domain == domain)?;
        inner.remove(index)
    }

    /// Put a delivery that could not be handed over back at the head
    pub fn requeue(&self, delivery: PendingDelivery) {
        debug!(delivery_id = %delivery.delivery_id, "delivery requeued");
        self.inner.lock().push_front(delivery);
    }

    /// Number of pending deliveries
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// Linear fee schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Flat fee per delivery
    pub base_fee: u128,

    /// Fee per transported byte
    pub per_byte_fee: u128,
}

impl FeeSchedule {
    /// Fee for a payload length
    pub fn fee_for(&self, payload_len: usize) -> u128 {
        self.per_byte_fee
            .saturating_mul(payload_len as u128)
            .saturating_add(self.base_fee)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            base_fee: 1_000,
            per_byte_fee: 10,
        }
    }
}

/// In-process delivery service
#[derive(Debug, Clone)]
pub struct LoopbackDelivery {
    source_domain: DomainId,
    fees: FeeSchedule,
    outbox: Outbox,
    relay_key: Option<SigningKey>,
    reachable: Option<HashSet<DomainId>>,
}

impl LoopbackDelivery {
    /// Create service for a source domain
    pub fn new(source_domain: DomainId, fees: FeeSchedule) -> Self {
        Self {
            source_domain,
            fees,
            outbox: Outbox::new(),
            relay_key: None,
            reachable: None,
        }
    }

    /// Sign every delivery with a relay key
    pub fn with_relay_key(mut self, key: SigningKey) -> Self {
        self.relay_key = Some(key);
        self
    }

    /// Only accept deliveries to the listed domains
    pub fn with_reachable(mut self, domains: impl IntoIterator<Item = DomainId>) -> Self {
        self.reachable = Some(domains.into_iter().collect());
        self
    }

    /// Use an existing outbox (several services feeding one relay)
    pub fn with_outbox(mut self, outbox: Outbox) -> Self {
        self.outbox = outbox;
        self
    }

    /// Outbox handle
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Fee schedule
    pub fn fees(&self) -> FeeSchedule {
        self.fees
    }
}

impl DeliveryService for LoopbackDelivery {
    fn quote(&self, _domain: DomainId, payload_len: usize) -> u128 {
        self.fees.fee_for(payload_len)
    }

    fn send(
        &mut self,
        domain: DomainId,
        sender: Address,
        target: Address,
        payload: &[u8],
        fee: u128,
    ) -> Result<DeliveryReceipt> {
        if let Some(reachable) = &self.reachable {
            if !reachable.contains(&domain) {
                return Err(Error::Delivery(format!("{} is not reachable", domain)));
            }
        }

        let required = self.quote(domain, payload.len());
        if fee < required {
            return Err(Error::InsufficientFee {
                required,
                supplied: fee,
            });
        }

        let proof = self
            .relay_key
            .as_ref()
            .map(|key| sign_delivery(key, self.source_domain, &sender, payload))
            .unwrap_or_default();

        let delivery_id = Uuid::new_v4();
        self.outbox.push(PendingDelivery {
            delivery_id,
            source_domain: self.source_domain,
            sender,
            target_domain: domain,
            target,
            payload: payload.to_vec(),
            proof,
        });

        debug!(%delivery_id, pending = self.outbox.len(), "delivery queued");
        info!(%delivery_id, %domain, %target, fee, "delivery accepted");

        Ok(DeliveryReceipt {
            delivery_id,
            domain,
            target,
            fee,
            payload_digest: envelope_digest(payload),
            sent_at: Utc::now(),
        })
    }

    fn clone_box(&self) -> Box<dyn DeliveryService> {
        Box::new(self.clone())
    }
}
