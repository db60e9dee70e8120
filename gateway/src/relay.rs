//! In-process relay between two domains
//!
//! Takes deliveries addressed to the destination domain off the source's
//! loopback outbox one at a time, hands each to the destination ledger and
//! reports the outcome back to the source with `acknowledge_delivery`.
//!
//! A delivery leaves the outbox for good only once the destination has
//! given a verdict. If the destination actor is unreachable the delivery is
//! put back at the head of the outbox and the relay stops.

use crate::actor::LedgerHandle;
use crate::{Error, Result};
use message_bus::{DeliveryEnvelope, Outbox};
use protocol_core::{Address, MessageId};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one forwarded delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    /// Delivery identifier assigned by the source delivery service
    pub delivery_id: Uuid,

    /// Message identifier, when the envelope could be read
    pub message_id: Option<MessageId>,

    /// Destination verdict
    pub result: std::result::Result<crate::SubmissionReceipt, protocol_core::Error>,
}

/// Relay from one source domain to one destination domain
#[derive(Debug, Clone)]
pub struct Relay {
    source: LedgerHandle,
    outbox: Outbox,
    destination: LedgerHandle,
    principal: Address,
}

impl Relay {
    /// Create relay. `principal` must hold `Deliver` on both ledgers.
    pub fn new(
        source: LedgerHandle,
        outbox: Outbox,
        destination: LedgerHandle,
        principal: Address,
    ) -> Self {
        Self {
            source,
            outbox,
            destination,
            principal,
        }
    }

    /// Forward every pending delivery addressed to the destination
    pub async fn forward_pending(&self) -> Result<Vec<RelayOutcome>> {
        let domain = self.destination.domain();
        let mut outcomes = Vec::new();

        while let Some(delivery) = self.outbox.pop_for(domain) {
            let delivery_id = delivery.delivery_id;
            let message_id = DeliveryEnvelope::decode(&delivery.payload)
                .ok()
                .map(|envelope| envelope.message_id);

            let result = match self
                .destination
                .receive_message(self.principal, delivery.clone().into())
                .await
            {
                Ok(receipt) => Ok(receipt),
                Err(Error::Protocol(e)) => Err(e),
                Err(other) => {
                    warn!(%delivery_id, error = %other, "destination unreachable, delivery kept");
                    self.outbox.requeue(delivery);
                    return Err(other);
                }
            };

            // The destination has decided; the delivery is not retried from here on
            if let Some(message_id) = message_id {
                match self
                    .source
                    .acknowledge_delivery(self.principal, message_id, result.is_ok())
                    .await
                {
                    Ok(status) => debug!(%message_id, %status, "source acknowledged"),
                    Err(Error::Protocol(e)) => {
                        warn!(%message_id, error = %e, "source acknowledgement rejected")
                    }
                    Err(other) => {
                        warn!(%message_id, error = %other, "source unreachable, record stays routed");
                        return Err(other);
                    }
                }
            }

            match &result {
                Ok(_) => info!(%delivery_id, "delivery forwarded"),
                Err(e) => warn!(%delivery_id, error = %e, "delivery rejected by destination"),
            }
            outcomes.push(RelayOutcome {
                delivery_id,
                message_id,
                result,
            });
        }

        Ok(outcomes)
    }

    /// Forward on a fixed interval until either ledger actor stops
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.forward_pending().await {
                    warn!(error = %e, "relay stopped");
                    break;
                }
            }
        })
    }
}
