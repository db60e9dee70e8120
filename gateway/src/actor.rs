//! Actor-based concurrency for the coordinator
//!
//! A domain's [`Ledger`] is owned by a single Tokio task. Callers hold a
//! cloneable [`LedgerHandle`] and talk to the task over a bounded mailbox,
//! so commands are applied strictly one at a time without locks.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │     Submitters / relay / operators (many tasks)       │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends commands to the actor mailbox           │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │     Ledger::transact → commit / rollback journals     │
//! │     Metrics recorded per command                      │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::ledger::Ledger;
use crate::metrics::Metrics;
use crate::types::{AdminCommand, InboundDelivery, Submission, SubmissionReceipt};
use crate::{Error, Result};
use ledger_core::MessageRecord;
use protocol_core::{Address, DomainId, EventRecord, MessageId, MessageStatus};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

type Reply<T> = oneshot::Sender<protocol_core::Result<T>>;

/// Command sent to the ledger actor
#[derive(Debug)]
pub enum LedgerCommand {
    /// Submit a local message
    Submit {
        caller: Address,
        submission: Submission,
        response: Reply<SubmissionReceipt>,
    },

    /// Hand over an inbound delivery
    Receive {
        caller: Address,
        delivery: InboundDelivery,
        response: Reply<SubmissionReceipt>,
    },

    /// Record the outcome of a routed message
    Acknowledge {
        caller: Address,
        message_id: MessageId,
        delivered: bool,
        response: Reply<MessageStatus>,
    },

    /// Price a remote submission
    Quote {
        caller: Address,
        submission: Submission,
        response: Reply<u128>,
    },

    /// Apply an administrative command
    Administer {
        caller: Address,
        command: AdminCommand,
        response: Reply<()>,
    },

    /// Get a message record
    GetRecord {
        message_id: MessageId,
        response: oneshot::Sender<Option<MessageRecord>>,
    },

    /// Get events after a sequence number
    GetEvents {
        since: u64,
        response: oneshot::Sender<Vec<EventRecord>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the coordinator
pub struct LedgerActor {
    /// Coordinator
    ledger: Ledger,

    /// Mailbox for incoming commands
    mailbox: mpsc::Receiver<LedgerCommand>,

    /// Metrics
    metrics: Metrics,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(ledger: Ledger, mailbox: mpsc::Receiver<LedgerCommand>, metrics: Metrics) -> Self {
        Self {
            ledger,
            mailbox,
            metrics,
        }
    }

    /// Run the actor event loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        let domain = self.ledger.domain();
        while let Some(command) = self.mailbox.recv().await {
            if let LedgerCommand::Shutdown = command {
                info!(%domain, "ledger actor shutting down");
                break;
            }
            self.handle_command(command);
        }
        debug!(%domain, records = self.ledger.records().count(), "ledger actor stopped");
    }

    /// Handle a single command
    fn handle_command(&mut self, command: LedgerCommand) {
        let _timer = self.metrics.command_duration.start_timer();
        match command {
            LedgerCommand::Submit {
                caller,
                submission,
                response,
            } => {
                let result = self.ledger.submit_message(caller, submission);
                self.metrics.record_submission(&result);
                let _ = response.send(result);
            }

            LedgerCommand::Receive {
                caller,
                delivery,
                response,
            } => {
                let result = self.ledger.receive_message(caller, delivery);
                self.metrics.record_inbound(&result);
                let _ = response.send(result);
            }

            LedgerCommand::Acknowledge {
                caller,
                message_id,
                delivered,
                response,
            } => {
                let result = self.ledger.acknowledge_delivery(caller, message_id, delivered);
                if let Err(e) = &result {
                    self.metrics.record_failure(e);
                }
                let _ = response.send(result);
            }

            LedgerCommand::Quote {
                caller,
                submission,
                response,
            } => {
                let _ = response.send(self.ledger.quote_submission(caller, &submission));
            }

            LedgerCommand::Administer {
                caller,
                command,
                response,
            } => {
                let result = self.ledger.administer(caller, command);
                if let Err(e) = &result {
                    self.metrics.record_failure(e);
                }
                let _ = response.send(result);
            }

            LedgerCommand::GetRecord {
                message_id,
                response,
            } => {
                let _ = response.send(self.ledger.record(&message_id).cloned());
            }

            LedgerCommand::GetEvents { since, response } => {
                let _ = response.send(self.ledger.events_since(since).to_vec());
            }

            LedgerCommand::Shutdown => {
                // Handled in main loop
            }
        }
    }
}

/// Handle for sending commands to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerCommand>,
    domain: DomainId,
    metrics: Metrics,
}

impl LedgerHandle {
    /// Domain served by the actor
    pub fn domain(&self) -> DomainId {
        self.domain
    }

    /// Metrics recorded by the actor
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> LedgerCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(command(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Submit a local message
    pub async fn submit_message(
        &self,
        caller: Address,
        submission: Submission,
    ) -> Result<SubmissionReceipt> {
        Ok(self
            .request(|response| LedgerCommand::Submit {
                caller,
                submission,
                response,
            })
            .await??)
    }

    /// Hand over an inbound delivery
    pub async fn receive_message(
        &self,
        caller: Address,
        delivery: InboundDelivery,
    ) -> Result<SubmissionReceipt> {
        Ok(self
            .request(|response| LedgerCommand::Receive {
                caller,
                delivery,
                response,
            })
            .await??)
    }

    /// Record the outcome of a routed message
    pub async fn acknowledge_delivery(
        &self,
        caller: Address,
        message_id: MessageId,
        delivered: bool,
    ) -> Result<MessageStatus> {
        Ok(self
            .request(|response| LedgerCommand::Acknowledge {
                caller,
                message_id,
                delivered,
                response,
            })
            .await??)
    }

    /// Price a remote submission
    pub async fn quote_submission(&self, caller: Address, submission: Submission) -> Result<u128> {
        Ok(self
            .request(|response| LedgerCommand::Quote {
                caller,
                submission,
                response,
            })
            .await??)
    }

    /// Apply an administrative command
    pub async fn administer(&self, caller: Address, command: AdminCommand) -> Result<()> {
        Ok(self
            .request(|response| LedgerCommand::Administer {
                caller,
                command,
                response,
            })
            .await??)
    }

    /// Get a message record
    pub async fn get_record(&self, message_id: MessageId) -> Result<Option<MessageRecord>> {
        self.request(|response| LedgerCommand::GetRecord {
            message_id,
            response,
        })
        .await
    }

    /// Get events after a sequence number
    pub async fn events_since(&self, since: u64) -> Result<Vec<EventRecord>> {
        self.request(|response| LedgerCommand::GetEvents { since, response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerCommand::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(ledger: Ledger, metrics: Metrics, mailbox_capacity: usize) -> LedgerHandle {
    let domain = ledger.domain();
    // Bounded channel for backpressure
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
    let actor = LedgerActor::new(ledger, rx, metrics.clone());

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle {
        sender: tx,
        domain,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ReserveConfig};
    use message_bus::CreditTransfer;
    use protocol_core::MessageType;

    fn spawn() -> (LedgerHandle, Address) {
        let mut config = Config::default();
        config.reserves.push(ReserveConfig {
            asset: "USD".into(),
            amount: "1000000".into(),
        });
        let (ledger, _outbox) = Ledger::bootstrap(&config).unwrap();
        let admin = ledger.identities().admin;
        (spawn_ledger_actor(ledger, Metrics::new().unwrap(), 16), admin)
    }

    fn submission(amount: u128) -> Submission {
        let payload = CreditTransfer {
            debtor: Address::derive("bank-a"),
            creditor: Address::derive("bank-b"),
            asset: Address::derive("USD"),
            amount,
            instruction_id: [1u8; 32],
        }
        .encode();
        Submission::new(MessageType::credit_transfer(), payload, 1)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (handle, _) = spawn();
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_submit_and_read_back() {
        let (handle, admin) = spawn();

        let receipt = handle.submit_message(admin, submission(100)).await.unwrap();
        assert_eq!(receipt.status, MessageStatus::Completed);

        let record = handle.get_record(receipt.message_id).await.unwrap().unwrap();
        assert_eq!(record.status, MessageStatus::Completed);
        assert_eq!(handle.metrics().submissions_total.get(), 1);
        assert_eq!(handle.metrics().settlements_total.get(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_reports_rejections() {
        let (handle, admin) = spawn();

        handle.submit_message(admin, submission(100)).await.unwrap();
        let err = handle.submit_message(admin, submission(100)).await.unwrap_err();

        assert_eq!(err.kind(), Some(protocol_core::ErrorKind::Duplication));
        assert_eq!(
            handle
                .metrics()
                .failures_total
                .with_label_values(&["duplication"])
                .get(),
            1
        );

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_mailbox() {
        let (handle, admin) = spawn();
        handle.shutdown().await.unwrap();
        // Give the actor a chance to exit
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert!(matches!(
            handle.submit_message(admin, submission(100)).await,
            Err(Error::Concurrency(_))
        ));
    }
}
