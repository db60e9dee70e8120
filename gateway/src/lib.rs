//! # DelTran Rail Gateway
//!
//! Protocol coordinator of one routing domain, and the service around it:
//! - [`Ledger`]: runs each command (submit, receive, acknowledge, admin) as
//!   one atomic unit over the registry, schemas, processor, handlers,
//!   settlement and router
//! - [`LedgerHandle`]: single-writer actor front-end with a bounded mailbox
//! - [`Relay`]: forwards loopback deliveries between two in-process domains
//! - Configuration (TOML file or `GATEWAY_*` environment) and Prometheus metrics
//!
//! # Example
//!
//! ```
//! use gateway::{Config, Ledger, Submission};
//! use message_bus::CreditTransfer;
//! use protocol_core::{Address, MessageStatus, MessageType};
//!
//! let mut config = Config::default();
//! config.reserves.push(gateway::config::ReserveConfig {
//!     asset: "USD".into(),
//!     amount: "1000000".into(),
//! });
//! let (mut ledger, _outbox) = Ledger::bootstrap(&config).unwrap();
//! let admin = ledger.identities().admin;
//!
//! let payload = CreditTransfer {
//!     debtor: Address::derive("bank-a"),
//!     creditor: Address::derive("bank-b"),
//!     asset: Address::derive("USD"),
//!     amount: 100,
//!     instruction_id: [1; 32],
//! }
//! .encode();
//!
//! let receipt = ledger
//!     .submit_message(admin, Submission::new(MessageType::credit_transfer(), payload, 1))
//!     .unwrap();
//! assert_eq!(receipt.status, MessageStatus::Completed);
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, clippy::all)]

pub mod actor;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod relay;
pub mod types;

// Re-exports
pub use actor::{spawn_ledger_actor, LedgerActor, LedgerCommand, LedgerHandle};
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use metrics::Metrics;
pub use relay::{Relay, RelayOutcome};
pub use types::{AdminCommand, Identities, InboundDelivery, Submission, SubmissionReceipt};
