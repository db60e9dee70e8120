//! DelTran Ledger Core
//!
//! Message registry of the cross-domain rail: the append-only record of
//! every message a domain accepted and the status it reached.
//!
//! # Invariants
//!
//! - Unique identity: a message identifier is recorded at most once
//! - Monotonic status: no regression, nothing leaves `Completed`/`Failed`
//! - Append-only: records are never modified except by status transitions,
//!   and never deleted

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod registry;
pub mod types;

// Re-exports
pub use protocol_core::{Error, Result};
pub use registry::{derive_message_id, MessageRegistry};
pub use types::{MessageRecord, PayloadRef, StatusChange};
