//! # DelTran Protocol Core
//!
//! Shared vocabulary of the cross-domain message rail:
//! - Identities, message ids, routing domains and lifecycle statuses
//! - The tag-addressed fixed-width payload codec
//! - Capability-based access control, pause and re-entrancy guards
//! - The per-command undo journal used for all-or-nothing commands
//! - Audit events
//! - The message protocol (schema registry + validation)
//!
//! ## Safety
//!
//! - `#![forbid(unsafe_code)]`: No unsafe operations
//! - Payload length is checked before any content is read
//! - Every failure is a typed [`Error`] with an [`ErrorKind`]

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications, clippy::all)]

pub mod access;
pub mod codec;
pub mod context;
pub mod error;
pub mod events;
pub mod guard;
pub mod journal;
pub mod types;
pub mod validation;

pub use access::{AccessControl, Capability};
pub use codec::{FieldSet, FieldTag, FieldValue};
pub use context::CallContext;
pub use error::{Error, ErrorKind, Result};
pub use events::{EventLog, EventRecord, ProtocolEvent};
pub use guard::{PauseSwitch, ReentrancyGuard};
pub use journal::{Journal, Transactional};
pub use types::*;
pub use validation::{MessageProtocol, MessageSchema};

/// Protocol version (semantic versioning)
pub const PROTOCOL_VERSION: u16 = 1;
