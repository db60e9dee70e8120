//! Settlement Controller
//!
//! Executes value movement for validated messages against a liquidity pool.
//!
//! # Architecture
//!
//! 1. **Authorization**: only holders of `SettlementInvoke` (message handlers) may settle
//! 2. **Exclusion**: a re-entrancy guard and an in-flight marker per message id
//! 3. **Debit**: draw the amount from the pool reserve
//! 4. **Credit**: credit the beneficiary, restoring the debit if this leg fails
//! 5. **Record**: store the settlement id (UUIDv7, never zero)
//!
//! # Example
//!
//! ```
//! use protocol_core::{AccessControl, Address, CallContext, Capability, EventLog, MessageId};
//! use settlement::{InMemoryLiquidityPool, Settlement, SettlementController};
//!
//! let admin = Address::derive("admin");
//! let handler = Address::derive("handler");
//! let usd = Address::derive("USD");
//!
//! let mut access = AccessControl::new(admin);
//! access.grant(&admin, handler, Capability::SettlementInvoke).unwrap();
//! let mut events = EventLog::new();
//!
//! let pool = InMemoryLiquidityPool::new().with_reserve(usd, 1_000);
//! let mut controller = SettlementController::new(Box::new(pool));
//!
//! let mut ctx = CallContext::new(handler, &access, &mut events);
//! let id = controller
//!     .process_settlement(&mut ctx, MessageId::from_bytes([7; 32]), usd, 100, Address::derive("bank"))
//!     .unwrap();
//! assert!(!id.is_zero());
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod controller;
pub mod pool;
pub mod types;

// Re-exports
pub use controller::{Settlement, SettlementController};
pub use pool::{InMemoryLiquidityPool, LiquidityPool};
pub use protocol_core::{Error, Result};
pub use types::SettlementRecord;
