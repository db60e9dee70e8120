//! Settlement controller
//!
//! Moves value for a validated message: debit the pool reserve, credit the
//! beneficiary. The pair of legs is atomic: if the credit leg fails the
//! debit is restored before the error is returned.
//!
//! Idempotency per message id comes from two mechanisms:
//! - an in-flight marker held for the duration of the call, so a second
//!   request for the same id cannot start while the first is executing
//! - the settlement record, so a completed id is answered with its original
//!   settlement id instead of moving value again
//!
//! Permanent replay rejection (the processed-message set) belongs to the
//! calling handler.

use crate::pool::LiquidityPool;
use crate::types::SettlementRecord;
use chrono::Utc;
use protocol_core::{
    Address, CallContext, Capability, Error, Journal, MessageId, ReentrancyGuard, Result,
    SettlementId, Transactional,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Value movement as seen by message handlers
pub trait Settlement {
    /// Settle `amount` of `asset` to `beneficiary` for `message_id`.
    ///
    /// A zero settlement id must be treated as failure by the caller.
    fn process_settlement(
        &mut self,
        ctx: &mut CallContext<'_>,
        message_id: MessageId,
        asset: Address,
        amount: u128,
        beneficiary: Address,
    ) -> Result<SettlementId>;
}

/// Settlement controller backed by a liquidity pool
#[derive(Debug, Clone)]
pub struct SettlementController {
    /// Liquidity pool
    pool: Box<dyn LiquidityPool>,

    /// Message ids with a settlement currently executing
    in_flight: HashSet<MessageId>,

    /// Completed settlements
    settlements: HashMap<MessageId, SettlementRecord>,

    /// Re-entrancy lock
    guard: ReentrancyGuard,

    /// Settlements completed by the open command
    journal: Journal<MessageId>,
}

impl SettlementController {
    /// Create controller over a pool
    pub fn new(pool: Box<dyn LiquidityPool>) -> Self {
        Self {
            pool,
            in_flight: HashSet::new(),
            settlements: HashMap::new(),
            guard: ReentrancyGuard::new("settlement-controller"),
            journal: Journal::new(),
        }
    }

    /// Liquidity pool (read-only)
    pub fn pool(&self) -> &dyn LiquidityPool {
        self.pool.as_ref()
    }

    /// Completed settlement for a message
    pub fn settlement(&self, message_id: &MessageId) -> Option<&SettlementRecord> {
        self.settlements.get(message_id)
    }

    /// Number of completed settlements
    pub fn settlement_count(&self) -> usize {
        self.settlements.len()
    }

    /// Check the in-flight marker
    pub fn is_in_flight(&self, message_id: &MessageId) -> bool {
        self.in_flight.contains(message_id)
    }

    fn execute(
        &mut self,
        message_id: MessageId,
        asset: Address,
        amount: u128,
        beneficiary: Address,
    ) -> Result<SettlementId> {
        if let Some(existing) = self.settlements.get(&message_id) {
            debug!(%message_id, settlement_id = %existing.settlement_id, "settlement already recorded");
            return Ok(existing.settlement_id);
        }
        if amount == 0 {
            return Err(Error::InvalidAmount("settlement amount must be positive".into()));
        }
        if !self.in_flight.insert(message_id) {
            return Err(Error::SettlementInProgress(message_id));
        }

        let result = self.move_value(&asset, amount, &beneficiary);
        self.in_flight.remove(&message_id);
        result?;

        let settlement_id = SettlementId::generate();
        self.settlements.insert(
            message_id,
            SettlementRecord {
                message_id,
                settlement_id,
                asset,
                amount,
                beneficiary,
                settled_at: Utc::now(),
            },
        );
        self.journal.record(message_id);

        info!(%message_id, %settlement_id, amount, %beneficiary, "settlement completed");
        Ok(settlement_id)
    }

    fn move_value(&mut self, asset: &Address, amount: u128, beneficiary: &Address) -> Result<()> {
        if !self.pool.debit(asset, amount) {
            warn!(%asset, amount, "debit leg failed");
            return Err(Error::SettlementFailed(format!(
                "insufficient liquidity for {} units of {}",
                amount, asset
            )));
        }

        if !self.pool.credit(asset, amount, beneficiary) {
            self.pool.restore(asset, amount);
            warn!(%asset, amount, %beneficiary, "credit leg failed, debit restored");
            return Err(Error::SettlementFailed(format!(
                "credit to {} failed",
                beneficiary
            )));
        }

        Ok(())
    }
}

impl Transactional for SettlementController {
    fn begin(&mut self) {
        self.journal.begin();
    }

    fn commit(&mut self) {
        self.journal.commit();
    }

    /// Reverse every settlement of the open command and forget its record
    fn rollback(&mut self) {
        for message_id in self.journal.unwind() {
            if let Some(record) = self.settlements.remove(&message_id) {
                self.pool
                    .reverse(&record.asset, record.amount, &record.beneficiary);
                warn!(
                    %message_id,
                    settlement_id = %record.settlement_id,
                    amount = record.amount,
                    "settlement reversed"
                );
            }
        }
    }
}

impl Settlement for SettlementController {
    fn process_settlement(
        &mut self,
        ctx: &mut CallContext<'_>,
        message_id: MessageId,
        asset: Address,
        amount: u128,
        beneficiary: Address,
    ) -> Result<SettlementId> {
        ctx.require(Capability::SettlementInvoke)?;

        self.guard.enter()?;
        let result = self.execute(message_id, asset, amount, beneficiary);
        self.guard.exit();
        result
    }
}
