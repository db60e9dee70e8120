//! Credit-transfer handler (pacs.008)
//!
//! Payload layout: five tag-addressed chunks in any order.
//!
//! | Tag    | Value                                 |
//! |--------|---------------------------------------|
//! | `DBTR` | debtor agent identity                 |
//! | `CDTR` | creditor agent identity (beneficiary) |
//! | `TOKN` | asset identity                        |
//! | `AMNT` | amount, big-endian unsigned integer   |
//! | `INST` | instruction identifier                |
//!
//! Per message: RECEIVED → DECODED → VALIDATED → SETTLED → RECORDED, or
//! REJECTED at any step before SETTLED.

use super::{emit_pause_change, MessageHandler};
use protocol_core::codec::payload_len;
use protocol_core::{
    Address, CallContext, Capability, Error, FieldSet, FieldTag, FieldValue, Journal, MessageId,
    MessageType, PauseSwitch, ProtocolEvent, ReentrancyGuard, Result, Transactional,
};
use serde::{Deserialize, Serialize};
use settlement::Settlement;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Debtor agent
pub const DEBTOR: FieldTag = FieldTag::new(*b"DBTR");
/// Creditor agent
pub const CREDITOR: FieldTag = FieldTag::new(*b"CDTR");
/// Asset
pub const ASSET: FieldTag = FieldTag::new(*b"TOKN");
/// Amount
pub const AMOUNT: FieldTag = FieldTag::new(*b"AMNT");
/// Instruction identifier
pub const INSTRUCTION: FieldTag = FieldTag::new(*b"INST");

/// Field layout in declaration order
pub const FIELDS: [FieldTag; 5] = [DEBTOR, CREDITOR, ASSET, AMOUNT, INSTRUCTION];

/// Encoded payload length (180 bytes)
pub const PAYLOAD_LEN: usize = payload_len(FIELDS.len());

/// Smallest accepted amount
pub const MINIMUM_AMOUNT: u128 = 1;

/// Largest accepted amount (10^27 minor units)
pub const MAXIMUM_AMOUNT: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Inclusive amount bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountBounds {
    /// Minimum (inclusive, at least 1)
    pub min: u128,
    /// Maximum (inclusive)
    pub max: u128,
}

impl AmountBounds {
    /// Create bounds
    pub fn new(min: u128, max: u128) -> Result<Self> {
        if min == 0 || min > max {
            return Err(Error::Config(format!(
                "invalid amount bounds [{}, {}]",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Check an amount
    pub fn check(&self, amount: u128) -> Result<()> {
        if amount < self.min || amount > self.max {
            return Err(Error::InvalidAmount(format!(
                "{} outside [{}, {}]",
                amount, self.min, self.max
            )));
        }
        Ok(())
    }
}

impl Default for AmountBounds {
    fn default() -> Self {
        Self {
            min: MINIMUM_AMOUNT,
            max: MAXIMUM_AMOUNT,
        }
    }
}

/// Decoded credit transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransfer {
    /// Debtor agent
    pub debtor: Address,
    /// Creditor agent
    pub creditor: Address,
    /// Asset
    pub asset: Address,
    /// Amount (minor units)
    pub amount: u128,
    /// Instruction identifier
    pub instruction_id: [u8; 32],
}

impl CreditTransfer {
    /// Decode and validate a payload
    pub fn decode(payload: &[u8], bounds: &AmountBounds) -> Result<Self> {
        let fields = FieldSet::decode_exact(payload, FIELDS.len())?;
        let message_type = MessageType::credit_transfer();
        let field = |tag: FieldTag| -> Result<FieldValue> {
            fields
                .get(&tag)
                .copied()
                .ok_or_else(|| Error::MissingRequiredField {
                    message_type: message_type.clone(),
                    field: tag.to_string(),
                })
        };

        let debtor = identity(DEBTOR, field(DEBTOR)?)?;
        let creditor = identity(CREDITOR, field(CREDITOR)?)?;
        let asset = identity(ASSET, field(ASSET)?)?;
        let amount = field(AMOUNT)?
            .as_u128()
            .ok_or_else(|| Error::InvalidAmount("amount exceeds 128 bits".into()))?;
        bounds.check(amount)?;
        let instruction_id = *field(INSTRUCTION)?.as_bytes();

        Ok(Self {
            debtor,
            creditor,
            asset,
            amount,
            instruction_id,
        })
    }

    /// Field set in declaration order
    pub fn to_fields(&self) -> FieldSet {
        FieldSet::new()
            .with(DEBTOR, self.debtor.into())
            .with(CREDITOR, self.creditor.into())
            .with(ASSET, self.asset.into())
            .with(AMOUNT, FieldValue::from_u128(self.amount))
            .with(INSTRUCTION, FieldValue::new(self.instruction_id))
    }

    /// Encode to the 180-byte wire payload
    pub fn encode(&self) -> Vec<u8> {
        self.to_fields().encode()
    }
}

fn identity(tag: FieldTag, value: FieldValue) -> Result<Address> {
    if value.is_zero() {
        return Err(Error::InvalidMessageFormat(format!(
            "{} is the null identity",
            tag
        )));
    }
    Ok(value.as_address())
}

/// Credit-transfer handler
#[derive(Debug, Clone)]
pub struct CreditTransferHandler {
    address: Address,
    message_type: MessageType,
    bounds: AmountBounds,
    processed: HashSet<MessageId>,
    pause: PauseSwitch,
    guard: ReentrancyGuard,
    /// Ids marked processed by the open command
    journal: Journal<MessageId>,
}

impl CreditTransferHandler {
    /// Create handler
    pub fn new(address: Address, bounds: AmountBounds) -> Self {
        Self {
            address,
            message_type: MessageType::credit_transfer(),
            bounds,
            processed: HashSet::new(),
            pause: PauseSwitch::new("credit-transfer-handler"),
            guard: ReentrancyGuard::new("credit-transfer-handler"),
            journal: Journal::new(),
        }
    }

    /// Amount bounds
    pub fn bounds(&self) -> &AmountBounds {
        &self.bounds
    }

    fn process(
        &mut self,
        ctx: &mut CallContext<'_>,
        settlement: &mut dyn Settlement,
        message_id: MessageId,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        ctx.require(Capability::ProcessorInvoke)?;
        self.pause.ensure_active()?;
        if self.processed.contains(&message_id) {
            warn!(%message_id, "replayed message rejected");
            return Err(Error::DuplicateMessage(message_id));
        }

        let transfer = CreditTransfer::decode(payload, &self.bounds)?;
        debug!(
            %message_id,
            debtor = %transfer.debtor,
            creditor = %transfer.creditor,
            amount = transfer.amount,
            "credit transfer decoded"
        );

        let settlement_id = settlement.process_settlement(
            &mut ctx.as_caller(self.address),
            message_id,
            transfer.asset,
            transfer.amount,
            transfer.creditor,
        )?;
        if settlement_id.is_zero() {
            return Err(Error::SettlementFailed(
                "settlement returned the zero identifier".into(),
            ));
        }

        // Infallible from here on: nothing can fail between settling and recording.
        self.processed.insert(message_id);
        self.journal.record(message_id);
        ctx.emit(ProtocolEvent::MessageCompleted {
            message_id,
            settlement_id,
            debtor: transfer.debtor,
            creditor: transfer.creditor,
            asset: transfer.asset,
            amount: transfer.amount,
            instruction_id: transfer.instruction_id,
        });

        info!(%message_id, %settlement_id, amount = transfer.amount, "credit transfer settled");
        Ok(settlement_id.as_uuid().as_bytes().to_vec())
    }
}

impl Transactional for CreditTransferHandler {
    fn begin(&mut self) {
        self.journal.begin();
    }

    fn commit(&mut self) {
        self.journal.commit();
    }

    fn rollback(&mut self) {
        for message_id in self.journal.unwind() {
            self.processed.remove(&message_id);
        }
    }
}

impl MessageHandler for CreditTransferHandler {
    fn address(&self) -> Address {
        self.address
    }

    fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    fn handle_message(
        &mut self,
        ctx: &mut CallContext<'_>,
        settlement: &mut dyn Settlement,
        message_id: MessageId,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        self.guard.enter()?;
        let result = self.process(ctx, settlement, message_id, payload);
        self.guard.exit();
        result
    }

    fn pause(&mut self, ctx: &mut CallContext<'_>) -> Result<bool> {
        let changed = self.pause.pause(ctx.access, &ctx.caller)?;
        emit_pause_change(ctx, self.pause.component(), true, changed);
        Ok(changed)
    }

    fn unpause(&mut self, ctx: &mut CallContext<'_>) -> Result<bool> {
        let changed = self.pause.unpause(ctx.access, &ctx.caller)?;
        emit_pause_change(ctx, self.pause.component(), false, changed);
        Ok(changed)
    }

    fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    fn is_processed(&self, message_id: &MessageId) -> bool {
        self.processed.contains(message_id)
    }

    fn processed_count(&self) -> usize {
        self.processed.len()
    }

    fn clone_box(&self) -> Box<dyn MessageHandler> {
        Box::new(self.clone())
    }
}
