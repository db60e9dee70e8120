//! Message handlers
//!
//! A handler owns one message type: it decodes the payload, validates the
//! business fields, asks the settlement controller to move value and keeps
//! the processed-message set that makes settlement at-most-once.

pub mod credit_transfer;

use protocol_core::{
    Address, CallContext, MessageId, MessageType, ProtocolEvent, Result, Transactional,
};
use settlement::Settlement;
use std::fmt;

pub use credit_transfer::{AmountBounds, CreditTransfer, CreditTransferHandler};

/// Type-specific message handler.
///
/// The processed-message set takes part in the coordinator's command
/// journal, so a command that fails after settling also forgets the id.
pub trait MessageHandler: Transactional + fmt::Debug + Send {
    /// Handler identity (the caller seen by the settlement controller)
    fn address(&self) -> Address;

    /// Message type this handler accepts
    fn message_type(&self) -> &MessageType;

    /// Process one message. Returns the handler's result bytes.
    fn handle_message(
        &mut self,
        ctx: &mut CallContext<'_>,
        settlement: &mut dyn Settlement,
        message_id: MessageId,
        payload: &[u8],
    ) -> Result<Vec<u8>>;

    /// Pause (requires `EmergencyPause`)
    fn pause(&mut self, ctx: &mut CallContext<'_>) -> Result<bool>;

    /// Unpause (requires `Admin`)
    fn unpause(&mut self, ctx: &mut CallContext<'_>) -> Result<bool>;

    /// Check pause state
    fn is_paused(&self) -> bool;

    /// Check the processed-message set
    fn is_processed(&self, message_id: &MessageId) -> bool;

    /// Size of the processed-message set
    fn processed_count(&self) -> usize;

    /// Clone into a box
    fn clone_box(&self) -> Box<dyn MessageHandler>;
}

impl Clone for Box<dyn MessageHandler> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Emit the audit event for a pause switch flip
pub(crate) fn emit_pause_change(
    ctx: &mut CallContext<'_>,
    component: &str,
    paused: bool,
    changed: bool,
) {
    if !changed {
        return;
    }
    let component = component.to_string();
    let by = ctx.caller;
    ctx.emit(if paused {
        ProtocolEvent::Paused { component, by }
    } else {
        ProtocolEvent::Unpaused { component, by }
    });
}
