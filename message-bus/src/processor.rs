//! Message processor
//!
//! Maps message types to installed handlers and to the post-processing
//! action the coordinator must take. Dispatch is synchronous: the handler
//! either completes or its error propagates unchanged.

use crate::handlers::MessageHandler;
use protocol_core::{
    Address, CallContext, Capability, Error, MessageId, MessageType, ProtocolEvent, Result,
    Transactional,
};
use serde::{Deserialize, Serialize};
use settlement::Settlement;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// What happens after a message has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequiredAction {
    /// Settle locally; route only if the submission names a remote destination
    #[default]
    Settle,
    /// Settle locally and always forward to a remote domain
    SettleAndRoute,
}

impl fmt::Display for RequiredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Settle => write!(f, "settle"),
            Self::SettleAndRoute => write!(f, "settle_and_route"),
        }
    }
}

/// Message processor
#[derive(Debug, Clone)]
pub struct MessageProcessor {
    /// Processor identity (holds `ProcessorInvoke`)
    address: Address,

    /// Installed handlers by address
    handlers: HashMap<Address, Box<dyn MessageHandler>>,

    /// Message type → handler address
    registrations: HashMap<MessageType, Address>,

    /// Message type → required action
    actions: HashMap<MessageType, RequiredAction>,
}

impl MessageProcessor {
    /// Create processor
    pub fn new(address: Address) -> Self {
        Self {
            address,
            handlers: HashMap::new(),
            registrations: HashMap::new(),
            actions: HashMap::new(),
        }
    }

    /// Processor identity
    pub fn address(&self) -> Address {
        self.address
    }

    /// Install a handler and register it for its message type (admin only)
    pub fn install_handler(
        &mut self,
        ctx: &mut CallContext<'_>,
        handler: Box<dyn MessageHandler>,
    ) -> Result<()> {
        ctx.require(Capability::Admin)?;
        let address = handler.address();
        let message_type = handler.message_type().clone();
        self.handlers.insert(address, handler);
        self.register_message_handler(ctx, message_type, address)
    }

    /// Point a message type at an installed handler (admin only, overwrites)
    pub fn register_message_handler(
        &mut self,
        ctx: &mut CallContext<'_>,
        message_type: MessageType,
        handler: Address,
    ) -> Result<()> {
        ctx.require(Capability::Admin)?;
        let installed = self
            .handlers
            .get(&handler)
            .ok_or_else(|| Error::Config(format!("handler {} is not installed", handler)))?;
        if installed.message_type() != &message_type {
            return Err(Error::Config(format!(
                "handler {} accepts {}, not {}",
                handler,
                installed.message_type(),
                message_type
            )));
        }

        info!(%message_type, %handler, "message handler registered");
        ctx.emit(ProtocolEvent::HandlerRegistered {
            message_type: message_type.clone(),
            handler,
        });
        self.registrations.insert(message_type, handler);
        Ok(())
    }

    /// Set the post-processing action for a message type (admin only, overwrites)
    pub fn set_required_action(
        &mut self,
        ctx: &mut CallContext<'_>,
        message_type: MessageType,
        action: RequiredAction,
    ) -> Result<()> {
        ctx.require(Capability::Admin)?;
        info!(%message_type, %action, "required action set");
        ctx.emit(ProtocolEvent::RequiredActionSet {
            message_type: message_type.clone(),
            action: action.to_string(),
        });
        self.actions.insert(message_type, action);
        Ok(())
    }

    /// Required action for a message type
    pub fn required_action(&self, message_type: &MessageType) -> RequiredAction {
        self.actions.get(message_type).copied().unwrap_or_default()
    }

    /// Handler address registered for a message type
    pub fn handler_for(&self, message_type: &MessageType) -> Result<Address> {
        self.registrations
            .get(message_type)
            .copied()
            .ok_or_else(|| Error::NoHandlerRegistered(message_type.clone()))
    }

    /// Installed handler (read-only)
    pub fn handler(&self, address: &Address) -> Option<&dyn MessageHandler> {
        self.handlers.get(address).map(|h| h.as_ref())
    }

    /// Dispatch a message to its handler.
    ///
    /// The caller must be entitled to introduce messages (`Submit` for local
    /// submissions, `Deliver` for inbound deliveries). The handler then sees
    /// the processor as its caller.
    pub fn dispatch(
        &mut self,
        ctx: &mut CallContext<'_>,
        settlement: &mut dyn Settlement,
        message_id: MessageId,
        message_type: &MessageType,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        ctx.require_any(&[Capability::Submit, Capability::Deliver])?;
        let address = self.handler_for(message_type)?;
        let handler = self
            .handlers
            .get_mut(&address)
            .ok_or_else(|| Error::NoHandlerRegistered(message_type.clone()))?;

        debug!(%message_id, %message_type, handler = %address, "dispatching");
        handler.handle_message(&mut ctx.as_caller(self.address), settlement, message_id, payload)
    }

    /// Pause an installed handler
    pub fn pause_handler(&mut self, ctx: &mut CallContext<'_>, handler: &Address) -> Result<bool> {
        self.installed_mut(handler)?.pause(ctx)
    }

    /// Unpause an installed handler
    pub fn unpause_handler(
        &mut self,
        ctx: &mut CallContext<'_>,
        handler: &Address,
    ) -> Result<bool> {
        self.installed_mut(handler)?.unpause(ctx)
    }

    fn installed_mut(&mut self, handler: &Address) -> Result<&mut Box<dyn MessageHandler>> {
        self.handlers
            .get_mut(handler)
            .ok_or_else(|| Error::Config(format!("handler {} is not installed", handler)))
    }
}

impl Transactional for MessageProcessor {
    fn begin(&mut self) {
        self.handlers.values_mut().for_each(|h| h.begin());
    }

    fn commit(&mut self) {
        self.handlers.values_mut().for_each(|h| h.commit());
    }

    fn rollback(&mut self) {
        self.handlers.values_mut().for_each(|h| h.rollback());
    }
}
