//! Per-call execution context

use crate::access::{AccessControl, Capability};
use crate::events::{EventLog, ProtocolEvent};
use crate::types::Address;
use crate::{Error, Result};

/// Who is calling, what they may do, and where events go.
///
/// Every state-changing component operation receives one of these; the
/// component never reaches for shared state outside of it.
#[derive(Debug)]
pub struct CallContext<'a> {
    /// Immediate caller
    pub caller: Address,
    /// Capability table
    pub access: &'a AccessControl,
    /// Audit sink
    pub events: &'a mut EventLog,
}

impl<'a> CallContext<'a> {
    /// Create context
    pub fn new(caller: Address, access: &'a AccessControl, events: &'a mut EventLog) -> Self {
        Self {
            caller,
            access,
            events,
        }
    }

    /// Fail with `Unauthorized` unless the caller holds `capability`
    pub fn require(&self, capability: Capability) -> Result<()> {
        self.access.require(&self.caller, capability)
    }

    /// Fail with `Unauthorized` unless the caller holds one of `capabilities`.
    /// The error names the first one; an empty list authorizes nobody.
    pub fn require_any(&self, capabilities: &[Capability]) -> Result<()> {
        if capabilities
            .iter()
            .any(|capability| self.access.has(&self.caller, *capability))
        {
            return Ok(());
        }
        match capabilities.first() {
            Some(first) => self.require(*first),
            None => Err(Error::Config("no capability accepted".into())),
        }
    }

    /// Append an audit event
    pub fn emit(&mut self, event: ProtocolEvent) -> u64 {
        self.events.emit(event)
    }

    /// Reborrow with a different caller (one component calling the next)
    pub fn as_caller(&mut self, caller: Address) -> CallContext<'_> {
        CallContext {
            caller,
            access: self.access,
            events: &mut *self.events,
        }
    }
}
