//! Capability-based access control
//!
//! Each state-changing entry point names the capability it requires.
//! Callers are plain addresses; tests simulate an unprivileged caller by
//! using an address that was never granted anything.

use crate::types::Address;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Named permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// May invoke message handlers (held by the processor)
    ProcessorInvoke,
    /// May request settlements (held by message handlers)
    SettlementInvoke,
    /// Administrative operations (schemas, handlers, routes, grants, unpause)
    Admin,
    /// May pause components
    EmergencyPause,
    /// May submit messages through the coordinator
    Submit,
    /// May hand inbound cross-domain deliveries to the router (held by the delivery service)
    Deliver,
}

/// Capability table
#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    grants: HashMap<Address, HashSet<Capability>>,
}

impl AccessControl {
    /// Create with a genesis administrator (admin, pause and submit rights)
    pub fn new(admin: Address) -> Self {
        let mut grants = HashMap::new();
        grants.insert(
            admin,
            [
                Capability::Admin,
                Capability::EmergencyPause,
                Capability::Submit,
            ]
            .into_iter()
            .collect(),
        );
        Self { grants }
    }

    /// Check capability
    pub fn has(&self, account: &Address, capability: Capability) -> bool {
        self.grants
            .get(account)
            .map(|caps| caps.contains(&capability))
            .unwrap_or(false)
    }

    /// Fail with `Unauthorized` unless `caller` holds `capability`
    pub fn require(&self, caller: &Address, capability: Capability) -> Result<()> {
        if self.has(caller, capability) {
            Ok(())
        } else {
            Err(Error::Unauthorized {
                caller: caller.to_string(),
                capability,
            })
        }
    }

    /// Grant a capability (admin only). Returns whether the table changed.
    pub fn grant(
        &mut self,
        caller: &Address,
        account: Address,
        capability: Capability,
    ) -> Result<bool> {
        self.require(caller, Capability::Admin)?;
        Ok(self.grants.entry(account).or_default().insert(capability))
    }

    /// Revoke a capability (admin only). Returns whether the table changed.
    pub fn revoke(
        &mut self,
        caller: &Address,
        account: &Address,
        capability: Capability,
    ) -> Result<bool> {
        self.require(caller, Capability::Admin)?;
        Ok(self
            .grants
            .get_mut(account)
            .map(|caps| caps.remove(&capability))
            .unwrap_or(false))
    }

    /// Capabilities held by an account
    pub fn capabilities(&self, account: &Address) -> Vec<Capability> {
        self.grants
            .get(account)
            .map(|caps| caps.iter().copied().collect())
            .unwrap_or_default()
    }
}
