//! Re-entrancy and pause guards
//!
//! Both guards fail closed: a re-entered or paused component rejects the
//! call before touching any business state.

use crate::access::{AccessControl, Capability};
use crate::types::Address;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Re-entrancy lock for a single component.
///
/// ```
/// use protocol_core::guard::ReentrancyGuard;
///
/// let mut guard = ReentrancyGuard::new("handler");
/// guard.enter().unwrap();
/// assert!(guard.enter().is_err());
/// guard.exit();
/// assert!(guard.enter().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ReentrancyGuard {
    component: &'static str,
    entered: bool,
}

impl ReentrancyGuard {
    /// Create an unlocked guard
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            entered: false,
        }
    }

    /// Take the lock; fails with `Reentrancy` if already held
    pub fn enter(&mut self) -> Result<()> {
        if self.entered {
            tracing::warn!(component = self.component, "re-entrant call rejected");
            return Err(Error::Reentrancy(self.component.to_string()));
        }
        self.entered = true;
        Ok(())
    }

    /// Release the lock
    pub fn exit(&mut self) {
        self.entered = false;
    }

    /// Check if the lock is held
    pub fn is_entered(&self) -> bool {
        self.entered
    }
}

/// Pause switch for a single component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseSwitch {
    component: String,
    paused: bool,
    changed_by: Option<Address>,
    changed_at: Option<DateTime<Utc>>,
}

impl PauseSwitch {
    /// Create an unpaused switch
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            paused: false,
            changed_by: None,
            changed_at: None,
        }
    }

    /// Component name
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Who last flipped the switch
    pub fn changed_by(&self) -> Option<&Address> {
        self.changed_by.as_ref()
    }

    /// Fail fast with `Paused`
    pub fn ensure_active(&self) -> Result<()> {
        if self.paused {
            return Err(Error::Paused(self.component.clone()));
        }
        Ok(())
    }

    /// Pause (requires `EmergencyPause`). Returns whether the state changed.
    pub fn pause(&mut self, access: &AccessControl, caller: &Address) -> Result<bool> {
        access.require(caller, Capability::EmergencyPause)?;
        Ok(self.set(true, caller))
    }

    /// Unpause (requires `Admin`). Returns whether the state changed.
    pub fn unpause(&mut self, access: &AccessControl, caller: &Address) -> Result<bool> {
        access.require(caller, Capability::Admin)?;
        Ok(self.set(false, caller))
    }

    fn set(&mut self, paused: bool, caller: &Address) -> bool {
        if self.paused == paused {
            return false;
        }
        self.paused = paused;
        self.changed_by = Some(*caller);
        self.changed_at = Some(Utc::now());
        if paused {
            tracing::warn!(component = %self.component, by = %caller, "component paused");
        } else {
            tracing::info!(component = %self.component, by = %caller, "component unpaused");
        }
        true
    }
}
