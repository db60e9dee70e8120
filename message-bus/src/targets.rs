//! Target registry
//!
//! Maps (local handler, destination domain) to the remote address and
//! routing metadata the delivery service needs. Lookups for unregistered
//! routes fail closed with `RouteNotFound`.

use bytes::Bytes;
use protocol_core::{
    Address, CallContext, Capability, DomainId, Error, ProtocolEvent, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// What the remote address is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteKind {
    /// Remote router (the usual case)
    Router,
    /// Remote handler addressed directly
    Handler,
}

/// Registered route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRoute {
    /// Route kind
    pub kind: RouteKind,

    /// Address at the destination domain
    pub target_address: Address,

    /// Opaque routing metadata
    pub metadata: Bytes,
}

/// Route table
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    routes: HashMap<(Address, DomainId), TargetRoute>,
}

impl TargetRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or overwrite a route (admin only)
    pub fn register_target(
        &mut self,
        ctx: &mut CallContext<'_>,
        handler: Address,
        domain: DomainId,
        route: TargetRoute,
    ) -> Result<()> {
        ctx.require(Capability::Admin)?;
        if route.target_address.is_zero() {
            return Err(Error::Config("route target must not be the null address".into()));
        }

        info!(%handler, %domain, target = %route.target_address, kind = ?route.kind, "target registered");
        ctx.emit(ProtocolEvent::TargetRegistered {
            handler,
            domain,
            target: route.target_address,
        });
        self.routes.insert((handler, domain), route);
        Ok(())
    }

    /// Resolve a route
    pub fn resolve(&self, handler: &Address, domain: DomainId) -> Result<&TargetRoute> {
        self.routes
            .get(&(*handler, domain))
            .ok_or_else(|| Error::RouteNotFound {
                handler: handler.to_string(),
                domain: domain.get(),
            })
    }

    /// Number of routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
