//! Message protocol: per-type schemas and validation
//!
//! A schema is the authoritative list of field tags a message type must
//! carry, plus an opaque descriptor blob (for example an XSD digest or a
//! versioned layout description) that the rail stores but never interprets.

use crate::access::Capability;
use crate::codec::{FieldSet, FieldTag};
use crate::context::CallContext;
use crate::events::ProtocolEvent;
use crate::types::MessageType;
use crate::{Error, Result};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Registered schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSchema {
    /// Required field tags, in declaration order
    pub required_fields: Vec<FieldTag>,
    /// Opaque schema descriptor
    pub descriptor: Bytes,
}

impl MessageSchema {
    /// Number of fields in the fixed layout
    pub fn field_count(&self) -> usize {
        self.required_fields.len()
    }
}

/// Schema registry and validator
#[derive(Debug, Clone, Default)]
pub struct MessageProtocol {
    schemas: HashMap<MessageType, MessageSchema>,
}

impl MessageProtocol {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) the schema for a message type. Admin only.
    pub fn register_message_format(
        &mut self,
        ctx: &mut CallContext<'_>,
        message_type: MessageType,
        required_fields: Vec<FieldTag>,
        descriptor: Bytes,
    ) -> Result<()> {
        ctx.require(Capability::Admin)?;

        if required_fields.is_empty() {
            return Err(Error::Config(format!(
                "schema for {} declares no fields",
                message_type
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = required_fields.iter().find(|tag| !seen.insert(**tag)) {
            return Err(Error::Config(format!(
                "schema for {} repeats field {}",
                message_type, dup
            )));
        }

        let count = required_fields.len();
        let replaced = self
            .schemas
            .insert(
                message_type.clone(),
                MessageSchema {
                    required_fields,
                    descriptor,
                },
            )
            .is_some();

        info!(%message_type, fields = count, replaced, "message format registered");
        ctx.emit(ProtocolEvent::SchemaRegistered {
            message_type,
            required_fields: count,
        });
        Ok(())
    }

    /// Validate a decoded field set against the registered schema.
    ///
    /// Returns the accepted fields in schema order.
    pub fn validate(&self, message_type: &MessageType, fields: &FieldSet) -> Result<FieldSet> {
        let schema = self.schema(message_type)?;

        let mut accepted = FieldSet::new();
        for tag in &schema.required_fields {
            let value = fields.get(tag).ok_or_else(|| Error::MissingRequiredField {
                message_type: message_type.clone(),
                field: tag.to_string(),
            })?;
            accepted.insert(*tag, *value);
        }

        debug!(%message_type, fields = accepted.len(), "schema validation passed");
        Ok(accepted)
    }

    /// Decode a raw payload with the type's fixed layout, then validate it
    pub fn decode_and_validate(
        &self,
        message_type: &MessageType,
        payload: &[u8],
    ) -> Result<FieldSet> {
        let schema = self.schema(message_type)?;
        let fields = FieldSet::decode_exact(payload, schema.field_count())?;
        self.validate(message_type, &fields)
    }

    /// Look up a schema
    pub fn schema(&self, message_type: &MessageType) -> Result<&MessageSchema> {
        self.schemas
            .get(message_type)
            .ok_or_else(|| Error::UnknownMessageType(message_type.clone()))
    }

    /// Check if schema is registered
    pub fn is_registered(&self, message_type: &MessageType) -> bool {
        self.schemas.contains_key(message_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessControl;
    use crate::codec::FieldValue;
    use crate::events::EventLog;
    use crate::types::Address;

    const A: FieldTag = FieldTag::new(*b"AAAA");
    const B: FieldTag = FieldTag::new(*b"BBBB");

    fn registered() -> (MessageProtocol, EventLog) {
        let admin = Address::derive("admin");
        let access = AccessControl::new(admin);
        let mut events = EventLog::new();
        let mut protocol = MessageProtocol::new();
        let mut ctx = CallContext::new(admin, &access, &mut events);
        protocol
            .register_message_format(&mut ctx, MessageType::new("test.001"), vec![A, B], Bytes::new())
            .unwrap();
        (protocol, events)
    }

    #[test]
    fn test_unknown_type() {
        let protocol = MessageProtocol::new();
        let err = protocol
            .validate(&MessageType::new("nope"), &FieldSet::new())
            .unwrap_err();
        assert_eq!(err, Error::UnknownMessageType(MessageType::new("nope")));
    }

    #[test]
    fn test_missing_required_field() {
        let (protocol, events) = registered();
        assert_eq!(events.len(), 1);

        let fields = FieldSet::new().with(A, FieldValue::from_u128(1));
        let err = protocol
            .validate(&MessageType::new("test.001"), &fields)
            .unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { ref field, .. } if field == "BBBB"));
    }

    #[test]
    fn test_accepts_any_order() {
        let (protocol, _) = registered();
        let fields = FieldSet::new()
            .with(B, FieldValue::from_u128(2))
            .with(A, FieldValue::from_u128(1));
        let accepted = protocol
            .validate(&MessageType::new("test.001"), &fields)
            .unwrap();
        assert_eq!(accepted.tags().copied().collect::<Vec<_>>(), vec![A, B]);
    }

    #[test]
    fn test_register_requires_admin() {
        let access = AccessControl::new(Address::derive("admin"));
        let mut events = EventLog::new();
        let mut ctx = CallContext::new(Address::derive("bank"), &access, &mut events);
        let mut protocol = MessageProtocol::new();
        let err = protocol
            .register_message_format(&mut ctx, MessageType::new("x"), vec![A], Bytes::new())
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
        assert!(events.is_empty());
    }

    #[test]
    fn test_rejects_repeated_field() {
        let admin = Address::derive("admin");
        let access = AccessControl::new(admin);
        let mut events = EventLog::new();
        let mut ctx = CallContext::new(admin, &access, &mut events);
        let mut protocol = MessageProtocol::new();
        assert!(protocol
            .register_message_format(&mut ctx, MessageType::new("x"), vec![A, A], Bytes::new())
            .is_err());
    }
}
