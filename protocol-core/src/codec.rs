//! Tag-addressed fixed-width payload codec
//!
//! A payload is a concatenation of 36-byte chunks: a 4-byte field tag
//! followed by a 32-byte value. Field order on the wire is irrelevant;
//! consumers address values by tag.
//!
//! ```text
//! ┌──────┬────────────────────────────────┬──────┬──────────────── ...
//! │ tag  │ value (32 bytes, big-endian)   │ tag  │ value
//! └──────┴────────────────────────────────┴──────┴──────────────── ...
//! ```

use crate::types::{Address, IDENTITY_LEN};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field tag width (bytes)
pub const TAG_LEN: usize = 4;

/// Field value width (bytes)
pub const VALUE_LEN: usize = IDENTITY_LEN;

/// Width of one tag/value chunk
pub const CHUNK_LEN: usize = TAG_LEN + VALUE_LEN;

/// Payload length for a layout with `field_count` fields
pub const fn payload_len(field_count: usize) -> usize {
    field_count * CHUNK_LEN
}

/// 4-byte field tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldTag([u8; TAG_LEN]);

impl FieldTag {
    /// Create from raw bytes
    pub const fn new(bytes: [u8; TAG_LEN]) -> Self {
        Self(bytes)
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().all(|b| b.is_ascii_graphic()) {
            write!(f, "{}", String::from_utf8_lossy(&self.0))
        } else {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }
}

impl FromStr for FieldTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; TAG_LEN] = s
            .as_bytes()
            .try_into()
            .map_err(|_| Error::InvalidMessageFormat(format!("field tag must be 4 bytes: {:?}", s)))?;
        Ok(Self(bytes))
    }
}

/// 32-byte field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldValue([u8; VALUE_LEN]);

impl FieldValue {
    /// Create from raw bytes
    pub const fn new(bytes: [u8; VALUE_LEN]) -> Self {
        Self(bytes)
    }

    /// Encode an unsigned integer as a big-endian 256-bit value
    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; VALUE_LEN];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; VALUE_LEN] {
        &self.0
    }

    /// Interpret as an identity
    pub fn as_address(&self) -> Address {
        Address::from_bytes(self.0)
    }

    /// Interpret as a big-endian 256-bit unsigned integer.
    ///
    /// Returns `None` when the value does not fit in 128 bits.
    pub fn as_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }

    /// All-zero value
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; VALUE_LEN]
    }
}

impl From<Address> for FieldValue {
    fn from(address: Address) -> Self {
        Self(*address.as_bytes())
    }
}

/// Decoded payload: tag → value, in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    fields: Vec<(FieldTag, FieldValue)>,
}

impl FieldSet {
    /// Create empty field set
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a payload whose layout has exactly `field_count` fields.
    ///
    /// The length check runs before any content is inspected.
    pub fn decode_exact(payload: &[u8], field_count: usize) -> Result<Self> {
        let expected = payload_len(field_count);
        if payload.len() != expected {
            return Err(Error::InvalidPayloadLength {
                expected,
                actual: payload.len(),
            });
        }
        Self::decode_chunks(payload)
    }

    /// Decode any non-empty whole number of chunks
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.is_empty() || payload.len() % CHUNK_LEN != 0 {
            let fields = (payload.len() / CHUNK_LEN).max(1);
            return Err(Error::InvalidPayloadLength {
                expected: payload_len(fields),
                actual: payload.len(),
            });
        }
        Self::decode_chunks(payload)
    }

    fn decode_chunks(payload: &[u8]) -> Result<Self> {
        let mut set = Self::new();
        for chunk in payload.chunks_exact(CHUNK_LEN) {
            let (tag, value) = chunk.split_at(TAG_LEN);
            let tag: [u8; TAG_LEN] = tag
                .try_into()
                .map_err(|_| Error::InvalidMessageFormat("truncated field tag".into()))?;
            let value: [u8; VALUE_LEN] = value
                .try_into()
                .map_err(|_| Error::InvalidMessageFormat("truncated field value".into()))?;
            set.insert(FieldTag::new(tag), FieldValue::new(value));
        }
        Ok(set)
    }

    /// Insert a field; a repeated tag overwrites the value in place (last write wins)
    pub fn insert(&mut self, tag: FieldTag, value: FieldValue) {
        match self.fields.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((tag, value)),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, tag: FieldTag, value: FieldValue) -> Self {
        self.insert(tag, value);
        self
    }

    /// Look up a field by tag
    pub fn get(&self, tag: &FieldTag) -> Option<&FieldValue> {
        self.fields.iter().find(|(t, _)| t == tag).map(|(_, v)| v)
    }

    /// Look up a field that must be present
    pub fn require(&self, tag: &FieldTag) -> Result<&FieldValue> {
        self.get(tag)
            .ok_or_else(|| Error::InvalidMessageFormat(format!("field {} absent", tag)))
    }

    /// Check presence
    pub fn contains(&self, tag: &FieldTag) -> bool {
        self.get(tag).is_some()
    }

    /// Tags in order of first appearance
    pub fn tags(&self) -> impl Iterator<Item = &FieldTag> {
        self.fields.iter().map(|(t, _)| t)
    }

    /// Tag/value pairs in order of first appearance
    pub fn iter(&self) -> impl Iterator<Item = &(FieldTag, FieldValue)> {
        self.fields.iter()
    }

    /// Number of distinct tags
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode back to wire format
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload_len(self.fields.len()));
        for (tag, value) in &self.fields {
            out.extend_from_slice(tag.as_bytes());
            out.extend_from_slice(value.as_bytes());
        }
        out
    }
}
