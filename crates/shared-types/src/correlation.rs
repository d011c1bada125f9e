//! Correlation ID for request/reply matching.
//!
//! Uses UUID v7 for time-ordered, unique identifiers. On the wire the ID
//! travels as the 16 raw UUID bytes in the message's correlation data.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Correlation data on the wire did not hold a valid identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid correlation data: expected 16 bytes, got {len}")]
pub struct InvalidCorrelationData {
    /// Length of the rejected correlation data.
    pub len: usize,
}

/// Correlation ID linking one request message to its one reply.
///
/// Time-ordered (UUID v7), so ids sort by the moment the call was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a new correlation ID (UUID v7)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse from string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    /// Decode from raw correlation data received on the bus.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, InvalidCorrelationData> {
        Uuid::from_slice(bytes)
            .map(Self)
            .map_err(|_| InvalidCorrelationData { len: bytes.len() })
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Encode as correlation data for a bus message.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
