//! Wire protocol conventions: tag derivation and message envelopes.
//!
//! For an operation named `op`, three tags exist on the wire:
//!
//! - `op` — Request, payload is a [`RequestEnvelope`]
//! - `op:done` — Success Reply, payload is a [`ReplyEnvelope`]
//! - `op:error` — Failure Reply, payload is a [`ReplyEnvelope`] whose
//!   `payload` field carries the handler's error data opaquely
//!
//! Because reply tags are derived with the `:` separator, operation names
//! must not contain `:` themselves. [`validate_operation_name`] enforces
//! this together with the non-empty rule at declare time.
//!
//! # Example
//!
//! ```
//! use crosswire::protocol::{done_tag, error_tag};
//!
//! assert_eq!(done_tag("echo"), "echo:done");
//! assert_eq!(error_tag("echo"), "echo:error");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CrosswireError, Result};

/// Separator between an operation name and a reply kind in a tag.
pub const TAG_SEPARATOR: char = ':';

/// Suffix appended to an operation name to form its Success Reply tag.
pub const DONE_SUFFIX: &str = ":done";

/// Suffix appended to an operation name to form its Failure Reply tag.
pub const ERROR_SUFFIX: &str = ":error";

/// Per-call correlation identifier.
///
/// Allocated from a monotonically increasing counter on the caller side and
/// echoed back in both reply kinds, so replies to overlapping calls on the
/// same operation route to the correct pending call. ID 0 is never issued.
pub type CallId = u64;

/// Build the Success Reply tag for an operation.
#[inline]
pub fn done_tag(operation: &str) -> String {
    format!("{operation}{DONE_SUFFIX}")
}

/// Build the Failure Reply tag for an operation.
#[inline]
pub fn error_tag(operation: &str) -> String {
    format!("{operation}{ERROR_SUFFIX}")
}

/// Validate an operation name at declare time.
///
/// Rejects empty names and names containing the reserved `:` separator.
/// Duplicate detection is the registry's concern, not this function's.
pub fn validate_operation_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CrosswireError::EmptyOperationName);
    }
    if name.contains(TAG_SEPARATOR) {
        return Err(CrosswireError::InvalidOperationName(name.to_string()));
    }
    Ok(())
}

/// Payload of a Request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Correlation ID echoed back in the paired reply.
    pub id: CallId,
    /// Argument object for the bound implementation.
    pub args: Value,
}

impl RequestEnvelope {
    /// Create a new request envelope.
    pub fn new(id: CallId, args: Value) -> Self {
        Self { id, args }
    }

    /// Convert into a channel-transportable value.
    pub fn into_value(self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse an envelope from a received payload.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Payload of a Success or Failure Reply message.
///
/// Which of the two it is is carried by the message tag, not the envelope;
/// the `payload` field is the result object or the opaque error data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    /// Correlation ID copied from the originating request.
    pub id: CallId,
    /// Result object (`:done`) or error data (`:error`).
    pub payload: Value,
}

impl ReplyEnvelope {
    /// Create a new reply envelope.
    pub fn new(id: CallId, payload: Value) -> Self {
        Self { id, payload }
    }

    /// Convert into a channel-transportable value.
    pub fn into_value(self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse an envelope from a received payload.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
