//! Error types for crosswire.

use serde_json::Value;
use thiserror::Error;

/// Main error type for all crosswire operations.
#[derive(Debug, Error)]
pub enum CrosswireError {
    /// I/O error during stream transport operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON value conversion error (envelopes and typed payloads).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error (stream transport payloads).
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Protocol error (invalid frame, malformed tag, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation declared with an empty name.
    #[error("Operation name must not be empty")]
    EmptyOperationName,

    /// Operation name declared more than once in the same registry.
    #[error("Operation `{0}` is already declared")]
    DuplicateOperation(String),

    /// Operation name contains the reserved `:` tag separator.
    #[error("Operation name `{0}` contains the reserved `:` separator")]
    InvalidOperationName(String),

    /// Channel closed before the message could be sent.
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type alias using CrosswireError.
pub type Result<T> = std::result::Result<T, CrosswireError>;

/// Error returned to the caller of a generated stub.
///
/// `Rejected` carries the handler's failure payload verbatim; no wrapping
/// or normalization is applied by this layer.
#[derive(Debug, Error)]
pub enum CallError {
    /// The bound implementation failed; payload is passed through opaquely.
    #[error("Call rejected: {0}")]
    Rejected(Value),

    /// No stub exists for the requested operation name.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// The channel was torn down before a reply arrived.
    #[error("Channel closed before reply")]
    ChannelClosed,

    /// Argument or reply payload could not be converted to/from typed data.
    #[error("Payload conversion error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Failure in the underlying channel while issuing the request.
    #[error(transparent)]
    Channel(#[from] CrosswireError),
}
