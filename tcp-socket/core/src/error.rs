//! Error Types
//!
//! Failure taxonomy shared by the session registry, the codec and the host
//! bridge. Every variant maps to a stable machine-readable code through
//! [`SocketError::code`], so a host can branch on failures without parsing
//! messages.
//!
//! Two outcomes are deliberately absent here: a read that returns no bytes and
//! a read that falls back from `utf8` to `base64`. Both are successful results.

use thiserror::Error;

use crate::codec::Encoding;
use crate::registry::ClientHandle;

// =============================================================================
// Error Codes
// =============================================================================

/// Missing or empty required input, rejected before any I/O.
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
/// Handle is out of range or refers to a closed session.
pub const INVALID_HANDLE: &str = "INVALID_HANDLE";
/// Payload does not conform to its declared encoding.
pub const DECODE_ERROR: &str = "DECODE_ERROR";
/// Raw bytes cannot be represented in the requested encoding.
pub const ENCODE_ERROR: &str = "ENCODE_ERROR";
/// Connect-time transport failure.
pub const CONNECTION_ERROR: &str = "CONNECTION_ERROR";
/// Send or read failure on an established connection.
pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";

// =============================================================================
// Error Types
// =============================================================================

/// Errors produced by the payload codec
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Text is not a valid instance of its encoding
    #[error("Payload is not valid {encoding}: {reason}")]
    Decode {
        /// Declared encoding of the payload
        encoding: Encoding,
        /// What was wrong with it
        reason: String,
    },

    /// Bytes cannot be rendered in the requested encoding
    #[error("Bytes cannot be encoded as {encoding}: {reason}")]
    Encode {
        /// Requested encoding
        encoding: Encoding,
        /// Why the bytes were rejected
        reason: String,
    },
}

/// Errors produced by session operations
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SocketError {
    /// Required input missing or malformed
    #[error("{0}")]
    InvalidArgument(String),

    /// Handle does not resolve to an open session
    #[error("Invalid client {handle}: {reason}")]
    InvalidHandle {
        /// The handle as supplied by the caller
        handle: i64,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Payload transcoding failed
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Connection could not be established
    #[error("Failed to connect to {address}:{port}: {message}")]
    Connection {
        /// Host that was dialled
        address: String,
        /// Port that was dialled
        port: u16,
        /// Underlying transport error description
        message: String,
    },

    /// I/O failed on an established connection
    #[error("{operation} failed on client {handle}: {message}")]
    Transport {
        /// Session the operation ran against
        handle: ClientHandle,
        /// `send` or `read`
        operation: &'static str,
        /// Underlying transport error description
        message: String,
    },
}

impl SocketError {
    /// Build an `InvalidHandle` error for a registry handle
    #[must_use]
    pub fn invalid_handle(handle: ClientHandle, reason: &'static str) -> Self {
        Self::InvalidHandle {
            handle: i64::from(handle.as_u32()),
            reason,
        }
    }

    /// Machine-readable error code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => INVALID_ARGUMENT,
            Self::InvalidHandle { .. } => INVALID_HANDLE,
            Self::Codec(CodecError::Decode { .. }) => DECODE_ERROR,
            Self::Codec(CodecError::Encode { .. }) => ENCODE_ERROR,
            Self::Connection { .. } => CONNECTION_ERROR,
            Self::Transport { .. } => TRANSPORT_ERROR,
        }
    }
}
