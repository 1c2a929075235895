//! Error types for agent-session

use thiserror::Error;

/// Errors that can occur in the session engine
#[derive(Debug, Error)]
pub enum SessionError {
    /// A frame could not be decoded into a well-formed JSON-RPC message
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// A request id was registered while still outstanding.
    ///
    /// This indicates a broken id generator and is treated as a fatal
    /// invariant violation for the offending session.
    #[error("Duplicate request id: {0}")]
    DuplicateId(u64),

    /// The session was closed while the call was still pending
    #[error("Session closed")]
    SessionClosed,

    /// Write attempted on a closed transport channel
    #[error("Channel closed")]
    ChannelClosed,

    /// Tool registration with a name that is already taken
    #[error("Duplicate tool name: {0}")]
    DuplicateToolName(String),

    /// Invalid tool descriptor (e.g. an enum default outside the allowed set)
    #[error("Invalid tool descriptor for '{tool}': {reason}")]
    InvalidDescriptor { tool: String, reason: String },

    /// Operation not valid in the session's current state
    #[error("Invalid session state: expected {expected}, was {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// The initiating handshake with the agent runtime failed
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The far end answered a call with a structured JSON-RPC error
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Transport-level failure (I/O, connect, task hand-off)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
