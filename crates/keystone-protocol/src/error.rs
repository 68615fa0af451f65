//! Error types for the protocol layer.
//!
//! Each crate in Keystone defines its own error enum. When you see a
//! `ProtocolError`, the problem is in interpreting a value (a path, a
//! stored document), not in talking to a remote service.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The path does not name any destination the console knows about.
    #[error("unknown destination: {0}")]
    UnknownDestination(String),

    /// A stored document could not be turned into the expected type.
    ///
    /// Common causes: a record written by an older client, missing
    /// required fields, or a field holding the wrong JSON type.
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}
