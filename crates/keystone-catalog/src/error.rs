//! Error types for the catalog layer.

use keystone_protocol::Destination;
use keystone_remote::RemoteError;

use crate::OrderStatus;

/// Errors that can occur while managing catalog resources.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The session may not see this destination. Checked once, on mount.
    #[error("You must be logged in as admin to access {0}.")]
    AccessDenied(Destination),

    /// A record failed a field check before anything was written.
    #[error("invalid {kind}: {reason}")]
    Invalid { kind: &'static str, reason: String },

    /// No document at the given path.
    #[error("{0} not found")]
    NotFound(String),

    /// The order is delivered or cancelled and can no longer change.
    #[error("order {id} is {status} and cannot be changed")]
    TerminalStatus { id: String, status: OrderStatus },

    /// A stored document doesn't have the expected shape.
    #[error("malformed document at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The document store call failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
