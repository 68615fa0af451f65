//! Unified error type for the Keystone console.

use keystone_catalog::CatalogError;
use keystone_protocol::ProtocolError;
use keystone_remote::RemoteError;
use keystone_session::{CacheError, SessionError};

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `keystone` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. Session outcomes
/// normally live in [`SessionState::error`](keystone_session::SessionState::error);
/// the `Session` variant is for callers that want to turn such an outcome
/// into a failure with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// A value could not be interpreted (a path, a stored document).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The identity provider or document store failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The local session cache could not be opened.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A session transition ended in an error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A catalog operation failed or was refused.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use keystone_protocol::Destination;

    use super::*;

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownDestination("/nowhere".into());
        let console_err: ConsoleError = err.into();
        assert!(matches!(console_err, ConsoleError::Protocol(_)));
        assert!(console_err.to_string().contains("/nowhere"));
    }

    #[test]
    fn test_from_remote_error() {
        let err = RemoteError::Network("offline".into());
        let console_err: ConsoleError = err.into();
        assert!(matches!(console_err, ConsoleError::Remote(_)));
    }

    #[test]
    fn test_from_cache_error() {
        let err = CacheError::Io(std::io::Error::other("disk full"));
        let console_err: ConsoleError = err.into();
        assert!(matches!(console_err, ConsoleError::Cache(_)));
    }

    #[test]
    fn test_from_session_error_keeps_message() {
        let console_err: ConsoleError = SessionError::NotAdmin.into();
        assert_eq!(console_err.to_string(), "Access denied. Admins only.");
    }

    #[test]
    fn test_from_catalog_error() {
        let err = CatalogError::AccessDenied(Destination::Orders);
        let console_err: ConsoleError = err.into();
        assert!(matches!(console_err, ConsoleError::Catalog(_)));
    }
}
