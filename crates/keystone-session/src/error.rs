//! Error types for the session layer.

use keystone_remote::RemoteError;

/// Errors captured into [`SessionState::error`](crate::SessionState::error).
///
/// These never escape a [`SessionStore`](crate::SessionStore) operation as
/// an `Err`: every operation returns the resulting state, and the error
/// lives there until it auto-clears. `Display` is the text shown to the
/// operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Email or password was empty after trimming. Rejected before any
    /// network call.
    #[error("{0}")]
    Validation(String),

    /// The identity provider rejected the email/password pair.
    #[error("Invalid email or password.")]
    InvalidCredentials,

    /// The identity is not the allow-listed administrator.
    #[error("Access denied. Admins only.")]
    NotAdmin,

    /// The identity provider or document store could not be reached,
    /// or did not answer in time.
    #[error("Network error: {0}")]
    Network(String),

    /// Anything else the provider reported.
    #[error("{0}")]
    Unknown(String),

    /// Provisioning created the administrator identity, but the admin
    /// record could not be written to the document store. The session is
    /// authenticated; the record is missing.
    #[error("Admin account created, but its record could not be saved: {0}")]
    RecordWrite(String),
}

/// Coarse classification of a [`SessionError`], for callers that branch
/// on the kind of failure rather than its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    InvalidCredentials,
    NotAdmin,
    Network,
    Unknown,
    RecordWrite,
}

impl SessionError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Validation(_) => ErrorKind::Validation,
            SessionError::InvalidCredentials => ErrorKind::InvalidCredentials,
            SessionError::NotAdmin => ErrorKind::NotAdmin,
            SessionError::Network(_) => ErrorKind::Network,
            SessionError::Unknown(_) => ErrorKind::Unknown,
            SessionError::RecordWrite(_) => ErrorKind::RecordWrite,
        }
    }
}

impl From<RemoteError> for SessionError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::InvalidCredentials => SessionError::InvalidCredentials,
            RemoteError::Network(msg) => SessionError::Network(msg),
            RemoteError::Unknown(msg) => SessionError::Unknown(msg),
        }
    }
}

/// Errors from a [`PersistenceCache`](crate::PersistenceCache) backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing the backing file failed.
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but does not hold a JSON object of strings.
    #[error("cache file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
