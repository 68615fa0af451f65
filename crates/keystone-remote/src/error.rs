/// Errors returned by the remote boundaries (identity provider and
/// document store).
///
/// The classification is deliberately coarse: callers only need to tell
/// "the password was wrong" apart from "the service could not be reached"
/// and "something else went wrong".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The provider rejected the email/password pair.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The request never got a usable answer: connection refused, DNS
    /// failure, timeout, or a 5xx from the provider.
    #[error("network error: {0}")]
    Network(String),

    /// Anything the provider reported that doesn't fit the other variants.
    #[error("{0}")]
    Unknown(String),
}
