//! Session state and configuration types.

use std::fmt;
use std::time::Duration;

use keystone_protocol::{Email, Identity, Token, Uid};

use crate::SessionError;

/// The one email address allowed to administer the console.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@techinf.com";

/// Configuration for a [`SessionStore`](crate::SessionStore).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The allow-listed administrator. Compared by exact string equality.
    pub admin_email: Email,

    /// How long an error stays in [`SessionState::error`] before it
    /// clears itself.
    pub error_display: Duration,

    /// Upper bound on a single identity provider or document store call.
    /// A call that takes longer settles as a network error.
    pub gateway_timeout: Duration,
}

impl SessionConfig {
    /// Creates a config for the given administrator with default timings.
    pub fn new(admin_email: impl Into<Email>) -> Self {
        Self {
            admin_email: admin_email.into(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            admin_email: Email::new(DEFAULT_ADMIN_EMAIL),
            error_display: Duration::from_secs(5),
            gateway_timeout: Duration::from_secs(15),
        }
    }
}

/// Where a session currently stands.
///
/// This is derived from [`SessionState`], never stored.
///
/// ```text
///              login/provision
/// Anonymous ───────────────────→ Authenticating
///     ↑                            │        │
///     │ logout, None push          │ admin  │ non-admin
///     │                            ▼        ▼
///     └─────────────────────── Authenticated  Denied ──(error clears)──→ Anonymous
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// No identity held.
    Anonymous,
    /// A login or provision call is outstanding.
    Authenticating,
    /// The administrator is signed in.
    Authenticated,
    /// The last attempt authenticated a non-admin; the access-denied
    /// error is still showing.
    Denied,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Anonymous => write!(f, "anonymous"),
            SessionPhase::Authenticating => write!(f, "authenticating"),
            SessionPhase::Authenticated => write!(f, "authenticated"),
            SessionPhase::Denied => write!(f, "denied"),
        }
    }
}

/// A snapshot of the session.
///
/// Only the [`SessionStore`](crate::SessionStore) produces these; callers
/// get clones and can't push changes back. A snapshot always satisfies
/// `is_logged_in() => is_admin()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub(crate) uid: Option<Uid>,
    pub(crate) email: Option<Email>,
    pub(crate) token: Option<Token>,
    pub(crate) is_admin: bool,
    pub(crate) is_loading: bool,
    pub(crate) error: Option<SessionError>,
}

impl SessionState {
    pub(crate) fn authenticated(identity: Identity) -> Self {
        Self {
            uid: Some(identity.uid),
            email: Some(identity.email),
            token: Some(identity.token),
            is_admin: true,
            ..Self::default()
        }
    }

    pub fn uid(&self) -> Option<&Uid> {
        self.uid.as_ref()
    }

    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    /// The bearer token for document store calls, if signed in.
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// `true` while a login or provision call is outstanding.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// The error to show the operator, if any.
    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// `true` exactly when a token is held.
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    /// The held identity, when uid, email, and token are all present.
    pub fn identity(&self) -> Option<Identity> {
        match (&self.uid, &self.email, &self.token) {
            (Some(uid), Some(email), Some(token)) => Some(Identity {
                uid: uid.clone(),
                email: email.clone(),
                token: token.clone(),
            }),
            _ => None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_loading {
            SessionPhase::Authenticating
        } else if self.is_logged_in() && self.is_admin {
            SessionPhase::Authenticated
        } else if self.error == Some(SessionError::NotAdmin) {
            SessionPhase::Denied
        } else {
            SessionPhase::Anonymous
        }
    }

    /// Drops uid, email, token, and the admin flag.
    pub(crate) fn clear_identity(&mut self) {
        self.uid = None;
        self.email = None;
        self.token = None;
        self.is_admin = false;
    }

    /// `true` when `other` names the same uid, email, and token as held now.
    pub(crate) fn holds(&self, other: Option<&Identity>) -> bool {
        match other {
            Some(identity) => {
                self.uid.as_ref() == Some(&identity.uid)
                    && self.email.as_ref() == Some(&identity.email)
                    && self.token.as_ref() == Some(&identity.token)
            }
            None => self.uid.is_none() && self.email.is_none() && self.token.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Identity {
        Identity::new("u1", DEFAULT_ADMIN_EMAIL, "tok")
    }

    #[test]
    fn test_default_state_is_anonymous() {
        let state = SessionState::default();

        assert!(!state.is_logged_in());
        assert!(!state.is_admin());
        assert_eq!(state.phase(), SessionPhase::Anonymous);
        assert_eq!(state.identity(), None);
    }

    #[test]
    fn test_authenticated_state_holds_identity() {
        let state = SessionState::authenticated(admin());

        assert!(state.is_logged_in());
        assert!(state.is_admin());
        assert_eq!(state.phase(), SessionPhase::Authenticated);
        assert_eq!(state.identity(), Some(admin()));
        assert!(state.holds(Some(&admin())));
        assert!(!state.holds(None));
    }

    #[test]
    fn test_loading_wins_over_other_phases() {
        let mut state = SessionState::authenticated(admin());
        state.is_loading = true;

        assert_eq!(state.phase(), SessionPhase::Authenticating);
    }

    #[test]
    fn test_not_admin_error_is_denied_phase() {
        let state = SessionState {
            error: Some(SessionError::NotAdmin),
            ..SessionState::default()
        };

        assert_eq!(state.phase(), SessionPhase::Denied);
    }

    #[test]
    fn test_clear_identity_keeps_error_and_loading() {
        let mut state = SessionState::authenticated(admin());
        state.is_loading = true;
        state.error = Some(SessionError::InvalidCredentials);

        state.clear_identity();

        assert!(state.holds(None));
        assert!(!state.is_admin());
        assert!(state.is_loading());
        assert_eq!(state.error(), Some(&SessionError::InvalidCredentials));
    }

    #[test]
    fn test_config_defaults() {
        let config = SessionConfig::default();

        assert_eq!(config.admin_email.as_str(), DEFAULT_ADMIN_EMAIL);
        assert_eq!(config.error_display, Duration::from_secs(5));
        assert_eq!(config.gateway_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_config_new_overrides_admin_only() {
        let config = SessionConfig::new("root@example.com");

        assert_eq!(config.admin_email, Email::new("root@example.com"));
        assert_eq!(config.error_display, Duration::from_secs(5));
    }
}
