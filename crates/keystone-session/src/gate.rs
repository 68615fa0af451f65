//! Route authorization.
//!
//! The gate is a pure function of a [`SessionState`] snapshot: it reads
//! nothing else and changes nothing. Every protected destination needs the
//! same thing, a signed-in administrator.

use keystone_protocol::{Destination, ENTRY_PATH};

use crate::SessionState;

/// What the console should do with a requested path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Show the entry (sign-in) screen.
    Entry,
    /// Show the protected destination.
    Allow(Destination),
    /// Send the operator to the entry screen instead.
    Redirect { to: &'static str },
    /// No such screen.
    NotFound,
}

/// Decides whether a session may see a protected destination.
pub struct AuthorizationGate;

impl AuthorizationGate {
    /// `true` iff the session is logged in and is the administrator.
    ///
    /// The same rule applies to every destination.
    pub fn is_allowed(destination: Destination, state: &SessionState) -> bool {
        let allowed = state.is_logged_in() && state.is_admin();
        if !allowed {
            tracing::debug!(%destination, "authorization gate denied access");
        }
        allowed
    }

    /// Resolves a requested path against the session.
    ///
    /// The entry path is always reachable. A protected path is allowed
    /// only through [`is_allowed`](Self::is_allowed); otherwise the
    /// operator is redirected to the entry path.
    pub fn route(path: &str, state: &SessionState) -> Route {
        if path == ENTRY_PATH || path.is_empty() {
            return Route::Entry;
        }
        match Destination::from_path(path) {
            Ok(destination) if Self::is_allowed(destination, state) => Route::Allow(destination),
            Ok(_) => Route::Redirect { to: ENTRY_PATH },
            Err(_) => Route::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use keystone_protocol::Identity;

    use super::*;
    use crate::SessionError;

    fn admin_state() -> SessionState {
        SessionState::authenticated(Identity::new("u1", "admin@techinf.com", "tok"))
    }

    #[test]
    fn test_is_allowed_admin_every_destination() {
        let state = admin_state();

        for destination in Destination::ALL {
            assert!(AuthorizationGate::is_allowed(destination, &state));
        }
    }

    #[test]
    fn test_is_allowed_anonymous_denied() {
        let state = SessionState::default();

        for destination in Destination::ALL {
            assert!(!AuthorizationGate::is_allowed(destination, &state));
        }
    }

    #[test]
    fn test_is_allowed_token_without_admin_flag_denied() {
        let mut state = admin_state();
        state.is_admin = false;

        assert!(!AuthorizationGate::is_allowed(Destination::Orders, &state));
    }

    #[test]
    fn test_is_allowed_admin_flag_without_token_denied() {
        let mut state = admin_state();
        state.token = None;

        assert!(!AuthorizationGate::is_allowed(Destination::Products, &state));
    }

    #[test]
    fn test_is_allowed_ignores_loading_and_error() {
        let mut state = admin_state();
        state.is_loading = true;
        state.error = Some(SessionError::Network("x".into()));

        assert!(AuthorizationGate::is_allowed(Destination::Categories, &state));
    }

    #[test]
    fn test_route_entry_always_reachable() {
        assert_eq!(AuthorizationGate::route("/", &SessionState::default()), Route::Entry);
        assert_eq!(AuthorizationGate::route("/", &admin_state()), Route::Entry);
    }

    #[test]
    fn test_route_protected_path_for_admin_allows() {
        assert_eq!(
            AuthorizationGate::route("/orders", &admin_state()),
            Route::Allow(Destination::Orders)
        );
    }

    #[test]
    fn test_route_protected_path_for_anonymous_redirects() {
        assert_eq!(
            AuthorizationGate::route("/product", &SessionState::default()),
            Route::Redirect { to: "/" }
        );
    }

    #[test]
    fn test_route_unknown_path_not_found() {
        assert_eq!(AuthorizationGate::route("/settings", &admin_state()), Route::NotFound);
    }
}
