//! Administrator session management for Keystone.
//!
//! This crate owns the answer to one question: *who is signed in, and may
//! they use the console?*
//!
//! 1. **State**: [`SessionState`] snapshots, produced only by the
//!    [`SessionStore`] actor
//! 2. **Persistence**: the session survives restarts through a
//!    [`PersistenceCache`] ([`MemoryCache`], [`FileCache`])
//! 3. **Push handling**: [`SessionListener`] forwards the identity
//!    provider's out-of-band changes into the store
//! 4. **Authorization**: [`AuthorizationGate`] decides, from a snapshot
//!    alone, whether a protected destination may be shown
//!
//! # How it fits in the stack
//!
//! ```text
//! Catalog Layer (above)  ← checks the gate, borrows the session token
//!     ↕
//! Session Layer (this crate)  ← one admin session, serialized in an actor
//!     ↕
//! Remote Layer (below)  ← IdentityGateway, DocumentStore
//! ```
//!
//! Only one email address is ever allowed through: the configured
//! [`SessionConfig::admin_email`]. Every snapshot satisfies
//! `is_logged_in() => is_admin()`.

mod cache;
mod error;
mod gate;
mod listener;
mod session;
mod store;

pub use cache::{CacheKey, FileCache, MemoryCache, PersistenceCache};
pub use error::{CacheError, ErrorKind, SessionError};
pub use gate::{AuthorizationGate, Route};
pub use listener::SessionListener;
pub use session::{SessionConfig, SessionPhase, SessionState, DEFAULT_ADMIN_EMAIL};
pub use store::{SessionStore, CREDENTIALS_REQUIRED};
