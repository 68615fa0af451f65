//! Remote boundaries for Keystone.
//!
//! Provides the [`IdentityGateway`] and [`DocumentStore`] traits that
//! abstract over the hosted identity provider and the document database,
//! plus the push feed gateways use to report identity changes.
//!
//! # Implementations
//!
//! - [`MemoryIdentityGateway`] / [`MemoryDocumentStore`]: in-process,
//!   used by tests and offline runs.
//! - `RestIdentityGateway` / `RestDocumentStore`: the hosted REST APIs
//!   (feature `rest`, enabled by default).
//!
//! # Feature Flags
//!
//! - `rest` (default): REST bindings via `reqwest`

mod error;
mod feed;
mod memory;
#[cfg(feature = "rest")]
mod rest;

pub use error::RemoteError;
pub use feed::{IdentityFeed, IdentitySubscription, IssueClock, Push};
pub use memory::{MemoryDocumentStore, MemoryIdentityGateway};
#[cfg(feature = "rest")]
pub use rest::{RestConfig, RestDocumentStore, RestIdentityGateway};

use std::future::Future;

use keystone_protocol::{Email, Identity, Token};
use rand::Rng;
use serde_json::{Map, Value};

/// Wraps the remote identity provider.
///
/// Stateless from the caller's point of view: every call stands on its
/// own, and the only long-lived thing a gateway hands out is the push
/// subscription returned by [`subscribe`](Self::subscribe). Every gateway
/// owns an [`IdentityFeed`]; its [`IssueClock`] is the one clock the
/// session orders its own operations by.
///
/// # Trait bounds
///
/// - `Send + Sync` → one gateway is shared by the session store, the
///   listener task, and whoever drives logins.
/// - `'static` → it lives as long as the console.
pub trait IdentityGateway: Send + Sync + 'static {
    /// Signs in with an email/password pair.
    ///
    /// # Returns
    /// - `Ok(Identity)`: the account the provider signed in
    /// - `Err(RemoteError::InvalidCredentials)`: wrong email or password
    /// - `Err(RemoteError::Network | Unknown)`: anything else
    fn sign_in(
        &self,
        email: &Email,
        password: &str,
    ) -> impl Future<Output = Result<Identity, RemoteError>> + Send;

    /// Creates a new account and signs it in.
    fn sign_up(
        &self,
        email: &Email,
        password: &str,
    ) -> impl Future<Output = Result<Identity, RemoteError>> + Send;

    /// Ends the provider-side session.
    fn sign_out(&self) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// The feed this provider publishes identity changes to.
    fn feed(&self) -> &IdentityFeed;

    /// Registers a push channel for identity changes.
    ///
    /// The subscription yields the currently known identity (or `None`)
    /// first, then every later change. The same identity may be reported
    /// more than once. Dropping the subscription unsubscribes.
    fn subscribe(&self) -> IdentitySubscription {
        self.feed().subscribe()
    }
}

/// A JSON document database addressed by slash-separated paths
/// (`categories`, `orders/-Nabc`, `admins/{uid}`).
///
/// Every call is authorized with the signed-in administrator's token.
pub trait DocumentStore: Send + Sync + 'static {
    /// Reads the document at `path`. `Ok(None)` when nothing is stored there.
    fn get(
        &self,
        path: &str,
        auth: &Token,
    ) -> impl Future<Output = Result<Option<Value>, RemoteError>> + Send;

    /// Replaces the document at `path`.
    fn set(
        &self,
        path: &str,
        value: Value,
        auth: &Token,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Merges `fields` into the object at `path`, leaving other fields alone.
    fn update(
        &self,
        path: &str,
        fields: Map<String, Value>,
        auth: &Token,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Appends `value` under a freshly generated child key of `path` and
    /// returns that key.
    fn push(
        &self,
        path: &str,
        value: Value,
        auth: &Token,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send;

    /// Deletes the document at `path`. Deleting a missing path is not an error.
    fn remove(
        &self,
        path: &str,
        auth: &Token,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// Generates a random lowercase hex string of `2 * N` characters.
///
/// Used for in-memory uids, tokens, and document push keys.
pub(crate) fn random_hex<const N: usize>() -> String {
    let bytes: [u8; N] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
