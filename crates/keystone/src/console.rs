//! `Console` builder and lifecycle.
//!
//! This is the entry point for embedding the Keystone session core. It
//! ties together all the layers: cache → session store → identity
//! listener → authorization gate → catalog.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use keystone_catalog::Catalog;
use keystone_protocol::{Destination, Email};
use keystone_remote::{DocumentStore, IdentityGateway};
use keystone_session::{
    AuthorizationGate, FileCache, MemoryCache, Route, SessionConfig, SessionListener,
    SessionState, SessionStore,
};

use crate::ConsoleError;

/// Where the session is mirrored between runs.
enum CacheSource {
    Memory(MemoryCache),
    File(PathBuf),
}

/// Builder for configuring and starting a [`Console`].
///
/// # Example
///
/// ```rust,ignore
/// use keystone::prelude::*;
///
/// let console = Console::builder(gateway, documents)
///     .admin_email("ops@example.com")
///     .file_cache("/var/lib/keystone/session.json")
///     .build()?;
/// let state = console.session().login("ops@example.com", "secret").await;
/// ```
pub struct ConsoleBuilder<G, D> {
    gateway: Arc<G>,
    documents: Arc<D>,
    config: SessionConfig,
    cache: CacheSource,
}

impl<G: IdentityGateway, D: DocumentStore> ConsoleBuilder<G, D> {
    /// Creates a builder with default settings and an in-memory cache.
    pub fn new(gateway: Arc<G>, documents: Arc<D>) -> Self {
        Self {
            gateway,
            documents,
            config: SessionConfig::default(),
            cache: CacheSource::Memory(MemoryCache::new()),
        }
    }

    /// Replaces the whole session configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the one email address allowed to administer the console.
    pub fn admin_email(mut self, email: impl Into<Email>) -> Self {
        self.config.admin_email = email.into();
        self
    }

    /// Sets how long an error stays visible.
    pub fn error_display(mut self, period: Duration) -> Self {
        self.config.error_display = period;
        self
    }

    /// Sets how long a provider call may take before it counts as a
    /// network error.
    pub fn gateway_timeout(mut self, timeout: Duration) -> Self {
        self.config.gateway_timeout = timeout;
        self
    }

    /// Mirrors the session into `cache`. Clones of a [`MemoryCache`] share
    /// their contents, which lets a later console pick the session up.
    pub fn memory_cache(mut self, cache: MemoryCache) -> Self {
        self.cache = CacheSource::Memory(cache);
        self
    }

    /// Mirrors the session into a JSON file at `path`.
    pub fn file_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache = CacheSource::File(path.into());
        self
    }

    /// Opens the cache, seeds the session from it, and starts the
    /// identity listener.
    ///
    /// Must be called from inside a Tokio runtime.
    ///
    /// # Errors
    /// [`ConsoleError::Cache`] if the cache file can't be opened.
    pub fn build(self) -> Result<Console<G, D>, ConsoleError> {
        let store = match self.cache {
            CacheSource::Memory(cache) => SessionStore::start(
                self.config,
                self.gateway,
                Arc::clone(&self.documents),
                cache,
            ),
            CacheSource::File(path) => SessionStore::start(
                self.config,
                self.gateway,
                Arc::clone(&self.documents),
                FileCache::open(path)?,
            ),
        };
        let listener = SessionListener::start(store.clone());

        let state = store.state();
        tracing::info!(phase = %state.phase(), "console started");

        Ok(Console {
            store,
            listener,
            documents: self.documents,
        })
    }
}

/// A running console: the session store, its identity listener, and the
/// document store the catalog reads from.
///
/// Hand [`session`](Self::session) clones to whatever drives logins and
/// navigation. Call [`shutdown`](Self::shutdown) to tear everything down;
/// dropping the console releases the listener but leaves outstanding
/// session clones working.
pub struct Console<G, D> {
    store: SessionStore<G, D>,
    listener: SessionListener,
    documents: Arc<D>,
}

impl<G: IdentityGateway, D: DocumentStore> Console<G, D> {
    /// Creates a new builder.
    pub fn builder(gateway: Arc<G>, documents: Arc<D>) -> ConsoleBuilder<G, D> {
        ConsoleBuilder::new(gateway, documents)
    }

    /// The session store. Clone it freely.
    pub fn session(&self) -> &SessionStore<G, D> {
        &self.store
    }

    /// The latest session snapshot.
    pub fn state(&self) -> SessionState {
        self.store.state()
    }

    /// Decides what navigating to `path` shows for the current session.
    pub fn route(&self, path: &str) -> Route {
        AuthorizationGate::route(path, &self.store.state())
    }

    /// Mounts the catalog view for `destination` with the current session.
    ///
    /// # Errors
    /// [`ConsoleError::Catalog`] if the session may not open `destination`.
    pub fn catalog(&self, destination: Destination) -> Result<Catalog<D>, ConsoleError> {
        let catalog = Catalog::mount(destination, &self.store.state(), Arc::clone(&self.documents))?;
        Ok(catalog)
    }

    pub fn documents(&self) -> &Arc<D> {
        &self.documents
    }

    /// Stops the identity listener, then the session actor.
    ///
    /// Work already queued is applied first. Session clones still held
    /// elsewhere see their operations return the final state unchanged.
    pub async fn shutdown(self) {
        self.listener.stop().await;
        self.store.shutdown().await;
        tracing::info!("console stopped");
    }
}
