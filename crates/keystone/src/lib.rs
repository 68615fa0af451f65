//! # Keystone
//!
//! Session and authorization core for a single-administrator admin
//! console.
//!
//! Keystone keeps one authoritative session record, fed by explicit
//! logins and by identity pushes from the provider, mirrors it into a
//! local cache so it survives restarts, and answers one question for
//! every protected destination: may this session open it?
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use keystone::prelude::*;
//!
//! # async fn run() -> Result<(), ConsoleError> {
//! let gateway = Arc::new(MemoryIdentityGateway::new().with_account("admin@techinf.com", "secret"));
//! let documents = Arc::new(MemoryDocumentStore::new());
//!
//! let console = Console::builder(gateway, documents).build()?;
//! let state = console.session().login("admin@techinf.com", "secret").await;
//! assert!(state.is_logged_in());
//!
//! let orders = console.catalog(Destination::Orders)?.orders().await?;
//! console.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod console;
mod error;
pub mod telemetry;

pub use console::{Console, ConsoleBuilder};
pub use error::ConsoleError;

pub use keystone_catalog as catalog;
pub use keystone_protocol as protocol;
pub use keystone_remote as remote;
pub use keystone_session as session;

/// Everything needed to start a console and drive a session.
pub mod prelude {
    pub use crate::{Console, ConsoleBuilder, ConsoleError};

    pub use keystone_catalog::{
        Catalog, CatalogError, Category, Entry, Order, OrderItem, OrderStatus, Product, Record,
    };
    pub use keystone_protocol::{Destination, Email, Identity, Token, Uid};
    pub use keystone_remote::{
        DocumentStore, IdentityGateway, MemoryDocumentStore, MemoryIdentityGateway, RemoteError,
    };
    #[cfg(feature = "rest")]
    pub use keystone_remote::{RestConfig, RestDocumentStore, RestIdentityGateway};
    pub use keystone_session::{
        AuthorizationGate, ErrorKind, Route, SessionConfig, SessionError, SessionPhase,
        SessionState, SessionStore,
    };
}
