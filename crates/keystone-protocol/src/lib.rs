//! Shared types for Keystone.
//!
//! This crate defines the values that every other layer agrees on:
//!
//! - **Identity types** ([`Uid`], [`Email`], [`Token`], [`Identity`]):
//!   who the identity provider says is signed in.
//! - **Routing** ([`Destination`]): the protected screens of the console
//!   and the paths they live at.
//! - **Records** ([`AdminRecord`]): the document written when the
//!   administrator account is provisioned.
//! - **Errors** ([`ProtocolError`]): what can go wrong turning raw paths
//!   and documents into these types.
//!
//! # Architecture
//!
//! The protocol layer has no I/O. It sits underneath both the remote
//! boundary and the session layer:
//!
//! ```text
//! Remote (identity provider, document store) → Protocol (Identity) → Session (authorization)
//! ```

mod error;
mod types;

pub use error::ProtocolError;
pub use types::{AdminRecord, Destination, Email, Identity, Token, Uid, ENTRY_PATH};
