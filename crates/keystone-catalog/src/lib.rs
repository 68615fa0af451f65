//! Catalog and order management for Keystone.
//!
//! The protected screens of the console are thin: each mounts a
//! [`Catalog`] (one gate check), then lists and edits documents through
//! the session's token. No session logic lives here.
//!
//! # Key types
//!
//! - [`Record`]: the trait a document type implements to live in a collection
//! - [`Catalog`]: authorized list/create/update/delete over any [`Record`]
//! - [`Category`], [`Product`]: catalog entries edited by the operator
//! - [`Order`], [`OrderStatus`]: orders written by the storefront, with
//!   the status lifecycle the operator drives

mod catalog;
mod error;
mod model;
mod orders;
mod record;

pub use catalog::Catalog;
pub use error::CatalogError;
pub use model::{format_amount, image_or, Category, Product, PLACEHOLDER_IMAGE, PLACEHOLDER_THUMBNAIL};
pub use orders::{Order, OrderItem, OrderStatus};
pub use record::{Entry, Record};
