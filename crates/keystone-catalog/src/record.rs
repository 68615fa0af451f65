//! The `Record` trait: what a document type needs to live in a collection.
//!
//! Every catalog resource is a flat collection of JSON documents keyed by
//! a store-generated id (`categories/{id}`, `products/{id}`,
//! `orders/{id}`). Implementing [`Record`] is all it takes for
//! [`Catalog`](crate::Catalog) to list, create, update, and delete it.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::CatalogError;

/// A document type stored under one top-level collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Top-level path of the collection, e.g. `"categories"`.
    const COLLECTION: &'static str;

    /// Singular name used in logs and errors, e.g. `"category"`.
    const KIND: &'static str;

    /// Checks fields before a create or update. Default: accept.
    fn validate(&self) -> Result<(), CatalogError> {
        Ok(())
    }

    /// Document path of the record with `id`.
    fn path(id: &str) -> String {
        format!("{}/{id}", Self::COLLECTION)
    }
}

/// A record together with its document id.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    pub id: String,
    pub value: T,
}

impl<T> Entry<T> {
    pub fn new(id: impl Into<String>, value: T) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// Builds a [`CatalogError::Invalid`] for record type `R`.
pub(crate) fn invalid<R: Record>(reason: impl Into<String>) -> CatalogError {
    CatalogError::Invalid {
        kind: R::KIND,
        reason: reason.into(),
    }
}

/// Reads a money amount that may have been stored as a number, a numeric
/// string, an empty string, or null. The last two read as zero.
pub(crate) fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom("amount out of range")),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s.trim().parse().map_err(D::Error::custom),
        Value::Null => Ok(0.0),
        other => Err(D::Error::custom(format!("expected an amount, found {other}"))),
    }
}
