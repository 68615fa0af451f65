//! The mounted catalog: authorized CRUD over the document store.

use std::sync::Arc;

use chrono::Utc;
use keystone_protocol::{Destination, Token};
use keystone_remote::DocumentStore;
use keystone_session::{AuthorizationGate, SessionState};
use serde_json::Value;

use crate::orders::{newest_first, status_change};
use crate::record::invalid;
use crate::{CatalogError, Entry, Order, OrderStatus, Record};

/// A view onto the catalog for one protected destination.
///
/// Created by [`mount`](Self::mount), which consults the
/// [`AuthorizationGate`] exactly once. Every later call is authorized with
/// the token of the session that mounted it; if that session ends, calls
/// fail at the document store rather than here.
pub struct Catalog<D> {
    destination: Destination,
    documents: Arc<D>,
    token: Token,
}

impl<D: DocumentStore> Catalog<D> {
    /// Mounts `destination` for the given session.
    ///
    /// # Errors
    /// [`CatalogError::AccessDenied`] if the gate refuses the session.
    pub fn mount(
        destination: Destination,
        state: &SessionState,
        documents: Arc<D>,
    ) -> Result<Self, CatalogError> {
        if !AuthorizationGate::is_allowed(destination, state) {
            tracing::warn!(%destination, "catalog mount refused");
            return Err(CatalogError::AccessDenied(destination));
        }
        let token = state
            .token()
            .cloned()
            .ok_or(CatalogError::AccessDenied(destination))?;

        tracing::info!(%destination, "catalog mounted");
        Ok(Self {
            destination,
            documents,
            token,
        })
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Lists every record in `R`'s collection.
    ///
    /// Documents that don't decode as `R` are skipped with a warning, so
    /// one malformed record can't hide the rest.
    pub async fn list<R: Record>(&self) -> Result<Vec<Entry<R>>, CatalogError> {
        let Some(root) = self.documents.get(R::COLLECTION, &self.token).await? else {
            return Ok(Vec::new());
        };
        let Value::Object(children) = root else {
            tracing::warn!(collection = R::COLLECTION, "collection is not an object, treating as empty");
            return Ok(Vec::new());
        };

        let mut entries = Vec::with_capacity(children.len());
        for (id, doc) in children {
            match serde_json::from_value::<R>(doc) {
                Ok(value) => entries.push(Entry { id, value }),
                Err(error) => {
                    tracing::warn!(kind = R::KIND, %id, %error, "skipping malformed record");
                }
            }
        }
        Ok(entries)
    }

    /// Reads one record.
    ///
    /// # Errors
    /// - [`CatalogError::NotFound`] if nothing is stored at the id
    /// - [`CatalogError::Decode`] if the document doesn't decode as `R`
    pub async fn get<R: Record>(&self, id: &str) -> Result<R, CatalogError> {
        let path = R::path(id);
        let doc = self
            .documents
            .get(&path, &self.token)
            .await?
            .ok_or_else(|| CatalogError::NotFound(path.clone()))?;
        serde_json::from_value(doc).map_err(|source| CatalogError::Decode { path, source })
    }

    /// Adds a record under a new store-generated id and returns the id.
    pub async fn create<R: Record>(&self, record: &R) -> Result<String, CatalogError> {
        record.validate()?;
        let doc = encode(record)?;
        let id = self.documents.push(R::COLLECTION, doc, &self.token).await?;
        tracing::info!(kind = R::KIND, %id, "record created");
        Ok(id)
    }

    /// Merges `record`'s fields into the stored record with `id`.
    pub async fn update<R: Record>(&self, id: &str, record: &R) -> Result<(), CatalogError> {
        record.validate()?;
        let Value::Object(fields) = encode(record)? else {
            return Err(invalid::<R>("record must encode as an object"));
        };
        self.documents.update(&R::path(id), fields, &self.token).await?;
        tracing::info!(kind = R::KIND, %id, "record updated");
        Ok(())
    }

    /// Deletes the record with `id`. Deleting a missing record succeeds.
    pub async fn delete<R: Record>(&self, id: &str) -> Result<(), CatalogError> {
        self.documents.remove(&R::path(id), &self.token).await?;
        tracing::info!(kind = R::KIND, %id, "record deleted");
        Ok(())
    }

    /// Lists orders, newest first.
    pub async fn orders(&self) -> Result<Vec<Entry<Order>>, CatalogError> {
        let mut orders = self.list::<Order>().await?;
        orders.sort_by(|a, b| newest_first(&a.value.placed_at(), &b.value.placed_at()));
        Ok(orders)
    }

    /// Moves order `id` to `status` and stamps `lastUpdated`.
    ///
    /// # Errors
    /// - [`CatalogError::NotFound`] if the order doesn't exist
    /// - [`CatalogError::TerminalStatus`] if it is already delivered or
    ///   cancelled
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> Result<(), CatalogError> {
        let order = self.get::<Order>(id).await?;
        if let Some(current) = order.status.filter(OrderStatus::is_terminal) {
            return Err(CatalogError::TerminalStatus {
                id: id.to_string(),
                status: current,
            });
        }

        let fields = status_change(&status, Utc::now());
        self.documents.update(&Order::path(id), fields, &self.token).await?;
        tracing::info!(%id, %status, "order status updated");
        Ok(())
    }
}

fn encode<R: Record>(record: &R) -> Result<Value, CatalogError> {
    serde_json::to_value(record).map_err(|source| CatalogError::Decode {
        path: R::COLLECTION.to_string(),
        source,
    })
}
