//! Core value types shared across Keystone.
//!
//! Everything here is plain data: identity values handed back by the
//! identity provider, the console's protected destinations, and the
//! document recorded when the administrator is provisioned.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The identity provider's subject identifier for an account.
///
/// Opaque to Keystone: we store it, compare it, and use it as a document
/// key (`admins/{uid}`), but never parse it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Wraps a raw subject identifier.
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An account email address.
///
/// Comparison is exact and case-sensitive: `Admin@x.com` and `admin@x.com`
/// are different emails. The allow-listed administrator check relies on
/// this, so `Email` does no normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Wraps a raw email address exactly as given.
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Email {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// An opaque bearer credential issued by the identity provider.
///
/// `Debug` and `Display` are redacted so a token can be carried inside
/// structs that get logged without leaking the secret. Use
/// [`expose`](Self::expose) where the raw value is actually needed
/// (request authorization, the persistence cache).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Wraps a raw bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(<{} chars>)", self.0.len())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// One authenticated principal as reported by the identity provider.
///
/// Returned by sign-in and sign-up, and carried by every push
/// notification that reports a signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: Uid,
    pub email: Email,
    pub token: Token,
}

impl Identity {
    /// Builds an identity from its three parts.
    pub fn new(uid: impl Into<String>, email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            uid: Uid::new(uid),
            email: Email::new(email),
            token: Token::new(token),
        }
    }
}

// ---------------------------------------------------------------------------
// Destination: the protected screens of the console
// ---------------------------------------------------------------------------

/// Path of the unauthenticated entry screen. Denied navigations redirect here.
pub const ENTRY_PATH: &str = "/";

/// A protected destination of the console.
///
/// Every destination requires an authenticated administrator. The entry
/// screen (`/`) is not a `Destination`; it is always reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Product management (`/product`).
    Products,
    /// Order review and status updates (`/orders`).
    Orders,
    /// Category management (`/category`).
    Categories,
}

impl Destination {
    /// Every protected destination, in navigation-bar order.
    pub const ALL: [Destination; 3] =
        [Destination::Products, Destination::Categories, Destination::Orders];

    /// Where an operator lands right after signing in.
    pub fn landing() -> Self {
        Destination::Products
    }

    /// The route path for this destination.
    pub fn path(self) -> &'static str {
        match self {
            Destination::Products => "/product",
            Destination::Orders => "/orders",
            Destination::Categories => "/category",
        }
    }

    /// Resolves a route path to a destination.
    ///
    /// A single trailing slash is tolerated (`/orders/` is `/orders`).
    ///
    /// # Errors
    /// Returns [`ProtocolError::UnknownDestination`] for any other path,
    /// including the entry path.
    pub fn from_path(path: &str) -> Result<Self, ProtocolError> {
        let trimmed = match path.strip_suffix('/') {
            Some(rest) if !rest.is_empty() => rest,
            _ => path,
        };
        Self::ALL
            .into_iter()
            .find(|d| d.path() == trimmed)
            .ok_or_else(|| ProtocolError::UnknownDestination(path.to_string()))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// ---------------------------------------------------------------------------
// AdminRecord
// ---------------------------------------------------------------------------

/// The document written to `admins/{uid}` when the administrator account
/// is provisioned.
///
/// Field names follow the document store's camelCase convention so the
/// record matches what other clients of the same database expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRecord {
    pub email: Email,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl AdminRecord {
    /// Creates a record for `email`, stamped with the current UTC time.
    pub fn new(email: Email) -> Self {
        Self {
            email,
            is_admin: true,
            created_at: Utc::now(),
        }
    }

    /// Document path the record for `uid` lives at.
    pub fn path(uid: &Uid) -> String {
        format!("admins/{uid}")
    }

    /// Converts the record into a JSON document.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if serialization fails.
    pub fn to_document(&self) -> Result<serde_json::Value, ProtocolError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parses a record from a stored JSON document.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the document is missing fields
    /// or has the wrong shape.
    pub fn from_document(doc: serde_json::Value) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_value(doc)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_equality_is_case_sensitive() {
        assert_eq!(Email::new("admin@techinf.com"), Email::from("admin@techinf.com"));
        assert_ne!(Email::new("Admin@techinf.com"), Email::new("admin@techinf.com"));
    }

    #[test]
    fn test_token_debug_and_display_are_redacted() {
        let token = Token::new("super-secret-value");

        assert!(!format!("{token:?}").contains("super-secret"));
        assert!(!token.to_string().contains("super-secret"));
        assert_eq!(token.expose(), "super-secret-value");
    }

    #[test]
    fn test_identity_debug_does_not_leak_token() {
        let identity = Identity::new("u1", "admin@techinf.com", "tok1-secret");

        let printed = format!("{identity:?}");
        assert!(printed.contains("u1"));
        assert!(!printed.contains("tok1-secret"));
    }

    #[test]
    fn test_destination_from_path_known_paths() {
        assert_eq!(Destination::from_path("/product").unwrap(), Destination::Products);
        assert_eq!(Destination::from_path("/orders").unwrap(), Destination::Orders);
        assert_eq!(Destination::from_path("/category/").unwrap(), Destination::Categories);
    }

    #[test]
    fn test_destination_from_path_entry_is_not_a_destination() {
        let result = Destination::from_path(ENTRY_PATH);
        assert!(matches!(result, Err(ProtocolError::UnknownDestination(p)) if p == "/"));
    }

    #[test]
    fn test_destination_from_path_unknown_returns_error() {
        assert!(Destination::from_path("/admin").is_err());
        assert!(Destination::from_path("").is_err());
    }

    #[test]
    fn test_destination_landing_is_products() {
        assert_eq!(Destination::landing(), Destination::Products);
        assert_eq!(Destination::landing().to_string(), "/product");
    }

    #[test]
    fn test_admin_record_document_uses_camel_case() {
        let record = AdminRecord::new(Email::new("admin@techinf.com"));

        let doc = record.to_document().unwrap();

        assert_eq!(doc["email"], "admin@techinf.com");
        assert_eq!(doc["isAdmin"], true);
        assert!(doc["createdAt"].is_string());
        let back = AdminRecord::from_document(doc).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_admin_record_from_document_missing_field_fails() {
        let doc = serde_json::json!({ "email": "admin@techinf.com" });

        assert!(matches!(
            AdminRecord::from_document(doc),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn test_admin_record_path() {
        assert_eq!(AdminRecord::path(&Uid::new("u1")), "admins/u1");
    }
}
