//! In-process implementations of the remote boundaries.
//!
//! [`MemoryIdentityGateway`] behaves like a hosted identity provider with
//! an account table kept in memory, including the out-of-band pushes a
//! real provider sends after sign-in and sign-out. [`MemoryDocumentStore`]
//! keeps one JSON tree. Both exist so the console can run offline and so
//! tests can exercise the session layer without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use keystone_protocol::{Email, Identity, Token, Uid};
use serde_json::{Map, Value};

use crate::{random_hex, DocumentStore, IdentityFeed, IdentityGateway, RemoteError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// MemoryIdentityGateway
// ---------------------------------------------------------------------------

struct Account {
    uid: Uid,
    password: String,
}

/// An identity provider whose accounts live in memory.
///
/// Every successful sign-in or sign-up mints a fresh token and pushes the
/// new identity to subscribers; sign-out pushes `None`.
///
/// # Example
///
/// ```rust
/// use keystone_protocol::Email;
/// use keystone_remote::{IdentityGateway, MemoryIdentityGateway};
///
/// # async fn example() {
/// let gateway = MemoryIdentityGateway::new()
///     .with_account("admin@techinf.com", "secret");
///
/// let identity = gateway
///     .sign_in(&Email::new("admin@techinf.com"), "secret")
///     .await
///     .unwrap();
/// assert_eq!(identity.email.as_str(), "admin@techinf.com");
/// # }
/// ```
pub struct MemoryIdentityGateway {
    accounts: Mutex<HashMap<Email, Account>>,
    feed: IdentityFeed,
    fail_sign_out: AtomicBool,
}

impl MemoryIdentityGateway {
    /// Creates a provider with no accounts.
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            feed: IdentityFeed::new(),
            fail_sign_out: AtomicBool::new(false),
        }
    }

    /// Adds an existing account (builder style).
    pub fn with_account(self, email: &str, password: &str) -> Self {
        lock(&self.accounts).insert(
            Email::new(email),
            Account {
                uid: Uid::new(random_hex::<8>()),
                password: password.to_string(),
            },
        );
        self
    }

    /// Makes every later [`sign_out`](IdentityGateway::sign_out) fail with
    /// a network error, as if the provider were unreachable.
    pub fn set_sign_out_failure(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Returns `true` if an account exists for `email`.
    pub fn has_account(&self, email: &str) -> bool {
        lock(&self.accounts).contains_key(&Email::new(email))
    }

    fn issue(&self, uid: Uid, email: Email) -> Identity {
        let identity = Identity {
            uid,
            email,
            token: Token::new(random_hex::<16>()),
        };
        self.feed.publish(Some(identity.clone()));
        identity
    }
}

impl Default for MemoryIdentityGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityGateway for MemoryIdentityGateway {
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, RemoteError> {
        let uid = {
            let accounts = lock(&self.accounts);
            match accounts.get(email) {
                Some(account) if account.password == password => account.uid.clone(),
                _ => return Err(RemoteError::InvalidCredentials),
            }
        };
        tracing::debug!(%uid, "memory provider signed in");
        Ok(self.issue(uid, email.clone()))
    }

    async fn sign_up(&self, email: &Email, password: &str) -> Result<Identity, RemoteError> {
        let uid = {
            let mut accounts = lock(&self.accounts);
            if accounts.contains_key(email) {
                return Err(RemoteError::Unknown("email already exists".into()));
            }
            let uid = Uid::new(random_hex::<8>());
            accounts.insert(
                email.clone(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                },
            );
            uid
        };
        tracing::debug!(%uid, "memory provider created account");
        Ok(self.issue(uid, email.clone()))
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("identity provider unreachable".into()));
        }
        self.feed.publish(None);
        Ok(())
    }

    /// Tests publish here directly to simulate pushes that don't originate
    /// from a call (token refresh, another device signing out).
    fn feed(&self) -> &IdentityFeed {
        &self.feed
    }
}

// ---------------------------------------------------------------------------
// MemoryDocumentStore
// ---------------------------------------------------------------------------

/// A document store holding a single JSON tree in memory.
///
/// Paths address nested objects: `orders/abc` is `root["orders"]["abc"]`.
/// Tokens are accepted without checking.
pub struct MemoryDocumentStore {
    root: Mutex<Value>,
    fail_writes: AtomicBool,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_root(Value::Object(Map::new()))
    }

    /// Creates a store pre-loaded with `root`.
    pub fn with_root(root: Value) -> Self {
        Self {
            root: Mutex::new(root),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every later write fail with a network error. Reads keep working.
    pub fn set_write_failure(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of the whole tree.
    pub fn snapshot(&self) -> Value {
        lock(&self.root).clone()
    }

    fn check_writable(&self) -> Result<(), RemoteError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(RemoteError::Network("document store unreachable".into()))
        } else {
            Ok(())
        }
    }

    /// Returns the object at `segments`, creating empty objects on the way.
    /// Any non-object value found on the way is replaced.
    fn object_at<'a>(root: &'a mut Value, segments: &[&str]) -> &'a mut Map<String, Value> {
        let mut map = ensure_object(root);
        for segment in segments {
            let child = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            map = ensure_object(child);
        }
        map
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made an object"),
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &str, _auth: &Token) -> Result<Option<Value>, RemoteError> {
        let root = lock(&self.root);
        let mut node = &*root;
        for segment in segments(path) {
            match node.get(segment) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        Ok(if node.is_null() { None } else { Some(node.clone()) })
    }

    async fn set(&self, path: &str, value: Value, _auth: &Token) -> Result<(), RemoteError> {
        self.check_writable()?;
        let parts = segments(path);
        let mut root = lock(&self.root);
        match parts.split_last() {
            Some((last, parents)) => {
                Self::object_at(&mut root, parents).insert(last.to_string(), value);
            }
            None => *root = value,
        }
        Ok(())
    }

    async fn update(
        &self,
        path: &str,
        fields: Map<String, Value>,
        _auth: &Token,
    ) -> Result<(), RemoteError> {
        self.check_writable()?;
        let parts = segments(path);
        let mut root = lock(&self.root);
        Self::object_at(&mut root, &parts).extend(fields);
        Ok(())
    }

    async fn push(&self, path: &str, value: Value, _auth: &Token) -> Result<String, RemoteError> {
        self.check_writable()?;
        let key = format!("-{}", random_hex::<10>());
        let parts = segments(path);
        let mut root = lock(&self.root);
        Self::object_at(&mut root, &parts).insert(key.clone(), value);
        Ok(key)
    }

    async fn remove(&self, path: &str, _auth: &Token) -> Result<(), RemoteError> {
        self.check_writable()?;
        let parts = segments(path);
        let mut root = lock(&self.root);
        let Some((last, parents)) = parts.split_last() else {
            *root = Value::Object(Map::new());
            return Ok(());
        };
        let mut node = &mut *root;
        for segment in parents {
            match node.get_mut(*segment) {
                Some(child) => node = child,
                None => return Ok(()),
            }
        }
        if let Value::Object(map) = node {
            map.remove(*last);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn token() -> Token {
        Token::new("t")
    }

    #[tokio::test]
    async fn test_get_missing_path_returns_none() {
        let store = MemoryDocumentStore::new();

        assert_eq!(store.get("categories", &token()).await.unwrap(), None);
        assert_eq!(store.get("a/b/c", &token()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_creates_intermediate_objects() {
        let store = MemoryDocumentStore::new();

        store.set("admins/u1", json!({ "isAdmin": true }), &token()).await.unwrap();

        assert_eq!(store.snapshot(), json!({ "admins": { "u1": { "isAdmin": true } } }));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryDocumentStore::with_root(json!({
            "orders": { "o1": { "status": "placed", "total": 10 } }
        }));
        let mut fields = Map::new();
        fields.insert("status".into(), json!("processing"));

        store.update("orders/o1", fields, &token()).await.unwrap();

        let order = store.get("orders/o1", &token()).await.unwrap().unwrap();
        assert_eq!(order, json!({ "status": "processing", "total": 10 }));
    }

    #[tokio::test]
    async fn test_push_generates_distinct_keys() {
        let store = MemoryDocumentStore::new();

        let k1 = store.push("categories", json!({ "title": "A" }), &token()).await.unwrap();
        let k2 = store.push("categories", json!({ "title": "B" }), &token()).await.unwrap();

        assert_ne!(k1, k2);
        let all = store.get("categories", &token()).await.unwrap().unwrap();
        assert_eq!(all.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_deletes_only_target() {
        let store = MemoryDocumentStore::with_root(json!({
            "products": { "p1": { "title": "x" }, "p2": { "title": "y" } }
        }));

        store.remove("products/p1", &token()).await.unwrap();
        store.remove("products/missing", &token()).await.unwrap();

        assert_eq!(store.snapshot(), json!({ "products": { "p2": { "title": "y" } } }));
    }

    #[tokio::test]
    async fn test_write_failure_rejects_writes_but_not_reads() {
        let store = MemoryDocumentStore::with_root(json!({ "a": 1 }));
        store.set_write_failure(true);

        let result = store.set("b", json!(2), &token()).await;

        assert!(matches!(result, Err(RemoteError::Network(_))));
        assert_eq!(store.get("a", &token()).await.unwrap(), Some(json!(1)));
    }
}
