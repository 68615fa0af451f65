//! REST bindings for the hosted identity provider and document database.
//!
//! The identity side talks to the identity toolkit API
//! (`accounts:signInWithPassword`, `accounts:signUp`). The document side
//! talks to the realtime database REST API, where every path is addressed
//! as `{database_url}/{path}.json?auth={token}`.

use std::time::Duration;

use keystone_protocol::{Email, Identity, Token};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{DocumentStore, IdentityFeed, IdentityGateway, RemoteError};

/// Default identity toolkit endpoint.
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Connection settings for the hosted services.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Web API key of the project.
    pub api_key: String,
    /// Identity toolkit base URL. Override for emulators.
    pub identity_base_url: String,
    /// Realtime database URL, e.g. `https://my-project.firebaseio.com`.
    pub database_url: String,
    /// Per-request timeout. Expiry is reported as a network error.
    pub timeout: Duration,
}

impl RestConfig {
    /// Creates a config with the default identity endpoint and a 15 s timeout.
    pub fn new(api_key: impl Into<String>, database_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            database_url: database_url.into(),
            timeout: Duration::from_secs(15),
        }
    }

    fn client(&self) -> Result<Client, RemoteError> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| RemoteError::Unknown(format!("http client setup failed: {e}")))
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        RemoteError::Network(e.to_string())
    } else {
        RemoteError::Unknown(e.to_string())
    }
}

async fn send(request: RequestBuilder) -> Result<Response, RemoteError> {
    request.send().await.map_err(transport_error)
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    email: String,
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Maps an identity toolkit error response onto [`RemoteError`].
///
/// Provider messages look like `INVALID_PASSWORD` or
/// `WEAK_PASSWORD : Password should be at least 6 characters`; only the
/// code before ` : ` is significant.
pub(crate) fn classify_provider_error(status: StatusCode, message: &str) -> RemoteError {
    let code = message.split(" : ").next().unwrap_or(message).trim();
    match code {
        "INVALID_PASSWORD"
        | "EMAIL_NOT_FOUND"
        | "INVALID_LOGIN_CREDENTIALS"
        | "INVALID_EMAIL"
        | "MISSING_PASSWORD"
        | "USER_DISABLED" => RemoteError::InvalidCredentials,
        "EMAIL_EXISTS" => RemoteError::Unknown("email already exists".into()),
        "WEAK_PASSWORD" => RemoteError::Unknown("password is too weak".into()),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => {
            RemoteError::Unknown("too many attempts, try again later".into())
        }
        _ if status.is_server_error() => RemoteError::Network(format!("{status}: {code}")),
        _ => RemoteError::Unknown(code.to_string()),
    }
}

/// [`IdentityGateway`] backed by the identity toolkit REST API.
///
/// The REST API has no push channel of its own, so this gateway publishes
/// to its [`IdentityFeed`] after every successful sign-in, sign-up, and
/// sign-out, the way the provider's client SDK does.
/// Until the first of those, the feed is
/// [`pending`](IdentityFeed::pending): a session restored from an
/// earlier run stays in place.
pub struct RestIdentityGateway {
    client: Client,
    config: RestConfig,
    feed: IdentityFeed,
}

impl RestIdentityGateway {
    /// Creates a gateway for the given project.
    ///
    /// # Errors
    /// Returns [`RemoteError::Unknown`] if the HTTP client can't be built
    /// (e.g. no TLS backend available).
    pub fn new(config: RestConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            client: config.client()?,
            config,
            feed: IdentityFeed::pending(),
        })
    }

    async fn password_request(
        &self,
        endpoint: &str,
        email: &Email,
        password: &str,
    ) -> Result<Identity, RemoteError> {
        let url = format!("{}/accounts:{endpoint}", self.config.identity_base_url);
        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password,
            "returnSecureToken": true,
        });
        let response = send(
            self.client
                .post(url)
                .query(&[("key", self.config.api_key.as_str())])
                .json(&body),
        )
        .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope.error.message,
                Err(_) => status.to_string(),
            };
            return Err(classify_provider_error(status, &message));
        }

        let auth: AuthResponse = response.json().await.map_err(transport_error)?;
        let identity = Identity::new(auth.local_id, auth.email, auth.id_token);
        self.feed.publish(Some(identity.clone()));
        Ok(identity)
    }
}

impl IdentityGateway for RestIdentityGateway {
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, RemoteError> {
        self.password_request("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &Email, password: &str) -> Result<Identity, RemoteError> {
        self.password_request("signUp", email, password).await
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        // ID tokens are stateless; signing out only forgets the local identity.
        self.feed.publish(None);
        Ok(())
    }

    fn feed(&self) -> &IdentityFeed {
        &self.feed
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

fn document_url(database_url: &str, path: &str) -> String {
    format!(
        "{}/{}.json",
        database_url.trim_end_matches('/'),
        path.trim_matches('/')
    )
}

fn status_error(status: StatusCode) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RemoteError::Unknown("permission denied".into())
        }
        s if s.is_server_error() => RemoteError::Network(s.to_string()),
        s => RemoteError::Unknown(s.to_string()),
    }
}

fn expect_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(status_error(status))
    }
}

/// [`DocumentStore`] backed by the realtime database REST API.
pub struct RestDocumentStore {
    client: Client,
    database_url: String,
}

impl RestDocumentStore {
    /// Creates a store for `config.database_url`.
    ///
    /// # Errors
    /// Returns [`RemoteError::Unknown`] if the HTTP client can't be built.
    pub fn new(config: &RestConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            client: config.client()?,
            database_url: config.database_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        document_url(&self.database_url, path)
    }
}

impl DocumentStore for RestDocumentStore {
    async fn get(&self, path: &str, auth: &Token) -> Result<Option<Value>, RemoteError> {
        let request = self.client.get(self.url(path)).query(&[("auth", auth.expose())]);
        let response = expect_success(send(request).await?)?;
        let value: Value = response.json().await.map_err(transport_error)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn set(&self, path: &str, value: Value, auth: &Token) -> Result<(), RemoteError> {
        let request = self
            .client
            .put(self.url(path))
            .query(&[("auth", auth.expose())])
            .json(&value);
        expect_success(send(request).await?)?;
        Ok(())
    }

    async fn update(
        &self,
        path: &str,
        fields: Map<String, Value>,
        auth: &Token,
    ) -> Result<(), RemoteError> {
        let request = self
            .client
            .patch(self.url(path))
            .query(&[("auth", auth.expose())])
            .json(&fields);
        expect_success(send(request).await?)?;
        Ok(())
    }

    async fn push(&self, path: &str, value: Value, auth: &Token) -> Result<String, RemoteError> {
        let request = self
            .client
            .post(self.url(path))
            .query(&[("auth", auth.expose())])
            .json(&value);
        let response = expect_success(send(request).await?)?;
        let pushed: PushResponse = response.json().await.map_err(transport_error)?;
        Ok(pushed.name)
    }

    async fn remove(&self, path: &str, auth: &Token) -> Result<(), RemoteError> {
        let request = self.client.delete(self.url(path)).query(&[("auth", auth.expose())]);
        expect_success(send(request).await?)?;
        Ok(())
    }
}
