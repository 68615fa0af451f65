//! The session store: single owner of the administrator session.
//!
//! All state lives in one actor task. Callers hold a cheap, cloneable
//! [`SessionStore`] handle; every mutation is a message on one ordered
//! queue, and every observer reads snapshots from a `watch` channel.
//!
//! # Ordering
//!
//! Provider calls (sign-in, sign-up, sign-out) run in the caller's task,
//! so the actor never blocks on the network. That means results can come
//! back out of order with respect to each other and to the provider's own
//! pushes. Two numbers sort this out:
//!
//! - Every operation and every push takes a sequence number when it is
//!   *issued*. Operations draw from the gateway feed's
//!   [`IssueClock`](keystone_remote::IssueClock) under the same lock that
//!   enqueues their first message. Pushes are stamped from that clock when
//!   the provider publishes them, so a push that reaches the actor late
//!   still sorts before every operation issued after it.
//! - The actor keeps a *watermark*: the sequence number of the last event
//!   that changed the held identity (or of the last explicit operation).
//!   A result issued below the watermark has been superseded and must not
//!   touch the identity.
//!
//! Errors follow a separate rule: a result's error is shown only when it
//! belongs to the most recently issued explicit operation.
//!
//! ```text
//! login() ──Begin(n)──→ ┐
//!   │                   │   ┌────────────────────┐
//!   └─ sign_in ... ─────┼─→ │  actor (one task)  │ ──watch──→ observers
//!          Settle(n) ──→│   │  state, cache,     │
//! listener ─External(m)→┘   │  watermark, timer  │
//!                           └────────────────────┘
//! ```

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use keystone_protocol::{AdminRecord, Email, Identity};
use keystone_remote::{DocumentStore, IdentityGateway, IssueClock, Push, RemoteError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, timeout, Instant};

use crate::{CacheError, CacheKey, PersistenceCache, SessionConfig, SessionError, SessionState};

/// Shown when email or password is blank.
pub const CREDENTIALS_REQUIRED: &str = "Email and password are required.";

/// How a provider call ended, as reported back to the actor.
enum Settlement {
    /// The administrator signed in. `warning` is an error to show even
    /// though the session is now authenticated.
    Granted {
        identity: Identity,
        warning: Option<SessionError>,
    },
    /// Someone other than the administrator signed in.
    Denied,
    /// The call failed.
    Refused(SessionError),
}

/// Messages to the session actor.
enum Command {
    /// A login or provision call is about to start.
    Begin { seq: u64 },

    /// A login or provision call finished.
    Settle {
        seq: u64,
        settlement: Settlement,
        reply: oneshot::Sender<SessionState>,
    },

    /// An operation failed before contacting the provider.
    Reject {
        seq: u64,
        error: SessionError,
        reply: oneshot::Sender<SessionState>,
    },

    /// The provider pushed an identity (or `None`).
    External {
        seq: u64,
        identity: Option<Identity>,
        reply: oneshot::Sender<SessionState>,
    },

    /// A logout was issued; results from before it are now stale.
    Supersede { seq: u64 },

    /// The logout's provider call finished; clear the local session.
    Clear {
        seq: u64,
        reply: oneshot::Sender<SessionState>,
    },

    Snapshot {
        reply: oneshot::Sender<SessionState>,
    },

    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Hands out sequence numbers and enqueues under one lock.
struct Sequencer {
    clock: IssueClock,
    commands: mpsc::UnboundedSender<Command>,
}

impl Sequencer {
    /// Takes the next sequence number and enqueues the command built
    /// from it. Returns `None` if the actor has stopped.
    fn issue(&self, command: impl FnOnce(u64) -> Command) -> Option<u64> {
        self.clock
            .issue(|seq| self.commands.send(command(seq)).ok().map(|()| seq))
    }

    /// Enqueues a command that carries no new sequence number.
    fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }
}

/// Handle to the running session actor.
///
/// Cloning is cheap; every clone drives the same session. Operations never
/// return `Err`: failures land in [`SessionState::error`] of the returned
/// snapshot.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use keystone_remote::{MemoryDocumentStore, MemoryIdentityGateway};
/// use keystone_session::{MemoryCache, SessionConfig, SessionStore};
///
/// # async fn example() {
/// let gateway = Arc::new(
///     MemoryIdentityGateway::new().with_account("admin@techinf.com", "secret"),
/// );
/// let documents = Arc::new(MemoryDocumentStore::new());
/// let store = SessionStore::start(SessionConfig::default(), gateway, documents, MemoryCache::new());
///
/// let state = store.login("admin@techinf.com", "secret").await;
/// assert!(state.is_logged_in() && state.is_admin());
/// # }
/// ```
pub struct SessionStore<G, D> {
    gateway: Arc<G>,
    documents: Arc<D>,
    config: Arc<SessionConfig>,
    sequencer: Arc<Sequencer>,
    state: watch::Receiver<SessionState>,
}

impl<G, D> Clone for SessionStore<G, D> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            documents: Arc::clone(&self.documents),
            config: Arc::clone(&self.config),
            sequencer: Arc::clone(&self.sequencer),
            state: self.state.clone(),
        }
    }
}

impl<G: IdentityGateway, D: DocumentStore> SessionStore<G, D> {
    /// Seeds the session from `cache` and spawns the actor.
    ///
    /// Seeding happens before this returns, so [`state`](Self::state)
    /// immediately reflects a restored session. A cached session that
    /// fails the administrator check is wiped and the store starts
    /// anonymous.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn start<C: PersistenceCache>(
        config: SessionConfig,
        gateway: Arc<G>,
        documents: Arc<D>,
        mut cache: C,
    ) -> Self {
        let seeded = seed(&config.admin_email, &mut cache);
        let (published, state) = watch::channel(seeded.clone());
        let (tx, rx) = mpsc::unbounded_channel();

        let actor = SessionActor {
            state: seeded,
            cache,
            admin_email: config.admin_email.clone(),
            error_display: config.error_display,
            error_deadline: None,
            watermark: 0,
            latest_op: 0,
            in_flight: 0,
            published,
            commands: rx,
        };
        tokio::spawn(actor.run());

        let clock = gateway.feed().clock().clone();
        Self {
            gateway,
            documents,
            config: Arc::new(config),
            sequencer: Arc::new(Sequencer {
                clock,
                commands: tx,
            }),
            state,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The latest published snapshot. Does not wait for queued work.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// A snapshot taken after everything queued so far has been applied.
    pub async fn snapshot(&self) -> SessionState {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// A receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// `false` once the actor has shut down.
    pub fn is_running(&self) -> bool {
        !self.sequencer.commands.is_closed()
    }

    /// Signs in as the administrator.
    ///
    /// Blank credentials fail with a validation error without contacting
    /// the provider. A successful sign-in for any other email ends with
    /// [`SessionError::NotAdmin`] and no session.
    pub async fn login(&self, email: &str, password: &str) -> SessionState {
        let (email, password) = match credentials(email, password) {
            Ok(credentials) => credentials,
            Err(error) => return self.reject(error).await,
        };
        let Some(seq) = self.sequencer.issue(|seq| Command::Begin { seq }) else {
            return self.state();
        };
        tracing::info!(%email, seq, "login started");

        let settlement = match self.call(self.gateway.sign_in(&email, password)).await {
            Ok(identity) => self.authorize(identity, None),
            Err(error) => Settlement::Refused(error),
        };
        self.settle(seq, settlement).await
    }

    /// Creates the administrator account, signs it in, and writes its
    /// [`AdminRecord`].
    ///
    /// Any email other than the administrator's is refused before the
    /// provider is contacted. If the account is created but the record
    /// write fails, the session stays authenticated and carries
    /// [`SessionError::RecordWrite`].
    pub async fn provision(&self, email: &str, password: &str) -> SessionState {
        let (email, password) = match credentials(email, password) {
            Ok(credentials) => credentials,
            Err(error) => return self.reject(error).await,
        };
        if email != self.config.admin_email {
            tracing::warn!(%email, "refusing to provision a non-admin account");
            return self.reject(SessionError::NotAdmin).await;
        }
        let Some(seq) = self.sequencer.issue(|seq| Command::Begin { seq }) else {
            return self.state();
        };
        tracing::info!(%email, seq, "provisioning started");

        let settlement = match self.call(self.gateway.sign_up(&email, password)).await {
            Ok(identity) if identity.email == self.config.admin_email => {
                let warning = self.record_admin(&identity).await.err();
                self.authorize(identity, warning)
            }
            Ok(identity) => self.authorize(identity, None),
            Err(error) => Settlement::Refused(error),
        };
        self.settle(seq, settlement).await
    }

    /// Signs out of the provider, then clears the local session whether
    /// or not the provider call succeeded.
    ///
    /// Any login or provision still outstanding when this is called is
    /// superseded: its result will be discarded.
    pub async fn logout(&self) -> SessionState {
        let Some(seq) = self.sequencer.issue(|seq| Command::Supersede { seq }) else {
            return self.state();
        };
        tracing::info!(seq, "logout started");

        if let Err(error) = self.call(self.gateway.sign_out()).await {
            tracing::warn!(%error, "provider sign-out failed, clearing local session anyway");
        }
        self.request(|reply| Command::Clear { seq, reply }).await
    }

    /// Applies an identity pushed by the provider, as if it were issued
    /// now.
    ///
    /// `Some` of the administrator replaces the held identity; `None`, or
    /// any non-admin identity, clears it. Pushing the identity already
    /// held changes nothing.
    pub async fn apply_external_identity(&self, identity: Option<Identity>) -> SessionState {
        self.issue_request(|seq, reply| Command::External { seq, identity, reply })
            .await
    }

    /// Applies a push taken from the provider's feed.
    ///
    /// Same as [`apply_external_identity`](Self::apply_external_identity),
    /// except that the push keeps the stamp it was published under. A push
    /// published before a logout or login was issued is discarded, however
    /// late it arrives.
    pub async fn apply_push(&self, push: Push) -> SessionState {
        let Push { stamp, identity } = push;
        self.request(|reply| Command::External {
            seq: stamp,
            identity,
            reply,
        })
        .await
    }

    /// Stops the actor and waits for it to exit. Later operations return
    /// the last published snapshot unchanged.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.sequencer.send(Command::Shutdown { reply }) {
            let _ = rx.await;
        }
    }

    // -- internals --

    async fn call<T>(
        &self,
        operation: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, SessionError> {
        match timeout(self.config.gateway_timeout, operation).await {
            Ok(result) => result.map_err(SessionError::from),
            Err(_) => Err(SessionError::Network(format!(
                "no response within {:?}",
                self.config.gateway_timeout
            ))),
        }
    }

    fn authorize(&self, identity: Identity, warning: Option<SessionError>) -> Settlement {
        if identity.email == self.config.admin_email {
            Settlement::Granted { identity, warning }
        } else {
            tracing::warn!(uid = %identity.uid, "provider signed in a non-admin identity");
            Settlement::Denied
        }
    }

    async fn record_admin(&self, identity: &Identity) -> Result<(), SessionError> {
        let document = AdminRecord::new(identity.email.clone())
            .to_document()
            .map_err(|e| SessionError::RecordWrite(e.to_string()))?;
        let path = AdminRecord::path(&identity.uid);

        self.call(self.documents.set(&path, document, &identity.token))
            .await
            .map_err(|error| {
                tracing::error!(
                    uid = %identity.uid,
                    %error,
                    "admin account created but its record was not written"
                );
                SessionError::RecordWrite(error.to_string())
            })
    }

    async fn settle(&self, seq: u64, settlement: Settlement) -> SessionState {
        self.request(|reply| Command::Settle {
            seq,
            settlement,
            reply,
        })
        .await
    }

    async fn reject(&self, error: SessionError) -> SessionState {
        tracing::debug!(%error, "rejected before contacting the provider");
        self.issue_request(|seq, reply| Command::Reject { seq, error, reply })
            .await
    }

    /// Like [`request`](Self::request), but the command takes a fresh
    /// sequence number.
    async fn issue_request(
        &self,
        command: impl FnOnce(u64, oneshot::Sender<SessionState>) -> Command,
    ) -> SessionState {
        let (reply, rx) = oneshot::channel();
        if self.sequencer.issue(|seq| command(seq, reply)).is_none() {
            return self.state();
        }
        rx.await.unwrap_or_else(|_| self.state())
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<SessionState>) -> Command,
    ) -> SessionState {
        let (reply, rx) = oneshot::channel();
        if !self.sequencer.send(command(reply)) {
            return self.state();
        }
        rx.await.unwrap_or_else(|_| self.state())
    }
}

/// Trims both fields and requires them non-empty.
fn credentials<'a>(email: &str, password: &'a str) -> Result<(Email, &'a str), SessionError> {
    let email = email.trim();
    let password = password.trim();
    if email.is_empty() || password.is_empty() {
        return Err(SessionError::Validation(CREDENTIALS_REQUIRED.to_string()));
    }
    Ok((Email::new(email), password))
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

fn read_cached<C: PersistenceCache>(cache: &C) -> Result<[Option<String>; 4], CacheError> {
    Ok([
        cache.get(CacheKey::Uid)?,
        cache.get(CacheKey::Email)?,
        cache.get(CacheKey::Token)?,
        cache.get(CacheKey::IsAdmin)?,
    ])
}

fn erase<C: PersistenceCache>(cache: &mut C) -> Result<(), CacheError> {
    for key in CacheKey::ALL {
        cache.remove(key)?;
    }
    Ok(())
}

fn write_identity<C: PersistenceCache>(cache: &mut C, identity: &Identity) -> Result<(), CacheError> {
    cache.set(CacheKey::Uid, identity.uid.as_str())?;
    cache.set(CacheKey::Email, identity.email.as_str())?;
    cache.set(CacheKey::Token, identity.token.expose())?;
    cache.set(CacheKey::IsAdmin, "true")?;
    Ok(())
}

/// Builds the starting state from whatever the last run left in `cache`.
fn seed<C: PersistenceCache>(admin_email: &Email, cache: &mut C) -> SessionState {
    let entries = match read_cached(cache) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::error!(%error, "session cache unreadable, starting anonymous");
            return SessionState::default();
        }
    };

    match entries {
        [None, None, None, None] => SessionState::default(),
        [Some(uid), Some(email), Some(token), Some(flag)]
            if flag == "true" && email == admin_email.as_str() =>
        {
            tracing::info!(%uid, "restored administrator session");
            SessionState::authenticated(Identity::new(uid, email, token))
        }
        _ => {
            tracing::warn!("cached session is not the administrator's, discarding it");
            if let Err(error) = erase(cache) {
                tracing::error!(%error, "failed to erase session cache");
            }
            SessionState::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct SessionActor<C> {
    state: SessionState,
    cache: C,
    admin_email: Email,
    error_display: Duration,
    /// When the current error clears itself.
    error_deadline: Option<Instant>,
    /// Sequence number of the last identity change or explicit operation.
    watermark: u64,
    /// Sequence number of the last explicit operation.
    latest_op: u64,
    /// Login/provision calls begun but not yet settled.
    in_flight: usize,
    published: watch::Sender<SessionState>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl<C: PersistenceCache> SessionActor<C> {
    async fn run(mut self) {
        tracing::debug!(logged_in = self.state.is_logged_in(), "session actor started");

        loop {
            let deadline = self.error_deadline;
            tokio::select! {
                // The timer goes first so an expired error is gone before
                // any command queued behind it observes the state.
                biased;

                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    tracing::debug!("session error expired");
                    self.clear_error();
                }
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    if self.handle(command).is_break() {
                        break;
                    }
                }
            }
            self.publish();
        }

        tracing::debug!("session actor stopped");
    }

    fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Begin { seq } => self.begin(seq),
            Command::Settle {
                seq,
                settlement,
                reply,
            } => {
                self.settle(seq, settlement);
                self.reply(reply);
            }
            Command::Reject { seq, error, reply } => {
                // Counts as the latest operation for errors only: an
                // outstanding login may still set the identity.
                self.latest_op = self.latest_op.max(seq);
                self.show_error(error);
                self.reply(reply);
            }
            Command::External {
                seq,
                identity,
                reply,
            } => {
                self.apply_external(seq, identity);
                self.reply(reply);
            }
            Command::Supersede { seq } => self.mark_op(seq),
            Command::Clear { seq, reply } => {
                self.clear(seq);
                self.reply(reply);
            }
            Command::Snapshot { reply } => self.reply(reply),
            Command::Shutdown { reply } => {
                self.commands.close();
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn begin(&mut self, seq: u64) {
        self.in_flight += 1;
        self.state.is_loading = true;
        self.clear_error();
        self.mark_op(seq);
    }

    fn settle(&mut self, seq: u64, settlement: Settlement) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.state.is_loading = self.in_flight > 0;

        let fresh = seq >= self.watermark;
        let current = seq >= self.latest_op;
        if !fresh {
            tracing::debug!(seq, watermark = self.watermark, "result superseded, identity left alone");
        } else {
            self.watermark = seq;
        }

        match settlement {
            Settlement::Granted { identity, warning } => {
                if fresh {
                    tracing::info!(uid = %identity.uid, "administrator signed in");
                    self.set_identity(identity);
                }
                if current {
                    match warning {
                        Some(warning) => self.show_error(warning),
                        None => self.clear_error(),
                    }
                }
            }
            Settlement::Denied => {
                if fresh && self.state.is_logged_in() {
                    self.state.clear_identity();
                    self.persist();
                }
                if current {
                    self.show_error(SessionError::NotAdmin);
                }
            }
            Settlement::Refused(error) => {
                tracing::info!(%error, seq, "sign-in failed");
                if current {
                    self.show_error(error);
                }
            }
        }
    }

    fn apply_external(&mut self, seq: u64, identity: Option<Identity>) {
        if seq < self.watermark {
            tracing::debug!(seq, watermark = self.watermark, "stale identity push discarded");
            return;
        }

        let identity = identity.filter(|identity| {
            let admin = identity.email == self.admin_email;
            if !admin {
                tracing::warn!(uid = %identity.uid, "pushed identity is not the administrator, treating as signed out");
            }
            admin
        });

        if self.state.holds(identity.as_ref()) {
            return;
        }
        self.watermark = seq;

        match identity {
            Some(identity) => {
                tracing::info!(uid = %identity.uid, "provider updated the session identity");
                self.set_identity(identity);
            }
            None => {
                tracing::info!("provider signed the session out");
                self.state.clear_identity();
                self.clear_error();
                self.persist();
            }
        }
    }

    fn clear(&mut self, seq: u64) {
        self.mark_op(seq);
        self.state.clear_identity();
        self.clear_error();
        if let Err(error) = erase(&mut self.cache) {
            tracing::error!(%error, "failed to erase session cache");
        }
        tracing::info!("signed out");
    }

    fn mark_op(&mut self, seq: u64) {
        self.watermark = self.watermark.max(seq);
        self.latest_op = self.latest_op.max(seq);
    }

    fn set_identity(&mut self, identity: Identity) {
        let loading = self.state.is_loading;
        let error = self.state.error.take();
        self.state = SessionState::authenticated(identity);
        self.state.is_loading = loading;
        self.state.error = error;
        self.persist();
    }

    /// Writes the held identity through to the cache, or erases it.
    /// A cache failure is logged; the in-memory state stands.
    fn persist(&mut self) {
        let result = match self.state.identity() {
            Some(identity) => write_identity(&mut self.cache, &identity),
            None => erase(&mut self.cache),
        };
        if let Err(error) = result {
            tracing::error!(%error, "failed to persist session");
        }
    }

    fn show_error(&mut self, error: SessionError) {
        self.state.error = Some(error);
        self.error_deadline = Some(Instant::now() + self.error_display);
    }

    fn clear_error(&mut self) {
        self.state.error = None;
        self.error_deadline = None;
    }

    fn reply(&mut self, reply: oneshot::Sender<SessionState>) {
        self.publish();
        let _ = reply.send(self.state.clone());
    }

    fn publish(&self) {
        let state = &self.state;
        self.published.send_if_modified(|published| {
            if *published == *state {
                false
            } else {
                *published = state.clone();
                true
            }
        });
    }
}
