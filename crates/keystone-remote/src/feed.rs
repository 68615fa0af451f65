//! Identity push feed shared by gateway implementations.
//!
//! A hosted identity provider tells its clients about sign-in state
//! changes out of band: after a sign-in, after a sign-out, when a token is
//! refreshed, or when another tab signs out. [`IdentityFeed`] models that
//! channel. Gateways publish into it; subscribers receive the current
//! identity immediately and every change after that.
//!
//! Every push is stamped from the feed's [`IssueClock`] at the moment it
//! is published. Consumers that number their own operations from the same
//! clock can tell whether a push was issued before or after any of them,
//! however late the push is delivered.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use keystone_protocol::Identity;
use tokio::sync::broadcast;

/// Buffered pushes per subscriber before it starts lagging.
const FEED_CAPACITY: usize = 32;

/// Monotonic issue counter shared by a feed and whoever orders work
/// against it.
///
/// Cheap to clone; clones share the counter. Stamp `0` is never issued: it
/// marks what was current before anything was published.
#[derive(Clone, Default)]
pub struct IssueClock {
    last: Arc<Mutex<u64>>,
}

impl IssueClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the next number and runs `f` with it while the clock is still
    /// held, so nothing else is numbered until `f` returns.
    pub fn issue<T>(&self, f: impl FnOnce(u64) -> T) -> T {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        *last += 1;
        f(*last)
    }

    /// The most recently issued number.
    pub fn last(&self) -> u64 {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One identity push and the stamp it was published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Push {
    pub stamp: u64,
    pub identity: Option<Identity>,
}

struct FeedInner {
    /// `None` until the provider knows whether anyone is signed in.
    current: Mutex<Option<Push>>,
    sender: broadcast::Sender<Push>,
    clock: IssueClock,
}

impl FeedInner {
    fn current(&self) -> MutexGuard<'_, Option<Push>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The publishing side of the identity push channel.
///
/// Cheap to clone; all clones publish to the same subscribers.
#[derive(Clone)]
pub struct IdentityFeed {
    inner: Arc<FeedInner>,
}

impl IdentityFeed {
    /// Creates a feed with no identity signed in.
    pub fn new() -> Self {
        Self::with_current(Some(Push {
            stamp: 0,
            identity: None,
        }))
    }

    /// Creates a feed that has nothing to report until the first
    /// [`publish`](Self::publish).
    ///
    /// Subscriptions opened before then get no initial value. Providers
    /// that can't tell whether a session from an earlier run is still
    /// valid use this, so a restored session isn't cleared on startup.
    pub fn pending() -> Self {
        Self::with_current(None)
    }

    fn with_current(current: Option<Push>) -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            inner: Arc::new(FeedInner {
                current: Mutex::new(current),
                sender,
                clock: IssueClock::new(),
            }),
        }
    }

    /// The clock pushes are stamped from.
    pub fn clock(&self) -> &IssueClock {
        &self.inner.clock
    }

    /// Records `identity` as current and pushes it to every subscriber.
    ///
    /// Returns the stamp the push was issued under.
    pub fn publish(&self, identity: Option<Identity>) -> u64 {
        self.inner.clock.issue(|stamp| {
            let push = Push { stamp, identity };
            *self.inner.current() = Some(push.clone());
            // No subscribers is fine: the value is still kept as current.
            let _ = self.inner.sender.send(push);
            stamp
        })
    }

    /// Returns the identity most recently published.
    pub fn current(&self) -> Option<Identity> {
        self.inner
            .current()
            .as_ref()
            .and_then(|push| push.identity.clone())
    }

    /// Opens a new subscription.
    ///
    /// The receiver is registered under the same lock that guards the
    /// current value, so nothing published concurrently can slip between
    /// the initial value and the live stream.
    pub fn subscribe(&self) -> IdentitySubscription {
        let current = self.inner.current();
        let receiver = self.inner.sender.subscribe();
        IdentitySubscription {
            initial: current.clone(),
            receiver,
            feed: Arc::clone(&self.inner),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }
}

impl Default for IdentityFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// The receiving side of the identity push channel.
///
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe))
/// releases it.
pub struct IdentitySubscription {
    initial: Option<Push>,
    receiver: broadcast::Receiver<Push>,
    feed: Arc<FeedInner>,
}

impl IdentitySubscription {
    /// Waits for the next push and returns its identity.
    ///
    /// See [`next_push`](Self::next_push).
    pub async fn next(&mut self) -> Option<Option<Identity>> {
        self.next_push().await.map(|push| push.identity)
    }

    /// Waits for the next push.
    ///
    /// The first call returns the push that was current when the
    /// subscription opened, unless the feed was still
    /// [`pending`](IdentityFeed::pending). Returns `None` once the feed is
    /// gone.
    ///
    /// A subscriber that falls behind skips straight to the current push
    /// instead of replaying the ones it missed.
    pub async fn next_push(&mut self) -> Option<Push> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        match self.receiver.recv().await {
            Ok(push) => Some(push),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "identity subscriber lagged, resyncing to current");
                self.receiver = self.receiver.resubscribe();
                self.feed.current().clone()
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Releases the subscription.
    pub fn unsubscribe(self) {}
}
