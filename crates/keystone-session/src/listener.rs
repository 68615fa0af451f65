//! Bridges the provider's identity pushes into the session store.

use keystone_remote::{DocumentStore, IdentityGateway};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::SessionStore;

/// A running subscription to the provider's identity feed.
///
/// Every push is forwarded to [`SessionStore::apply_push`] with the stamp
/// it was published under. The subscription is
/// released when the listener is stopped, when it is dropped, or when the
/// feed closes, whichever happens first.
pub struct SessionListener {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SessionListener {
    /// Subscribes to `store`'s gateway and starts forwarding pushes.
    ///
    /// The subscription is opened before this returns, so nothing the
    /// provider publishes afterwards is missed. The first push is the
    /// provider's current identity.
    pub fn start<G: IdentityGateway, D: DocumentStore>(store: SessionStore<G, D>) -> Self {
        let mut subscription = store.gateway().subscribe();
        let (stop, mut stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            tracing::debug!("session listener started");
            loop {
                tokio::select! {
                    // Fires on an explicit stop and when the listener is dropped.
                    _ = &mut stopped => break,
                    push = subscription.next_push() => match push {
                        Some(push) => {
                            store.apply_push(push).await;
                        }
                        None => {
                            tracing::debug!("identity feed closed");
                            break;
                        }
                    },
                }
            }
            subscription.unsubscribe();
            tracing::debug!("session listener stopped");
        });

        Self { stop, task }
    }

    /// `true` once the forwarding task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Releases the subscription and waits for the forwarding task to exit.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(error) = self.task.await {
            tracing::error!(%error, "session listener task failed");
        }
    }
}
