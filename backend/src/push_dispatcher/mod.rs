//! Push dispatch: fan a message out to every subscription of the target users
//!
//! A dispatch looks the subscriptions up once, delivers to all of them
//! concurrently, and deletes every subscription the push service reported as
//! gone. Individual delivery failures only show up in the report; the dispatch
//! as a whole fails only when it cannot start (no signing key, store offline).

use std::sync::Arc;

use common_types::store::{DynSubscriptionStore, StorageError};
use common_types::PushPayload;
use futures::future::join_all;
use metrics::counter;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn, Instrument};

use crate::web_push::{DeliveryOutcome, PushSender};

/// Errors that stop a dispatch before any delivery
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No push signing key pair is configured
    #[error("Push signing keys are not configured")]
    NotConfigured,

    /// Subscriptions could not be read
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What happened during one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Subscriptions a delivery was attempted for
    pub attempted: usize,
    /// Deliveries accepted by the push service
    pub sent: usize,
    /// Deliveries that failed for a reason other than a gone subscription
    pub failed: usize,
    /// Gone subscriptions deleted from the store
    pub removed: usize,
}

/// Sends push messages to users through their stored subscriptions
pub struct PushDispatcher {
    store: DynSubscriptionStore,
    sender: Option<Arc<dyn PushSender>>,
}

impl PushDispatcher {
    /// Creates a dispatcher; without a sender every dispatch fails with
    /// [`DispatchError::NotConfigured`]
    #[must_use]
    pub fn new(store: DynSubscriptionStore, sender: Option<Arc<dyn PushSender>>) -> Self {
        Self { store, sender }
    }

    /// Whether a signing key pair is configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.sender.is_some()
    }

    /// Key clients subscribe with, if push is configured
    #[must_use]
    pub fn application_server_key(&self) -> Option<&str> {
        self.sender
            .as_deref()
            .and_then(PushSender::application_server_key)
    }

    /// Delivers `payload` to every subscription of `user_ids`
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::NotConfigured` before touching the store when no
    /// sender is configured, or `DispatchError::Storage` if the lookup fails
    #[instrument(skip(self, payload), fields(targets = user_ids.len()))]
    pub async fn dispatch(
        &self,
        user_ids: &[String],
        payload: &PushPayload,
    ) -> Result<DispatchReport, DispatchError> {
        let sender = self.sender.as_ref().ok_or(DispatchError::NotConfigured)?;

        if user_ids.is_empty() {
            return Ok(DispatchReport::default());
        }

        let subscriptions = self.store.find_by_users(user_ids).await?;
        if subscriptions.is_empty() {
            info!("No subscriptions found for target users");
            return Ok(DispatchReport::default());
        }

        let body = payload.to_json();
        let outcomes = join_all(
            subscriptions
                .iter()
                .map(|subscription| sender.send(subscription, &body)),
        )
        .await;

        let mut report = DispatchReport {
            attempted: subscriptions.len(),
            ..DispatchReport::default()
        };
        let mut gone = Vec::new();

        for (subscription, outcome) in subscriptions.iter().zip(outcomes) {
            match outcome {
                DeliveryOutcome::Delivered => {
                    report.sent += 1;
                    counter!("push_delivered").increment(1);
                }
                DeliveryOutcome::Gone => {
                    counter!("push_subscription_gone").increment(1);
                    gone.push(subscription.endpoint.as_str());
                }
                DeliveryOutcome::Failed(reason) => {
                    report.failed += 1;
                    counter!("push_failed").increment(1);
                    warn!(user_id = %subscription.user_id, reason = %reason, "Push delivery failed");
                }
            }
        }

        for endpoint in gone {
            match self.store.remove_endpoint(endpoint).await {
                Ok(()) => report.removed += 1,
                Err(e) => error!(endpoint, error = ?e, "Failed to remove gone subscription"),
            }
        }

        info!(
            attempted = report.attempted,
            sent = report.sent,
            failed = report.failed,
            removed = report.removed,
            "Push dispatch finished"
        );

        Ok(report)
    }
}

/// Fire-and-forget front of the dispatcher for feature code
///
/// A notification is sent at most once and nobody waits for it: the dispatch
/// runs on its own task and its outcome is only logged.
#[derive(Clone)]
pub struct PushNotifier {
    dispatcher: Arc<PushDispatcher>,
}

impl PushNotifier {
    /// Notifier dispatching through `dispatcher`
    #[must_use]
    pub const fn new(dispatcher: Arc<PushDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Starts a dispatch in the background and returns immediately
    pub fn notify_detached(&self, user_ids: Vec<String>, payload: PushPayload) -> JoinHandle<()> {
        let dispatcher = self.dispatcher.clone();

        tokio::spawn(
            async move {
                match dispatcher.dispatch(&user_ids, &payload).await {
                    Ok(report) => info!(sent = report.sent, "Background push finished"),
                    Err(e) => warn!(error = %e, "Background push failed"),
                }
            }
            .in_current_span(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use backend_storage::memory::InMemorySubscriptionStore;
    use common_types::PushSubscription;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Answers `Gone` for endpoints ending in `/gone`, `Failed` for `/down`
    #[derive(Default)]
    struct ScriptedSender {
        endpoints: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PushSender for ScriptedSender {
        async fn send(&self, subscription: &PushSubscription, _payload: &[u8]) -> DeliveryOutcome {
            self.endpoints
                .lock()
                .unwrap()
                .push(subscription.endpoint.clone());

            if subscription.endpoint.ends_with("/gone") {
                DeliveryOutcome::Gone
            } else if subscription.endpoint.ends_with("/down") {
                DeliveryOutcome::Failed("push service responded with 500".to_string())
            } else {
                DeliveryOutcome::Delivered
            }
        }
    }

    fn subscription(user_id: &str, endpoint: &str) -> PushSubscription {
        PushSubscription {
            user_id: user_id.to_string(),
            endpoint: endpoint.to_string(),
            p256dh: "key".to_string(),
            auth: "auth".to_string(),
        }
    }

    fn payload() -> PushPayload {
        PushPayload::new("Hi", "there", None)
    }

    #[tokio::test]
    async fn test_dispatch_report() {
        let store = Arc::new(InMemorySubscriptionStore::with_subscriptions([
            subscription("u1", "https://push.example.com/a"),
            subscription("u1", "https://push.example.com/gone"),
            subscription("u2", "https://push.example.com/down"),
            subscription("u3", "https://push.example.com/b"),
        ]));
        let sender = Arc::new(ScriptedSender::default());
        let dispatcher = PushDispatcher::new(store.clone(), Some(sender.clone() as Arc<dyn PushSender>));

        let report = dispatcher
            .dispatch(&["u1".to_string(), "u2".to_string()], &payload())
            .await
            .unwrap();

        assert_eq!(
            report,
            DispatchReport {
                attempted: 3,
                sent: 1,
                failed: 1,
                removed: 1,
            }
        );
        assert_eq!(sender.endpoints.lock().unwrap().len(), 3);

        let remaining: Vec<String> = store.all().await.into_iter().map(|s| s.endpoint).collect();
        assert_eq!(
            remaining,
            vec![
                "https://push.example.com/a",
                "https://push.example.com/b",
                "https://push.example.com/down",
            ]
        );
    }

    #[tokio::test]
    async fn test_not_configured_fails_before_lookup() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.set_unavailable(true);
        let dispatcher = PushDispatcher::new(store, None);

        assert!(!dispatcher.is_configured());
        assert!(matches!(
            dispatcher.dispatch(&["u1".to_string()], &payload()).await,
            Err(DispatchError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_empty_targets_skip_lookup() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.set_unavailable(true);
        let sender: Arc<dyn PushSender> = Arc::new(ScriptedSender::default());
        let dispatcher = PushDispatcher::new(store, Some(sender));

        let report = dispatcher.dispatch(&[], &payload()).await.unwrap();

        assert_eq!(report, DispatchReport::default());
    }

    #[tokio::test]
    async fn test_notifier_runs_in_background() {
        let store = Arc::new(InMemorySubscriptionStore::with_subscriptions([subscription(
            "u1",
            "https://push.example.com/a",
        )]));
        let sender = Arc::new(ScriptedSender::default());
        let notifier = PushNotifier::new(Arc::new(PushDispatcher::new(
            store,
            Some(sender.clone() as Arc<dyn PushSender>),
        )));

        notifier
            .notify_detached(vec!["u1".to_string()], payload())
            .await
            .unwrap();

        assert_eq!(
            *sender.endpoints.lock().unwrap(),
            vec!["https://push.example.com/a".to_string()]
        );
    }
}
