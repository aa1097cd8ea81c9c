//! Services shared across handlers

use std::sync::Arc;

use axum::{Extension, Router};
use common_types::store::{DynNotificationStore, DynProfileDirectory, DynSubscriptionStore};

use crate::account::{AccountDeleter, AccountService};
use crate::push_dispatcher::{PushDispatcher, PushNotifier};
use crate::web_push::PushSender;

/// Everything the handlers need, injected into the router as extensions
#[derive(Clone)]
pub struct Services {
    /// Browser push subscriptions
    pub subscriptions: DynSubscriptionStore,
    /// Activity notifications
    pub notifications: DynNotificationStore,
    /// Profile and card lookups
    pub directory: DynProfileDirectory,
    /// Push fan-out
    pub dispatcher: Arc<PushDispatcher>,
    /// Account deletion cascade
    pub accounts: Arc<AccountService>,
}

impl Services {
    /// Wires the services together.
    ///
    /// Without a push sender every push request fails as not configured, and
    /// without an account deleter every account deletion does.
    #[must_use]
    pub fn new(
        subscriptions: DynSubscriptionStore,
        notifications: DynNotificationStore,
        directory: DynProfileDirectory,
        sender: Option<Arc<dyn PushSender>>,
        deleter: Option<Arc<dyn AccountDeleter>>,
    ) -> Self {
        let dispatcher = Arc::new(PushDispatcher::new(subscriptions.clone(), sender));
        let accounts = Arc::new(AccountService::new(
            subscriptions.clone(),
            notifications.clone(),
            deleter,
        ));

        Self {
            subscriptions,
            notifications,
            directory,
            dispatcher,
            accounts,
        }
    }

    /// Fire-and-forget push front used by feature handlers
    #[must_use]
    pub fn notifier(&self) -> PushNotifier {
        PushNotifier::new(self.dispatcher.clone())
    }

    /// Adds every service to `router` as an extension layer
    #[must_use]
    pub fn layer(self, router: Router) -> Router {
        let notifier = self.notifier();

        router
            .layer(Extension(self.subscriptions))
            .layer(Extension(self.notifications))
            .layer(Extension(self.directory))
            .layer(Extension(self.dispatcher))
            .layer(Extension(notifier))
            .layer(Extension(self.accounts))
    }
}
