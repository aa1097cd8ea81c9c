//! Push subscription lifecycle
//!
//! ```text
//! unsupported            (terminal)
//! denied                 (terminal until browser settings change)
//! default  --subscribe-->  subscribed
//! subscribed --unsubscribe--> default
//! ```
//!
//! A subscribe asks for permission when it is undecided, registers the
//! background worker and waits for it to activate, drops any stale subscription
//! the registration still holds, subscribes with the server key and stores the
//! result for the user. Each manager runs at most one subscribe at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common_types::store::SubscriptionRegistry;
use common_types::PushSubscription;
use tracing::{info, instrument, warn};

use crate::error::SubscribeError;
use crate::platform::{BrowserSubscription, Permission, PushPlatform, WorkerRegistration, WorkerState};

/// Where a user stands with push notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// The browser cannot receive push messages
    Unsupported,
    /// The user blocked notifications
    Denied,
    /// Push is possible but no subscription is held
    Default,
    /// An active subscription is held
    Subscribed,
}

/// Manager settings
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Server public key browsers bind subscriptions to, base64url
    pub application_server_key: String,
    /// Longest wait for the worker to become active
    pub activation_timeout: Duration,
    /// Longest wait for the push service to hand out a subscription
    pub subscribe_timeout: Duration,
    /// Pause after releasing a stale subscription
    pub stale_release_pause: Duration,
}

impl ManagerConfig {
    /// Settings with the default timeouts: 10s for activation, 15s for the push
    /// service and a 1s pause after releasing a stale subscription
    #[must_use]
    pub fn new(application_server_key: impl Into<String>) -> Self {
        Self {
            application_server_key: application_server_key.into(),
            activation_timeout: Duration::from_secs(10),
            subscribe_timeout: Duration::from_secs(15),
            stale_release_pause: Duration::from_secs(1),
        }
    }
}

/// Clears the in-flight flag when a subscribe ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Subscribes and unsubscribes one browser installation
pub struct PushSubscriptionManager<P> {
    platform: P,
    registry: Arc<dyn SubscriptionRegistry>,
    config: ManagerConfig,
    in_flight: AtomicBool,
}

impl<P: PushPlatform> PushSubscriptionManager<P> {
    /// Manager storing subscriptions in `registry`
    #[must_use]
    pub fn new(platform: P, registry: Arc<dyn SubscriptionRegistry>, config: ManagerConfig) -> Self {
        Self {
            platform,
            registry,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Platform the manager drives
    pub const fn platform(&self) -> &P {
        &self.platform
    }

    /// Current state derived from the platform
    pub async fn status(&self) -> SubscriptionStatus {
        if !self.platform.is_supported() {
            return SubscriptionStatus::Unsupported;
        }
        if self.platform.permission() == Permission::Denied {
            return SubscriptionStatus::Denied;
        }

        let Some(registration) = self.platform.registration().await else {
            return SubscriptionStatus::Default;
        };
        match self.platform.current_subscription(&registration).await {
            Ok(Some(_)) => SubscriptionStatus::Subscribed,
            Ok(None) => SubscriptionStatus::Default,
            Err(e) => {
                warn!(error = %e, "Failed to read current push subscription");
                SubscriptionStatus::Default
            }
        }
    }

    /// Subscribes this browser and stores the subscription for `user_id`
    ///
    /// # Errors
    ///
    /// Returns `SubscribeError::AlreadyInProgress` immediately while another
    /// subscribe runs; every other variant describes the step that failed.
    #[instrument(skip(self))]
    pub async fn subscribe(&self, user_id: &str) -> Result<PushSubscription, SubscribeError> {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            return Err(SubscribeError::AlreadyInProgress);
        };

        if !self.platform.is_supported() {
            return Err(SubscribeError::Unsupported);
        }
        self.ensure_permission().await?;

        let registration = self
            .platform
            .register_worker()
            .await
            .map_err(|e| SubscribeError::WorkerRegistrationFailed(e.to_string()))?;
        self.wait_until_active(registration.clone()).await?;

        if let Some(stale) = self.platform.current_subscription(&registration).await? {
            self.release_stale(user_id, &registration, &stale).await?;
        }

        let browser_subscription = tokio::time::timeout(
            self.config.subscribe_timeout,
            self.platform
                .subscribe(&registration, &self.config.application_server_key),
        )
        .await
        .map_err(|_| SubscribeError::PushServiceTimeout)??;

        let subscription = PushSubscription {
            user_id: user_id.to_string(),
            endpoint: browser_subscription.endpoint.clone(),
            p256dh: browser_subscription.p256dh.clone(),
            auth: browser_subscription.auth.clone(),
        };
        if let Err(e) = self.registry.save(&subscription).await {
            // An unsaved browser subscription would still report as subscribed
            if let Err(release) = self
                .platform
                .unsubscribe(&registration, &browser_subscription)
                .await
            {
                warn!(error = %release, "Failed to release unsaved push subscription");
            }
            return Err(e.into());
        }

        info!(endpoint = %subscription.endpoint, "Push subscription stored");
        Ok(subscription)
    }

    /// Unsubscribes this browser and deletes its row for `user_id`.
    /// Succeeds without doing anything when there is nothing to release.
    ///
    /// # Errors
    ///
    /// Returns the platform or storage failure that stopped the release
    #[instrument(skip(self))]
    pub async fn unsubscribe(&self, user_id: &str) -> Result<(), SubscribeError> {
        let Some(registration) = self.platform.registration().await else {
            return Ok(());
        };
        let Some(subscription) = self.platform.current_subscription(&registration).await? else {
            return Ok(());
        };

        self.platform.unsubscribe(&registration, &subscription).await?;
        self.registry.remove(user_id, &subscription.endpoint).await?;

        info!(endpoint = %subscription.endpoint, "Push subscription removed");
        Ok(())
    }

    async fn ensure_permission(&self) -> Result<(), SubscribeError> {
        let permission = match self.platform.permission() {
            Permission::Default => self.platform.request_permission().await,
            decided => decided,
        };

        match permission {
            Permission::Granted => Ok(()),
            Permission::Denied => Err(SubscribeError::PermissionDenied),
            Permission::Default => Err(SubscribeError::PermissionDismissed),
        }
    }

    async fn wait_until_active(&self, registration: WorkerRegistration) -> Result<(), SubscribeError> {
        let mut state = registration.state;

        let activated = tokio::time::timeout(
            self.config.activation_timeout,
            state.wait_for(|s| matches!(s, WorkerState::Activated | WorkerState::Redundant)),
        )
        .await
        .map_err(|_| {
            SubscribeError::WorkerRegistrationFailed("worker did not activate in time".into())
        })?
        .map(|s| *s == WorkerState::Activated)
        .map_err(|_| SubscribeError::WorkerRegistrationFailed("worker went away".into()))?;

        if activated {
            Ok(())
        } else {
            Err(SubscribeError::WorkerRegistrationFailed(
                "worker became redundant".into(),
            ))
        }
    }

    async fn release_stale(
        &self,
        user_id: &str,
        registration: &WorkerRegistration,
        stale: &BrowserSubscription,
    ) -> Result<(), SubscribeError> {
        info!(endpoint = %stale.endpoint, "Releasing stale push subscription");
        self.platform.unsubscribe(registration, stale).await?;

        if let Err(e) = self.registry.remove(user_id, &stale.endpoint).await {
            warn!(error = %e, "Failed to remove stale subscription row");
        }

        tokio::time::sleep(self.config.stale_release_pause).await;
        Ok(())
    }
}
