//! Account deletion
//!
//! Deleting an account first deletes the user at the auth provider through its
//! admin API using the service-role key. Only once the provider has accepted the
//! deletion are the user's push subscriptions and received notifications removed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common_types::store::{DynNotificationStore, DynSubscriptionStore, StorageError};
use reqwest::Client;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

/// Errors raised while deleting an account
#[derive(Error, Debug)]
pub enum AccountError {
    /// Auth admin URL or service-role key is missing
    #[error("Auth admin credentials are not configured")]
    NotConfigured,

    /// User data could not be removed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The auth provider refused the deletion
    #[error("Auth provider rejected account deletion with status {status}")]
    Rejected {
        /// Status returned by the auth provider
        status: u16,
    },

    /// The auth provider could not be reached
    #[error("Auth provider request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for AccountError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Auth admin API location and credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthAdminConfig {
    /// Base URL of the auth admin API
    pub base_url: String,
    /// Service-role key sent as bearer token
    pub service_role_key: String,
}

/// Deletes a user at the auth provider
#[async_trait]
pub trait AccountDeleter: Send + Sync {
    /// Deletes `user_id`
    async fn delete_user(&self, user_id: &str) -> Result<(), AccountError>;
}

/// Auth admin API client
pub struct AuthAdminClient {
    http_client: Client,
    config: AuthAdminConfig,
}

impl AuthAdminClient {
    /// Creates a client for the admin API described by `config`
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Transport` if the HTTP client cannot be built
    pub fn new(config: AuthAdminConfig, timeout: Duration) -> Result<Self, AccountError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    fn user_url(&self, user_id: &str) -> Result<Url, AccountError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| AccountError::Transport(format!("invalid auth admin URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| AccountError::Transport("auth admin URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["admin", "users", user_id]);
        Ok(url)
    }
}

#[async_trait]
impl AccountDeleter for AuthAdminClient {
    async fn delete_user(&self, user_id: &str) -> Result<(), AccountError> {
        let response = self
            .http_client
            .delete(self.user_url(user_id)?)
            .bearer_auth(&self.config.service_role_key)
            .header("apikey", &self.config.service_role_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AccountError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

/// Rows removed alongside an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountDeletion {
    /// Push subscriptions removed
    pub subscriptions_removed: usize,
    /// Notifications removed
    pub notifications_removed: usize,
}

/// Deletes accounts together with the data that references them
pub struct AccountService {
    subscriptions: DynSubscriptionStore,
    notifications: DynNotificationStore,
    deleter: Option<Arc<dyn AccountDeleter>>,
}

impl AccountService {
    /// Creates the service; without a deleter every deletion fails with
    /// [`AccountError::NotConfigured`]
    #[must_use]
    pub fn new(
        subscriptions: DynSubscriptionStore,
        notifications: DynNotificationStore,
        deleter: Option<Arc<dyn AccountDeleter>>,
    ) -> Self {
        Self {
            subscriptions,
            notifications,
            deleter,
        }
    }

    /// Deletes `user_id` and everything stored for it
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotConfigured` before any I/O when credentials are
    /// missing, and `AccountError::Rejected` / `AccountError::Transport` if the auth
    /// provider fails, in which case no user data is touched. Returns
    /// `AccountError::Storage` if user data cannot be removed afterwards.
    #[instrument(skip(self))]
    pub async fn delete_account(&self, user_id: &str) -> Result<AccountDeletion, AccountError> {
        let deleter = self.deleter.as_ref().ok_or(AccountError::NotConfigured)?;

        deleter.delete_user(user_id).await?;

        let deletion = AccountDeletion {
            subscriptions_removed: self.subscriptions.remove_all_for_user(user_id).await?,
            notifications_removed: self.notifications.delete_all(user_id).await?,
        };

        info!(
            subscriptions_removed = deletion.subscriptions_removed,
            notifications_removed = deletion.notifications_removed,
            "Account deleted"
        );
        Ok(deletion)
    }
}
