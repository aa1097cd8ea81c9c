//! HTTP client for the backend API

use std::time::Duration;

use async_trait::async_trait;
use common_types::api::{
    ClearNotificationsResponse, MarkReadRequest, MarkReadResponse, NotificationFeed,
    PublicKeyResponse, RemoveSubscriptionRequest, SaveSubscriptionRequest, SendPushRequest, SendPushResponse,
};
use common_types::store::{StorageError, StorageResult, SubscriptionRegistry};
use common_types::PushSubscription;
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};
use url::Url;

/// Errors returned by [`ApiClient`]
#[derive(Error, Debug)]
pub enum ApiClientError {
    /// The base URL cannot carry path segments
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// The backend answered with an error envelope
    #[error("Backend responded with {status}: {message}")]
    Api {
        /// HTTP status of the response
        status: u16,
        /// Machine-readable error code, when the body carried one
        code: Option<String>,
        /// Human-readable error message
        message: String,
    },

    /// The backend could not be reached
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiClientError {
    /// Whether the request may succeed if sent again
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidUrl(_) => false,
            Self::Api { status, .. } => *status >= 500,
            Self::Transport(_) => true,
        }
    }
}

impl From<ApiClientError> for StorageError {
    fn from(err: ApiClientError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

/// Backend API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for the backend at `base_url`
    ///
    /// # Errors
    ///
    /// Returns `ApiClientError::InvalidUrl` for an unusable URL, or
    /// `ApiClientError::Transport` if the HTTP client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiClientError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiClientError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            http_client: Client::builder().timeout(timeout).build()?,
            base_url,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request<B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<reqwest::Response, ApiClientError> {
        let mut request = self.http_client.request(method, self.url(segments)?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let envelope = response.json::<ErrorEnvelope>().await.ok();
        Err(ApiClientError::Api {
            status: status.as_u16(),
            code: envelope.as_ref().and_then(|e| e.code.clone()),
            message: envelope.map_or_else(|| status.to_string(), |e| e.error),
        })
    }

    async fn request_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, ApiClientError> {
        Ok(self.request(method, segments, body).await?.json().await?)
    }

    /// Sends a push message and returns how many subscriptions received it
    ///
    /// # Errors
    ///
    /// Returns the backend's error or the transport failure
    pub async fn send_push(&self, request: &SendPushRequest) -> Result<SendPushResponse, ApiClientError> {
        self.request_json(Method::POST, &["api", "send-push"], Some(request))
            .await
    }

    /// Sends a push message in the background without waiting for the result.
    /// The message is sent at most once; a failure is only logged.
    pub fn send_push_detached(&self, request: SendPushRequest) -> JoinHandle<()> {
        let client = self.clone();

        tokio::spawn(
            async move {
                match client.send_push(&request).await {
                    Ok(response) => info!(sent = response.sent, "Push sent"),
                    Err(e) => warn!(error = %e, "Push send failed"),
                }
            }
            .in_current_span(),
        )
    }

    /// Application server key to subscribe with, see [`crate::ManagerConfig::new`]
    ///
    /// # Errors
    ///
    /// Returns the backend's error, `push_not_configured` when it has no signing
    /// keys, or the transport failure
    pub async fn application_server_key(&self) -> Result<String, ApiClientError> {
        let response: PublicKeyResponse = self
            .request_json::<(), _>(Method::GET, &["api", "push", "public-key"], None)
            .await?;
        Ok(response.public_key)
    }

        /// Grouped notification feed of `user_id`
    ///
    /// # Errors
    ///
    /// Returns the backend's error or the transport failure
    pub async fn notifications(&self, user_id: &str) -> Result<NotificationFeed, ApiClientError> {
        self.request_json::<(), _>(Method::GET, &["api", "notifications", user_id], None)
            .await
    }

    /// Marks `ids` read, or every notification when `ids` is `None`
    ///
    /// # Errors
    ///
    /// Returns the backend's error or the transport failure
    pub async fn mark_read(
        &self,
        user_id: &str,
        ids: Option<Vec<String>>,
    ) -> Result<MarkReadResponse, ApiClientError> {
        self.request_json(
            Method::POST,
            &["api", "notifications", user_id, "read"],
            Some(&MarkReadRequest { ids }),
        )
        .await
    }

    /// Deletes one notification; returns false if it did not exist
    ///
    /// # Errors
    ///
    /// Returns the backend's error or the transport failure
    pub async fn delete_notification(&self, user_id: &str, id: &str) -> Result<bool, ApiClientError> {
        match self
            .request::<()>(Method::DELETE, &["api", "notifications", user_id, id], None)
            .await
        {
            Ok(_) => Ok(true),
            Err(ApiClientError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Deletes every notification of `user_id`
    ///
    /// # Errors
    ///
    /// Returns the backend's error or the transport failure
    pub async fn clear_notifications(&self, user_id: &str) -> Result<usize, ApiClientError> {
        let response: ClearNotificationsResponse = self
            .request_json::<(), _>(Method::DELETE, &["api", "notifications", user_id], None)
            .await?;
        Ok(response.deleted)
    }
}

/// Subscription registry backed by the backend's subscription endpoints
#[derive(Debug, Clone)]
pub struct HttpSubscriptionStore {
    client: ApiClient,
}

impl HttpSubscriptionStore {
    /// Registry writing through `client`
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubscriptionRegistry for HttpSubscriptionStore {
    async fn save(&self, subscription: &PushSubscription) -> StorageResult<()> {
        let body = SaveSubscriptionRequest {
            user_id: subscription.user_id.clone(),
            endpoint: subscription.endpoint.clone(),
            p256dh: subscription.p256dh.clone(),
            auth: subscription.auth.clone(),
        };
        self.client
            .request(Method::POST, &["api", "subscriptions"], Some(&body))
            .await?;
        Ok(())
    }

    /// The backend does not say whether a row matched, so a successful call
    /// always reports `true`
    async fn remove(&self, user_id: &str, endpoint: &str) -> StorageResult<bool> {
        let body = RemoveSubscriptionRequest {
            user_id: user_id.to_string(),
            endpoint: endpoint.to_string(),
        };
        self.client
            .request(Method::DELETE, &["api", "subscriptions"], Some(&body))
            .await?;
        Ok(true)
    }
}
