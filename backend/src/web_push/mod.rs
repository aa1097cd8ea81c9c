//! Web Push delivery (RFC 8030) with VAPID and `aes128gcm` payload encryption

mod encryption;
mod error;
mod vapid;

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use common_types::PushSubscription;
use reqwest::Client;
use tracing::{debug, warn};

pub use encryption::{encrypt_payload, MAX_PAYLOAD_LEN};
pub use error::WebPushError;
pub use vapid::{VapidConfig, VapidSigner};

/// Maximum number of idle connections to maintain per push service host
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 10;

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The push service accepted the message
    Delivered,
    /// The subscription no longer exists at the push service (404 or 410)
    Gone,
    /// Any other failure; the subscription is kept
    Failed(String),
}

impl DeliveryOutcome {
    /// Classifies a push service response status
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        if status.is_success() {
            Self::Delivered
        } else if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            Self::Gone
        } else {
            Self::Failed(format!("push service responded with {status}"))
        }
    }
}

/// Delivers an already serialized payload to one subscription
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Sends `payload` to `subscription`; never fails, the outcome says what happened
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> DeliveryOutcome;

    /// Public key browsers pass as `applicationServerKey` when subscribing
    fn application_server_key(&self) -> Option<&str> {
        None
    }
}

/// HTTP push sender talking to browser push services
pub struct WebPushSender {
    http_client: Client,
    signer: VapidSigner,
    ttl_secs: u32,
}

impl WebPushSender {
    /// Creates a sender signing with `config`
    ///
    /// # Errors
    ///
    /// Returns `WebPushError::InvalidVapidKey` for an unusable key pair, or
    /// `WebPushError::Transport` if the HTTP client cannot be built
    pub fn new(config: &VapidConfig, ttl_secs: u32, timeout: Duration) -> Result<Self, WebPushError> {
        let signer = VapidSigner::from_config(config)?;
        let http_client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
            .build()?;

        Ok(Self {
            http_client,
            signer,
            ttl_secs,
        })
    }

    async fn try_send(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<StatusCode, WebPushError> {
        let body = encrypt_payload(payload, &subscription.p256dh, &subscription.auth)?;
        let authorization = self.signer.authorization(&subscription.endpoint)?;

        let response = self
            .http_client
            .post(&subscription.endpoint)
            .header("Authorization", authorization)
            .header("TTL", self.ttl_secs.to_string())
            .header("Content-Encoding", "aes128gcm")
            .header("Content-Type", "application/octet-stream")
            .header("Urgency", "normal")
            .body(body)
            .send()
            .await?;

        Ok(response.status())
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> DeliveryOutcome {
        match self.try_send(subscription, payload).await {
            Ok(status) => {
                debug!(endpoint = %subscription.endpoint, %status, "Push service responded");
                DeliveryOutcome::from_status(status)
            }
            Err(err) => {
                warn!(endpoint = %subscription.endpoint, error = %err, "Push delivery failed");
                DeliveryOutcome::Failed(err.to_string())
            }
        }
    }

    fn application_server_key(&self) -> Option<&str> {
        Some(self.signer.public_key())
    }
}
