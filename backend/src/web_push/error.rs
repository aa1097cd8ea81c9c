//! Web Push error types

use thiserror::Error;

/// Errors raised while preparing or sending a push message
#[derive(Error, Debug)]
pub enum WebPushError {
    /// The VAPID key pair could not be decoded or does not match
    #[error("Invalid VAPID key: {0}")]
    InvalidVapidKey(String),

    /// The VAPID token could not be signed
    #[error("Failed to sign VAPID token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The subscription's endpoint is not an absolute URL
    #[error("Invalid push endpoint: {0}")]
    InvalidEndpoint(String),

    /// The subscription's `p256dh` or `auth` value is malformed
    #[error("Invalid subscription keys: {0}")]
    InvalidSubscriptionKeys(String),

    /// The payload does not fit in a single record
    #[error("Payload of {0} bytes exceeds the push size limit")]
    PayloadTooLarge(usize),

    /// Key derivation or encryption failed
    #[error("Failed to encrypt push payload")]
    Encryption,

    /// The push service could not be reached
    #[error("Push service request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
