use common_types::store::StorageError;
use thiserror::Error;

use crate::platform::PlatformError;

/// Why a subscribe or unsubscribe did not complete
#[derive(Error, Debug)]
pub enum SubscribeError {
    /// The browser lacks background workers, the push API or notifications
    #[error("Push notifications are not supported")]
    Unsupported,

    /// The user blocked notifications
    #[error("Notification permission denied")]
    PermissionDenied,

    /// The user closed the permission prompt without answering
    #[error("Notification permission prompt dismissed")]
    PermissionDismissed,

    /// The background worker could not be registered or never became active
    #[error("Background worker registration failed: {0}")]
    WorkerRegistrationFailed(String),

    /// The push service did not answer within the subscribe timeout
    #[error("Push service timed out")]
    PushServiceTimeout,

    /// The push service refused to create the subscription
    #[error("Push service aborted the subscription: {0}")]
    PushServiceAborted(String),

    /// Permission was withdrawn while the subscription was being created
    #[error("Notification permission revoked during subscription")]
    PermissionRevoked,

    /// Another subscribe on the same manager has not finished yet
    #[error("Subscription already in progress")]
    AlreadyInProgress,

    /// The subscription could not be saved or removed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Any other platform failure
    #[error("Unexpected push error: {0}")]
    Unknown(String),
}

impl SubscribeError {
    /// Message shown to the user
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Unsupported => "This browser does not support push notifications.",
            Self::PermissionDenied => {
                "Notifications are blocked. Allow them in your browser settings to turn them on."
            }
            Self::PermissionDismissed => "Notifications were not enabled. Try again when ready.",
            Self::WorkerRegistrationFailed(_) => {
                "Notifications could not be set up. Reload the page and try again."
            }
            Self::PushServiceTimeout => "The push service took too long to respond. Try again.",
            Self::PushServiceAborted(_) => "The push service rejected the request. Try again.",
            Self::PermissionRevoked => {
                "Notification permission changed while enabling notifications."
            }
            Self::AlreadyInProgress => "Notifications are already being enabled.",
            Self::Storage(_) => "Your notification settings could not be saved. Try again.",
            Self::Unknown(_) => "Something went wrong while enabling notifications.",
        }
    }

    /// Whether asking the user to try again can help
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDismissed
                | Self::PushServiceTimeout
                | Self::PushServiceAborted(_)
                | Self::Storage(_)
                | Self::Unknown(_)
        )
    }
}

impl From<PlatformError> for SubscribeError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Aborted(msg) => Self::PushServiceAborted(msg),
            PlatformError::NotAllowed(_) => Self::PermissionRevoked,
            PlatformError::Other(msg) => Self::Unknown(msg),
        }
    }
}
