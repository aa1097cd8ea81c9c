use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

/// Notification permission as reported by the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Not decided yet; also what a dismissed prompt leaves behind
    Default,
    /// Notifications may be shown
    Granted,
    /// Notifications are blocked until the user changes browser settings
    Denied,
}

/// Lifecycle state of the background worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Script is being fetched and installed
    Installing,
    /// Installed and waiting to take over
    Installed,
    /// Taking over its scope
    Activating,
    /// Active; push subscriptions can be created
    Activated,
    /// Replaced or failed to install; never becomes active
    Redundant,
}

/// A registered background worker
///
/// `state` follows the worker's lifecycle; waiting on it is how activation is
/// observed.
#[derive(Debug, Clone)]
pub struct WorkerRegistration {
    /// Scope the worker controls
    pub scope: String,
    /// Current lifecycle state, updated by the platform
    pub state: watch::Receiver<WorkerState>,
}

/// Subscription handed out by the browser push service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSubscription {
    /// Push service URL messages are posted to
    pub endpoint: String,
    /// Client public key, base64url
    pub p256dh: String,
    /// Client auth secret, base64url
    pub auth: String,
}

/// Failures reported by platform calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The push service aborted the operation
    #[error("Push service aborted: {0}")]
    Aborted(String),

    /// The browser refused the operation because permission is missing
    #[error("Not allowed: {0}")]
    NotAllowed(String),

    /// Any other platform failure
    #[error("{0}")]
    Other(String),
}

/// Browser push capabilities
#[async_trait]
pub trait PushPlatform: Send + Sync {
    /// Whether background workers, the push API and notifications all exist
    fn is_supported(&self) -> bool;

    /// Permission as currently recorded, without prompting
    fn permission(&self) -> Permission;

    /// Shows the permission prompt and returns the user's answer
    async fn request_permission(&self) -> Permission;

    /// Registers the background worker, or returns the existing registration
    async fn register_worker(&self) -> Result<WorkerRegistration, PlatformError>;

    /// Existing worker registration, if any
    async fn registration(&self) -> Option<WorkerRegistration>;

    /// Subscription currently held by `registration`
    async fn current_subscription(
        &self,
        registration: &WorkerRegistration,
    ) -> Result<Option<BrowserSubscription>, PlatformError>;

    /// Creates a subscription bound to `application_server_key`
    async fn subscribe(
        &self,
        registration: &WorkerRegistration,
        application_server_key: &str,
    ) -> Result<BrowserSubscription, PlatformError>;

    /// Releases `subscription` at the push service
    async fn unsubscribe(
        &self,
        registration: &WorkerRegistration,
        subscription: &BrowserSubscription,
    ) -> Result<(), PlatformError>;
}
