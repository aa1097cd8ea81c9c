use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Extension, Router};
use backend::account::AccountDeleter;
use backend::routes;
use backend::state::Services;
use backend::types::Environment;
use backend::web_push::PushSender;
use backend_storage::memory::{
    InMemoryDirectory, InMemoryNotificationStore, InMemorySubscriptionStore,
};
use common_types::{NotificationRecord, PushSubscription};
use tower::ServiceExt;

use super::fakes::{FakeAccountDeleter, FakePushSender};

/// Setup test environment variables with all the required configuration
pub fn setup_test_env() {
    // Load test environment variables
    dotenvy::from_path(".env.example").ok();

    // Initialize tracing for tests
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// What a test starts with
pub struct TestConfig {
    pub subscriptions: Vec<PushSubscription>,
    pub records: Vec<NotificationRecord>,
    pub directory: InMemoryDirectory,
    /// `None` runs without push signing keys
    pub sender: Option<FakePushSender>,
    /// `None` runs without auth admin credentials
    pub deleter: Option<FakeAccountDeleter>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
            records: Vec::new(),
            directory: InMemoryDirectory::new(),
            sender: Some(FakePushSender::new()),
            deleter: Some(FakeAccountDeleter::new()),
        }
    }
}

/// Router wired to in-memory stores and fake outbound services
pub struct TestSetup {
    pub router: Router,
    pub subscriptions: Arc<InMemorySubscriptionStore>,
    pub notifications: Arc<InMemoryNotificationStore>,
    pub sender: Option<Arc<FakePushSender>>,
    pub deleter: Option<Arc<FakeAccountDeleter>>,
}

impl TestSetup {
    pub fn new(config: TestConfig) -> Self {
        setup_test_env();

        let environment = Environment::Development {
            push_ttl_override: None,
        };

        let subscriptions = Arc::new(InMemorySubscriptionStore::with_subscriptions(
            config.subscriptions,
        ));
        let notifications = Arc::new(InMemoryNotificationStore::with_records(config.records));
        let sender = config.sender.map(Arc::new);
        let deleter = config.deleter.map(Arc::new);

        let services = Services::new(
            subscriptions.clone(),
            notifications.clone(),
            Arc::new(config.directory),
            sender.clone().map(|s| s as Arc<dyn PushSender>),
            deleter.clone().map(|d| d as Arc<dyn AccountDeleter>),
        );

        let router = services.layer(
            routes::handler()
                .layer(Extension(environment))
                .into(),
        );

        Self {
            router,
            subscriptions,
            notifications,
            sender,
            deleter,
        }
    }

    /// Setup with push and account deletion configured and nothing stored
    pub fn empty() -> Self {
        Self::new(TestConfig::default())
    }

    pub fn sender(&self) -> &FakePushSender {
        self.sender.as_deref().expect("push sender not configured")
    }

    pub fn deleter(&self) -> &FakeAccountDeleter {
        self.deleter.as_deref().expect("account deleter not configured")
    }

    pub async fn send_post_request(
        &self,
        route: &str,
        payload: serde_json::Value,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        self.send_json_request("POST", route, payload).await
    }

    pub async fn send_delete_request(
        &self,
        route: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        match payload {
            Some(payload) => self.send_json_request("DELETE", route, payload).await,
            None => {
                let request = Request::builder()
                    .uri(route)
                    .method("DELETE")
                    .body(Body::empty())?;
                Ok(self.router.clone().oneshot(request).await?)
            }
        }
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    async fn send_json_request(
        &self,
        method: &str,
        route: &str,
        payload: serde_json::Value,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method(method)
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))?;

        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }
}
