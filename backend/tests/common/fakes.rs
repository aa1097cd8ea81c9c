use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use backend::account::{AccountDeleter, AccountError};
use backend::web_push::{DeliveryOutcome, PushSender};
use common_types::{PushPayload, PushSubscription};

/// Key reported by [`FakePushSender`]
pub const TEST_APPLICATION_SERVER_KEY: &str = "BFakeApplicationServerKey";

/// Push sender that records every delivery and answers from a script
#[derive(Default)]
pub struct FakePushSender {
    outcomes: HashMap<String, DeliveryOutcome>,
    sent: Mutex<Vec<(String, PushPayload)>>,
}

impl FakePushSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer deliveries to `endpoint` with `outcome` instead of `Delivered`
    pub fn with_outcome(mut self, endpoint: &str, outcome: DeliveryOutcome) -> Self {
        self.outcomes.insert(endpoint.to_string(), outcome);
        self
    }

    /// Every delivery so far as `(endpoint, payload)`
    pub fn sent(&self) -> Vec<(String, PushPayload)> {
        self.sent.lock().unwrap().clone()
    }

    /// Endpoints delivered to so far, sorted
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = self.sent().into_iter().map(|(e, _)| e).collect();
        endpoints.sort();
        endpoints
    }
}

#[async_trait]
impl PushSender for FakePushSender {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> DeliveryOutcome {
        self.sent.lock().unwrap().push((
            subscription.endpoint.clone(),
            PushPayload::from_push_data(payload),
        ));

        self.outcomes
            .get(&subscription.endpoint)
            .cloned()
            .unwrap_or(DeliveryOutcome::Delivered)
    }

    fn application_server_key(&self) -> Option<&str> {
        Some(TEST_APPLICATION_SERVER_KEY)
    }
}

/// Auth admin stand-in that records deleted users
#[derive(Default)]
pub struct FakeAccountDeleter {
    reject_with: Option<u16>,
    deleted: Mutex<Vec<String>>,
}

impl FakeAccountDeleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deleter whose auth provider answers every request with `status`
    pub fn rejecting(status: u16) -> Self {
        Self {
            reject_with: Some(status),
            ..Self::default()
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccountDeleter for FakeAccountDeleter {
    async fn delete_user(&self, user_id: &str) -> Result<(), AccountError> {
        if let Some(status) = self.reject_with {
            return Err(AccountError::Rejected { status });
        }
        self.deleted.lock().unwrap().push(user_id.to_string());
        Ok(())
    }
}
