// Not every helper is used in every test, so we allow dead code
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use push_client::{
    BrowserSubscription, Permission, PlatformError, PushPlatform, WorkerRegistration, WorkerState,
};
use tokio::sync::watch;

/// How the fake worker moves after registration
#[derive(Debug, Clone, Copy)]
pub enum Activation {
    Immediate,
    After(Duration),
    Redundant,
    Never,
}

/// How the fake push service answers a subscribe
#[derive(Debug, Clone)]
pub enum SubscribeBehavior {
    Succeed,
    After(Duration),
    Hang,
    Fail(PlatformError),
}

/// Scriptable browser
pub struct FakePlatform {
    pub supported: bool,
    pub prompt_answer: Permission,
    pub activation: Activation,
    pub subscribe_behavior: SubscribeBehavior,
    permission: Mutex<Permission>,
    worker: watch::Sender<WorkerState>,
    registered: Mutex<bool>,
    current: Mutex<Option<BrowserSubscription>>,
    unsubscribed: Mutex<Vec<String>>,
    issued: AtomicUsize,
}

impl FakePlatform {
    /// Supported browser that has not decided on permission and grants it when asked
    pub fn new() -> Self {
        Self {
            supported: true,
            prompt_answer: Permission::Granted,
            activation: Activation::Immediate,
            subscribe_behavior: SubscribeBehavior::Succeed,
            permission: Mutex::new(Permission::Default),
            worker: watch::Sender::new(WorkerState::Installing),
            registered: Mutex::new(false),
            current: Mutex::new(None),
            unsubscribed: Mutex::new(Vec::new()),
            issued: AtomicUsize::new(0),
        }
    }

    pub fn with_permission(self, permission: Permission) -> Self {
        *self.permission.lock().unwrap() = permission;
        self
    }

    /// Browser that already holds `subscription` from an earlier session
    pub fn with_existing_subscription(self, subscription: BrowserSubscription) -> Self {
        *self.registered.lock().unwrap() = true;
        self.worker.send_replace(WorkerState::Activated);
        *self.current.lock().unwrap() = Some(subscription);
        self
    }

    pub fn current(&self) -> Option<BrowserSubscription> {
        self.current.lock().unwrap().clone()
    }

    pub fn unsubscribed(&self) -> Vec<String> {
        self.unsubscribed.lock().unwrap().clone()
    }

    pub fn is_registered(&self) -> bool {
        *self.registered.lock().unwrap()
    }

    fn issue(&self) -> BrowserSubscription {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let subscription = browser_subscription(&format!("issued-{n}"));
        *self.current.lock().unwrap() = Some(subscription.clone());
        subscription
    }

    fn registration_handle(&self) -> WorkerRegistration {
        WorkerRegistration {
            scope: "/".to_string(),
            state: self.worker.subscribe(),
        }
    }
}

pub fn browser_subscription(id: &str) -> BrowserSubscription {
    BrowserSubscription {
        endpoint: format!("https://push.example.com/send/{id}"),
        p256dh: "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM".to_string(),
        auth: "tBHItJI5svbpez7KI4CCXg".to_string(),
    }
}

#[async_trait]
impl PushPlatform for FakePlatform {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> Permission {
        *self.permission.lock().unwrap() = self.prompt_answer;
        self.prompt_answer
    }

    async fn register_worker(&self) -> Result<WorkerRegistration, PlatformError> {
        *self.registered.lock().unwrap() = true;

        match self.activation {
            Activation::Immediate => {
                self.worker.send_replace(WorkerState::Activated);
            }
            Activation::After(delay) => {
                let worker = self.worker.clone();
                tokio::spawn(async move {
                    worker.send_replace(WorkerState::Activating);
                    tokio::time::sleep(delay).await;
                    worker.send_replace(WorkerState::Activated);
                });
            }
            Activation::Redundant => {
                self.worker.send_replace(WorkerState::Redundant);
            }
            Activation::Never => {}
        }

        Ok(self.registration_handle())
    }

    async fn registration(&self) -> Option<WorkerRegistration> {
        self.is_registered().then(|| self.registration_handle())
    }

    async fn current_subscription(
        &self,
        _registration: &WorkerRegistration,
    ) -> Result<Option<BrowserSubscription>, PlatformError> {
        Ok(self.current())
    }

    async fn subscribe(
        &self,
        _registration: &WorkerRegistration,
        _application_server_key: &str,
    ) -> Result<BrowserSubscription, PlatformError> {
        match self.subscribe_behavior.clone() {
            SubscribeBehavior::Succeed => Ok(self.issue()),
            SubscribeBehavior::After(delay) => {
                tokio::time::sleep(delay).await;
                Ok(self.issue())
            }
            SubscribeBehavior::Hang => std::future::pending().await,
            SubscribeBehavior::Fail(e) => Err(e),
        }
    }

    async fn unsubscribe(
        &self,
        _registration: &WorkerRegistration,
        subscription: &BrowserSubscription,
    ) -> Result<(), PlatformError> {
        self.unsubscribed
            .lock()
            .unwrap()
            .push(subscription.endpoint.clone());
        *self.current.lock().unwrap() = None;
        Ok(())
    }
}
