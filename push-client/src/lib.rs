//! Client side of roadmap push notifications
//!
//! Drives the browser push subscription lifecycle over an abstract platform,
//! persists subscriptions through the backend, and keeps an optimistic local copy
//! of the user's notification feed.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// HTTP client for the backend API
pub mod api;

/// Subscribe failures and their user-facing messages
pub mod error;

/// Notification feed with optimistic edits
pub mod inbox;

/// Push subscription state machine
pub mod manager;

/// Browser push capabilities the manager is written against
pub mod platform;

pub use api::{ApiClient, ApiClientError, HttpSubscriptionStore};
pub use error::SubscribeError;
pub use inbox::{FeedSource, NotificationInbox};
pub use manager::{ManagerConfig, PushSubscriptionManager, SubscriptionStatus};
pub use platform::{
    BrowserSubscription, Permission, PlatformError, PushPlatform, WorkerRegistration, WorkerState,
};
