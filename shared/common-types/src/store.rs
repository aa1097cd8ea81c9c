//! Storage seams
//!
//! The backend is written against these traits; `backend_storage` provides the
//! DynamoDB implementations and in-memory ones for tests, and the push client
//! implements [`SubscriptionRegistry`] over HTTP.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::NotificationRecord;
use crate::subscription::PushSubscription;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by any storage implementation
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing service could not be reached or rejected the operation
    #[error("Storage service unavailable: {0}")]
    Unavailable(String),

    /// A stored item could not be encoded or decoded
    #[error("Failed to encode or decode stored item: {0}")]
    Serialization(String),
}

/// Public profile row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Writes a device's subscription, the part of the store a client needs
#[async_trait]
pub trait SubscriptionRegistry: Send + Sync {
    /// Stores `subscription`, replacing any row with the same endpoint
    async fn save(&self, subscription: &PushSubscription) -> StorageResult<()>;

    /// Deletes the row for `endpoint` if it belongs to `user_id`.
    /// Returns whether a row was deleted.
    async fn remove(&self, user_id: &str, endpoint: &str) -> StorageResult<bool>;
}

/// Full subscription store used by the dispatcher
#[async_trait]
pub trait SubscriptionStore: SubscriptionRegistry {
    /// All subscriptions belonging to any of `user_ids`
    async fn find_by_users(&self, user_ids: &[String]) -> StorageResult<Vec<PushSubscription>>;

    /// Deletes the row for `endpoint` whoever owns it
    async fn remove_endpoint(&self, endpoint: &str) -> StorageResult<()>;

    /// Deletes every subscription of `user_id`, returning how many were removed
    async fn remove_all_for_user(&self, user_id: &str) -> StorageResult<usize>;
}

/// The `notifications` table
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, record: &NotificationRecord) -> StorageResult<()>;

    /// Every row owned by `receiver_id`, in no particular order
    async fn list_for_receiver(&self, receiver_id: &str) -> StorageResult<Vec<NotificationRecord>>;

    /// Marks the given rows read, returning how many existed
    async fn mark_read(&self, receiver_id: &str, ids: &[String]) -> StorageResult<usize>;

    /// Marks every unread row read, returning how many changed
    async fn mark_all_read(&self, receiver_id: &str) -> StorageResult<usize>;

    /// Deletes one row, returning whether it existed
    async fn delete(&self, receiver_id: &str, id: &str) -> StorageResult<bool>;

    /// Deletes every row owned by `receiver_id`, returning how many were removed
    async fn delete_all(&self, receiver_id: &str) -> StorageResult<usize>;
}

/// Lookups used to join notification rows with profiles and card titles
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Profiles found for `ids`, keyed by id; unknown ids are absent
    async fn profiles(&self, ids: &[String]) -> StorageResult<HashMap<String, Profile>>;

    /// Card titles found for `ids`, keyed by card id; unknown ids are absent
    async fn card_titles(&self, ids: &[String]) -> StorageResult<HashMap<String, String>>;
}

pub type DynSubscriptionStore = Arc<dyn SubscriptionStore>;
pub type DynNotificationStore = Arc<dyn NotificationStore>;
pub type DynProfileDirectory = Arc<dyn ProfileDirectory>;
