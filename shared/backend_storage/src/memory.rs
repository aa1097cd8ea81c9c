//! In-memory store implementations
//!
//! Same semantics as the Dynamo DB stores, held in `tokio::sync::RwLock`ed maps.
//! Used by the backend and client test suites so they run without LocalStack.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common_types::store::{
    NotificationStore, Profile, ProfileDirectory, StorageError, StorageResult,
    SubscriptionRegistry, SubscriptionStore,
};
use common_types::{NotificationRecord, PushSubscription};
use tokio::sync::RwLock;

/// Subscription rows keyed by endpoint
#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    rows: RwLock<BTreeMap<String, PushSubscription>>,
    unavailable: AtomicBool,
}

impl InMemorySubscriptionStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `subscriptions`
    #[must_use]
    pub fn with_subscriptions(subscriptions: impl IntoIterator<Item = PushSubscription>) -> Self {
        let rows = subscriptions
            .into_iter()
            .map(|subscription| (subscription.endpoint.clone(), subscription))
            .collect();

        Self {
            rows: RwLock::new(rows),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Makes every following call fail with `StorageError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of all rows, ordered by endpoint
    pub async fn all(&self) -> Vec<PushSubscription> {
        self.rows.read().await.values().cloned().collect()
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "in-memory subscription store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRegistry for InMemorySubscriptionStore {
    async fn save(&self, subscription: &PushSubscription) -> StorageResult<()> {
        self.check_available()?;
        self.rows
            .write()
            .await
            .insert(subscription.endpoint.clone(), subscription.clone());
        Ok(())
    }

    async fn remove(&self, user_id: &str, endpoint: &str) -> StorageResult<bool> {
        self.check_available()?;
        let mut rows = self.rows.write().await;
        if rows.get(endpoint).is_some_and(|row| row.user_id == user_id) {
            rows.remove(endpoint);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn find_by_users(&self, user_ids: &[String]) -> StorageResult<Vec<PushSubscription>> {
        self.check_available()?;
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|row| user_ids.contains(&row.user_id))
            .cloned()
            .collect())
    }

    async fn remove_endpoint(&self, endpoint: &str) -> StorageResult<()> {
        self.check_available()?;
        self.rows.write().await.remove(endpoint);
        Ok(())
    }

    async fn remove_all_for_user(&self, user_id: &str) -> StorageResult<usize> {
        self.check_available()?;
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, row| row.user_id != user_id);
        Ok(before - rows.len())
    }
}

/// Notification rows keyed by `(receiver_id, id)`
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    rows: RwLock<BTreeMap<(String, String), NotificationRecord>>,
}

impl InMemoryNotificationStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `records`
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = NotificationRecord>) -> Self {
        let rows = records
            .into_iter()
            .map(|record| ((record.receiver_id.clone(), record.id.clone()), record))
            .collect();

        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Snapshot of all rows
    pub async fn all(&self) -> Vec<NotificationRecord> {
        self.rows.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, record: &NotificationRecord) -> StorageResult<()> {
        let key = (record.receiver_id.clone(), record.id.clone());
        let mut rows = self.rows.write().await;
        if rows.contains_key(&key) {
            return Err(StorageError::Unavailable("Notification already exists".to_string()));
        }
        rows.insert(key, record.clone());
        Ok(())
    }

    async fn list_for_receiver(&self, receiver_id: &str) -> StorageResult<Vec<NotificationRecord>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|record| record.receiver_id == receiver_id)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, receiver_id: &str, ids: &[String]) -> StorageResult<usize> {
        let mut rows = self.rows.write().await;
        let mut updated = 0;
        for id in ids {
            if let Some(record) = rows.get_mut(&(receiver_id.to_string(), id.clone())) {
                record.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn mark_all_read(&self, receiver_id: &str) -> StorageResult<usize> {
        let mut rows = self.rows.write().await;
        let mut updated = 0;
        for record in rows.values_mut() {
            if record.receiver_id == receiver_id && !record.is_read {
                record.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete(&self, receiver_id: &str, id: &str) -> StorageResult<bool> {
        Ok(self
            .rows
            .write()
            .await
            .remove(&(receiver_id.to_string(), id.to_string()))
            .is_some())
    }

    async fn delete_all(&self, receiver_id: &str) -> StorageResult<usize> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|(receiver, _), _| receiver != receiver_id);
        Ok(before - rows.len())
    }
}

/// Profiles and card titles held in maps
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    profiles: HashMap<String, Profile>,
    card_titles: HashMap<String, String>,
}

impl InMemoryDirectory {
    /// Directory without profiles or cards
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a profile
    #[must_use]
    pub fn with_profile(mut self, id: &str, username: &str) -> Self {
        self.profiles.insert(
            id.to_string(),
            Profile {
                id: id.to_string(),
                username: username.to_string(),
                avatar_url: None,
            },
        );
        self
    }

    /// Adds a card
    #[must_use]
    pub fn with_card(mut self, id: &str, title: &str) -> Self {
        self.card_titles.insert(id.to_string(), title.to_string());
        self
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryDirectory {
    async fn profiles(&self, ids: &[String]) -> StorageResult<HashMap<String, Profile>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.profiles.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }

    async fn card_titles(&self, ids: &[String]) -> StorageResult<HashMap<String, String>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.card_titles.get(id).map(|t| (id.clone(), t.clone())))
            .collect())
    }
}
