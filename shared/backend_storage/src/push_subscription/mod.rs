//! Push subscription storage integration using Dynamo DB
//!
//! One row per browser installation, keyed by `endpoint`. Writing a subscription
//! for an endpoint that is already stored replaces the row, so an endpoint always
//! belongs to at most one user. A global secondary index on `user_id` serves the
//! per-user lookups the dispatcher needs.

mod error;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::SdkError,
    types::{AttributeValue, ReturnValue, Select},
    Client as DynamoDbClient,
};
use common_types::store::{StorageResult, SubscriptionRegistry, SubscriptionStore};
use common_types::PushSubscription;
use futures::future::try_join_all;
use strum::Display;

pub use error::{PushSubscriptionStorageError, PushSubscriptionStorageResult};

/// Attribute names for push subscription table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PushSubscriptionAttribute {
    /// Push service URL (Primary Key)
    Endpoint,
    /// Owner of the subscription (GSI partition key)
    UserId,
    /// Client public key
    #[strum(serialize = "p256dh")]
    P256dh,
    /// Client auth secret
    Auth,
}

/// Push subscription storage client for Dynamo DB operations
pub struct PushSubscriptionStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
    user_index_name: String,
}

impl PushSubscriptionStorage {
    /// Creates a new push subscription storage client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured Dynamo DB client
    /// * `table_name` - Dynamo DB table name for push subscriptions
    /// * `user_index_name` - Global secondary index keyed by `user_id`
    #[must_use]
    pub const fn new(
        dynamodb_client: Arc<DynamoDbClient>,
        table_name: String,
        user_index_name: String,
    ) -> Self {
        Self {
            dynamodb_client,
            table_name,
            user_index_name,
        }
    }

    /// Stores a subscription, replacing any row with the same endpoint
    ///
    /// # Errors
    ///
    /// Returns `PushSubscriptionStorageError` if serialization or the Dynamo DB operation fails
    pub async fn upsert(&self, subscription: &PushSubscription) -> PushSubscriptionStorageResult<()> {
        let item = serde_dynamo::to_item(subscription)
            .map_err(|e| PushSubscriptionStorageError::SerializationError(e.to_string()))?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await?;

        Ok(())
    }

    /// Gets the subscription stored for an endpoint
    ///
    /// # Errors
    ///
    /// Returns `PushSubscriptionStorageError` if the Dynamo DB operation fails
    pub async fn get_one(
        &self,
        endpoint: &str,
    ) -> PushSubscriptionStorageResult<Option<PushSubscription>> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key(
                PushSubscriptionAttribute::Endpoint.to_string(),
                AttributeValue::S(endpoint.to_string()),
            )
            .send()
            .await?;

        response
            .item()
            .map(|item| {
                serde_dynamo::from_item(item.clone()).map_err(|e| {
                    PushSubscriptionStorageError::ParseSubscriptionError(e.to_string())
                })
            })
            .transpose()
    }

    /// Gets all push subscriptions of a user, following pagination to the end
    ///
    /// # Errors
    ///
    /// Returns `PushSubscriptionStorageError` if the Dynamo DB operation fails
    pub async fn get_all_by_user(
        &self,
        user_id: &str,
    ) -> PushSubscriptionStorageResult<Vec<PushSubscription>> {
        let mut subscriptions = Vec::new();
        let mut exclusive_start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let response = self
                .dynamodb_client
                .query()
                .table_name(&self.table_name)
                .index_name(&self.user_index_name)
                .key_condition_expression("#user_id = :user_id")
                .expression_attribute_names("#user_id", PushSubscriptionAttribute::UserId.to_string())
                .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
                .select(Select::AllProjectedAttributes)
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await?;

            for item in response.items() {
                let subscription = serde_dynamo::from_item(item.clone()).map_err(|e| {
                    PushSubscriptionStorageError::ParseSubscriptionError(e.to_string())
                })?;
                subscriptions.push(subscription);
            }

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(subscriptions)
    }

    /// Deletes the row for `endpoint` only if it belongs to `user_id`
    ///
    /// # Returns
    ///
    /// `true` if a row was deleted, `false` if no row for the endpoint is owned by the user
    ///
    /// # Errors
    ///
    /// Returns `PushSubscriptionStorageError` if the Dynamo DB operation fails
    pub async fn delete_for_user(
        &self,
        user_id: &str,
        endpoint: &str,
    ) -> PushSubscriptionStorageResult<bool> {
        let result = self
            .dynamodb_client
            .delete_item()
            .table_name(&self.table_name)
            .key(
                PushSubscriptionAttribute::Endpoint.to_string(),
                AttributeValue::S(endpoint.to_string()),
            )
            .condition_expression("#user_id = :user_id")
            .expression_attribute_names("#user_id", PushSubscriptionAttribute::UserId.to_string())
            .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.attributes().is_some()),
            Err(SdkError::ServiceError(ref svc))
                if svc.err().is_conditional_check_failed_exception() =>
            {
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes the row for `endpoint` regardless of its owner
    ///
    /// # Errors
    ///
    /// Returns `PushSubscriptionStorageError` if the Dynamo DB operation fails
    pub async fn delete(&self, endpoint: &str) -> PushSubscriptionStorageResult<()> {
        self.dynamodb_client
            .delete_item()
            .table_name(&self.table_name)
            .key(
                PushSubscriptionAttribute::Endpoint.to_string(),
                AttributeValue::S(endpoint.to_string()),
            )
            .send()
            .await?;

        Ok(())
    }

    /// Deletes every subscription of a user
    ///
    /// # Returns
    ///
    /// The number of rows deleted
    ///
    /// # Errors
    ///
    /// Returns `PushSubscriptionStorageError` if any Dynamo DB operation fails
    pub async fn delete_all_for_user(&self, user_id: &str) -> PushSubscriptionStorageResult<usize> {
        let subscriptions = self.get_all_by_user(user_id).await?;
        let mut deleted = 0;

        for subscription in &subscriptions {
            if self.delete_for_user(user_id, &subscription.endpoint).await? {
                deleted += 1;
            }
        }

        Ok(deleted)
    }
}

#[async_trait]
impl SubscriptionRegistry for PushSubscriptionStorage {
    async fn save(&self, subscription: &PushSubscription) -> StorageResult<()> {
        Ok(self.upsert(subscription).await?)
    }

    async fn remove(&self, user_id: &str, endpoint: &str) -> StorageResult<bool> {
        Ok(self.delete_for_user(user_id, endpoint).await?)
    }
}

#[async_trait]
impl SubscriptionStore for PushSubscriptionStorage {
    async fn find_by_users(&self, user_ids: &[String]) -> StorageResult<Vec<PushSubscription>> {
        let per_user =
            try_join_all(user_ids.iter().map(|user_id| self.get_all_by_user(user_id))).await?;

        Ok(per_user.into_iter().flatten().collect())
    }

    async fn remove_endpoint(&self, endpoint: &str) -> StorageResult<()> {
        Ok(self.delete(endpoint).await?)
    }

    async fn remove_all_for_user(&self, user_id: &str) -> StorageResult<usize> {
        Ok(self.delete_all_for_user(user_id).await?)
    }
}
