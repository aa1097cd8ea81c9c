//! Notification storage integration using Dynamo DB
//!
//! Rows are partitioned by `receiver_id` and sorted by `id`, so every operation
//! the feed needs is a single-partition query or a keyed write.

mod error;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::SdkError,
    types::{AttributeValue, DeleteRequest, ReturnValue, WriteRequest},
    Client as DynamoDbClient,
};
use common_types::store::{NotificationStore, StorageResult};
use common_types::NotificationRecord;
use strum::Display;
use tracing::warn;

pub use error::{NotificationStorageError, NotificationStorageResult};

/// Maximum number of write requests per `BatchWriteItem` call
const BATCH_WRITE_LIMIT: usize = 25;

/// Attempts made for a batch before giving up on unprocessed items
const BATCH_WRITE_ATTEMPTS: usize = 5;

/// Attribute names for notifications table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationAttribute {
    /// Owner of the notification (Primary Key)
    ReceiverId,
    /// Notification id (Sort Key)
    Id,
    /// Event type tag
    Type,
    /// User who caused the event
    ActorId,
    /// Card the event refers to
    CardId,
    /// Creation timestamp (RFC 3339)
    CreatedAt,
    /// Read flag
    IsRead,
}

/// Notification storage client for Dynamo DB operations
pub struct NotificationStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
}

impl NotificationStorage {
    /// Creates a new notification storage client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured Dynamo DB client
    /// * `table_name` - Dynamo DB table name for notifications
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>, table_name: String) -> Self {
        Self {
            dynamodb_client,
            table_name,
        }
    }

    fn key(receiver_id: &str, id: &str) -> HashMap<String, AttributeValue> {
        HashMap::from([
            (
                NotificationAttribute::ReceiverId.to_string(),
                AttributeValue::S(receiver_id.to_string()),
            ),
            (
                NotificationAttribute::Id.to_string(),
                AttributeValue::S(id.to_string()),
            ),
        ])
    }

    /// Inserts a notification, failing if one with the same receiver and id exists
    ///
    /// # Errors
    ///
    /// Returns `NotificationStorageError::NotificationExists` on an id collision, or
    /// other `NotificationStorageError` if the Dynamo DB operation fails
    pub async fn insert(&self, record: &NotificationRecord) -> NotificationStorageResult<()> {
        let item = serde_dynamo::to_item(record)
            .map_err(|e| NotificationStorageError::SerializationError(e.to_string()))?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#pk) AND attribute_not_exists(#sk)")
            .expression_attribute_names("#pk", NotificationAttribute::ReceiverId.to_string())
            .expression_attribute_names("#sk", NotificationAttribute::Id.to_string())
            .send()
            .await
            .map_err(|err| {
                if matches!(
                    err,
                    SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed_exception()
                ) {
                    NotificationStorageError::NotificationExists
                } else {
                    err.into()
                }
            })?;

        Ok(())
    }

    /// Gets every notification of a receiver, optionally only the unread ones
    ///
    /// # Errors
    ///
    /// Returns `NotificationStorageError` if the Dynamo DB operation fails
    pub async fn list(
        &self,
        receiver_id: &str,
        unread_only: bool,
    ) -> NotificationStorageResult<Vec<NotificationRecord>> {
        let mut records = Vec::new();
        let mut exclusive_start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut query = self
                .dynamodb_client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#receiver_id = :receiver_id")
                .expression_attribute_names(
                    "#receiver_id",
                    NotificationAttribute::ReceiverId.to_string(),
                )
                .expression_attribute_values(
                    ":receiver_id",
                    AttributeValue::S(receiver_id.to_string()),
                )
                .set_exclusive_start_key(exclusive_start_key.take());

            if unread_only {
                query = query
                    .filter_expression("#is_read = :is_read")
                    .expression_attribute_names("#is_read", NotificationAttribute::IsRead.to_string())
                    .expression_attribute_values(":is_read", AttributeValue::Bool(false));
            }

            let response = query.send().await?;

            for item in response.items() {
                let record = serde_dynamo::from_item(item.clone()).map_err(|e| {
                    NotificationStorageError::ParseNotificationError(e.to_string())
                })?;
                records.push(record);
            }

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(records)
    }

    /// Marks one notification read
    ///
    /// # Returns
    ///
    /// `false` if the notification does not exist
    ///
    /// # Errors
    ///
    /// Returns `NotificationStorageError` if the Dynamo DB operation fails
    pub async fn set_read(&self, receiver_id: &str, id: &str) -> NotificationStorageResult<bool> {
        let result = self
            .dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(receiver_id, id)))
            .update_expression("SET #is_read = :is_read")
            .condition_expression("attribute_exists(#sk)")
            .expression_attribute_names("#is_read", NotificationAttribute::IsRead.to_string())
            .expression_attribute_names("#sk", NotificationAttribute::Id.to_string())
            .expression_attribute_values(":is_read", AttributeValue::Bool(true))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(ref svc))
                if svc.err().is_conditional_check_failed_exception() =>
            {
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes one notification
    ///
    /// # Returns
    ///
    /// `true` if the notification existed
    ///
    /// # Errors
    ///
    /// Returns `NotificationStorageError` if the Dynamo DB operation fails
    pub async fn delete_one(&self, receiver_id: &str, id: &str) -> NotificationStorageResult<bool> {
        let output = self
            .dynamodb_client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(receiver_id, id)))
            .return_values(ReturnValue::AllOld)
            .send()
            .await?;

        Ok(output.attributes().is_some())
    }

    /// Deletes every notification of a receiver using batched writes
    ///
    /// # Returns
    ///
    /// The number of rows deleted
    ///
    /// # Errors
    ///
    /// Returns `NotificationStorageError` if a Dynamo DB operation fails or a batch
    /// keeps unprocessed items after every retry
    pub async fn delete_all_for_receiver(
        &self,
        receiver_id: &str,
    ) -> NotificationStorageResult<usize> {
        let records = self.list(receiver_id, false).await?;

        for chunk in records.chunks(BATCH_WRITE_LIMIT) {
            let requests = chunk
                .iter()
                .map(|record| -> NotificationStorageResult<WriteRequest> {
                    let delete = DeleteRequest::builder()
                        .set_key(Some(Self::key(receiver_id, &record.id)))
                        .build()?;
                    Ok(WriteRequest::builder().delete_request(delete).build())
                })
                .collect::<NotificationStorageResult<Vec<WriteRequest>>>()?;

            self.batch_delete(requests).await?;
        }

        Ok(records.len())
    }

    async fn batch_delete(&self, requests: Vec<WriteRequest>) -> NotificationStorageResult<()> {
        let mut pending = HashMap::from([(self.table_name.clone(), requests)]);

        for attempt in 1..=BATCH_WRITE_ATTEMPTS {
            let output = self
                .dynamodb_client
                .batch_write_item()
                .set_request_items(Some(pending))
                .send()
                .await?;

            pending = output
                .unprocessed_items()
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter(|(_, requests)| !requests.is_empty())
                .collect();

            if pending.is_empty() {
                return Ok(());
            }

            warn!(
                attempt,
                unprocessed = pending.values().map(Vec::len).sum::<usize>(),
                "Batch delete left unprocessed notifications, retrying"
            );
        }

        Err(NotificationStorageError::UnprocessedItems(
            pending.values().map(Vec::len).sum(),
        ))
    }
}

#[async_trait]
impl NotificationStore for NotificationStorage {
    async fn insert(&self, record: &NotificationRecord) -> StorageResult<()> {
        Ok(Self::insert(self, record).await?)
    }

    async fn list_for_receiver(&self, receiver_id: &str) -> StorageResult<Vec<NotificationRecord>> {
        Ok(self.list(receiver_id, false).await?)
    }

    async fn mark_read(&self, receiver_id: &str, ids: &[String]) -> StorageResult<usize> {
        let mut updated = 0;
        for id in ids {
            if self.set_read(receiver_id, id).await? {
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn mark_all_read(&self, receiver_id: &str) -> StorageResult<usize> {
        let unread = self.list(receiver_id, true).await?;
        let mut updated = 0;
        for record in &unread {
            if self.set_read(receiver_id, &record.id).await? {
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete(&self, receiver_id: &str, id: &str) -> StorageResult<bool> {
        Ok(self.delete_one(receiver_id, id).await?)
    }

    async fn delete_all(&self, receiver_id: &str) -> StorageResult<usize> {
        Ok(self.delete_all_for_receiver(receiver_id).await?)
    }
}
