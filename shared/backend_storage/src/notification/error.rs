//! Error types for notification storage operations

use aws_sdk_dynamodb::error::{BuildError, SdkError};
use aws_sdk_dynamodb::operation::{
    batch_write_item::BatchWriteItemError, delete_item::DeleteItemError, put_item::PutItemError,
    query::QueryError, update_item::UpdateItemError,
};
use common_types::store::StorageError;
use thiserror::Error;

/// Result type for notification storage operations
pub type NotificationStorageResult<T> = Result<T, NotificationStorageError>;

/// Errors that can occur during notification storage operations
#[derive(Error, Debug)]
pub enum NotificationStorageError {
    /// Failed to insert notification into Dynamo DB
    #[error("Failed to insert notification into DynamoDB: {0}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to delete notification from Dynamo DB
    #[error("Failed to delete notification from DynamoDB: {0}")]
    DynamoDbDeleteError(#[from] SdkError<DeleteItemError>),

    /// Failed to query notifications from Dynamo DB
    #[error("Failed to query notifications from DynamoDB: {0}")]
    DynamoDbQueryError(#[from] SdkError<QueryError>),

    /// Failed to update notification in Dynamo DB
    #[error("Failed to update notification in DynamoDB: {0}")]
    DynamoDbUpdateError(#[from] SdkError<UpdateItemError>),

    /// Failed to batch delete notifications from Dynamo DB
    #[error("Failed to batch delete notifications from DynamoDB: {0}")]
    DynamoDbBatchWriteError(#[from] SdkError<BatchWriteItemError>),

    /// Failed to build a Dynamo DB request
    #[error("Failed to build DynamoDB request: {0}")]
    RequestBuildError(#[from] BuildError),

    /// Batch delete still had unprocessed items after all retries
    #[error("{0} notifications were left unprocessed by batch delete")]
    UnprocessedItems(usize),

    /// Notification with the same id already exists
    #[error("Notification already exists")]
    NotificationExists,

    /// Serialization error for `serde_dynamo`
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Stored item could not be parsed
    #[error("Failed to parse notification: {0}")]
    ParseNotificationError(String),
}

impl From<NotificationStorageError> for StorageError {
    fn from(err: NotificationStorageError) -> Self {
        match err {
            NotificationStorageError::SerializationError(msg)
            | NotificationStorageError::ParseNotificationError(msg) => Self::Serialization(msg),
            other => Self::Unavailable(other.to_string()),
        }
    }
}
