//! Error types for push subscription storage operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{
    delete_item::DeleteItemError, get_item::GetItemError, put_item::PutItemError, query::QueryError,
};
use common_types::store::StorageError;
use thiserror::Error;

/// Result type for push subscription storage operations
pub type PushSubscriptionStorageResult<T> = Result<T, PushSubscriptionStorageError>;

/// Errors that can occur during push subscription storage operations
#[derive(Error, Debug)]
pub enum PushSubscriptionStorageError {
    /// Failed to put subscription into Dynamo DB
    #[error("Failed to store push subscription in DynamoDB: {0}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to delete subscription from Dynamo DB
    #[error("Failed to delete push subscription from DynamoDB: {0}")]
    DynamoDbDeleteError(#[from] SdkError<DeleteItemError>),

    /// Failed to get subscription from Dynamo DB
    #[error("Failed to get push subscription from DynamoDB: {0}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to query subscriptions from Dynamo DB
    #[error("Failed to query push subscriptions from DynamoDB: {0}")]
    DynamoDbQueryError(#[from] SdkError<QueryError>),

    /// Serialization error for `serde_dynamo`
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Stored item could not be parsed
    #[error("Failed to parse push subscription: {0}")]
    ParseSubscriptionError(String),
}

impl From<PushSubscriptionStorageError> for StorageError {
    fn from(err: PushSubscriptionStorageError) -> Self {
        match err {
            PushSubscriptionStorageError::SerializationError(msg)
            | PushSubscriptionStorageError::ParseSubscriptionError(msg) => Self::Serialization(msg),
            other => Self::Unavailable(other.to_string()),
        }
    }
}
