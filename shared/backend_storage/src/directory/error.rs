use aws_sdk_dynamodb::error::{BuildError, SdkError};
use aws_sdk_dynamodb::operation::batch_get_item::BatchGetItemError;
use common_types::store::StorageError;
use thiserror::Error;

/// Result type for directory lookups
pub type DirectoryStorageResult<T> = Result<T, DirectoryStorageError>;

/// Errors that can occur while reading profiles and cards
#[derive(Error, Debug)]
pub enum DirectoryStorageError {
    /// Failed to batch get items from Dynamo DB
    #[error("Failed to batch get items from DynamoDB: {0}")]
    DynamoDbBatchGetError(#[from] SdkError<BatchGetItemError>),

    /// Failed to build a Dynamo DB request
    #[error("Failed to build DynamoDB request: {0}")]
    RequestBuildError(#[from] BuildError),

    /// Batch get still had unprocessed keys after all retries
    #[error("Unprocessed keys remain for table {0}")]
    UnprocessedKeys(String),

    /// Stored item could not be parsed
    #[error("Failed to parse directory item: {0}")]
    ParseItemError(String),
}

impl From<DirectoryStorageError> for StorageError {
    fn from(err: DirectoryStorageError) -> Self {
        match err {
            DirectoryStorageError::ParseItemError(msg) => Self::Serialization(msg),
            other => Self::Unavailable(other.to_string()),
        }
    }
}
