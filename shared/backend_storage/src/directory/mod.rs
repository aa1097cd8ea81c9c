//! Read-only access to the `profiles` and `cards` tables
//!
//! The notification feed joins each row with its actor's profile and its card's
//! title. Both lookups are `BatchGetItem` calls over the distinct ids referenced
//! by the feed; ids that have no row are simply absent from the result.

mod error;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    types::{AttributeValue, KeysAndAttributes},
    Client as DynamoDbClient,
};
use common_types::store::{Profile, ProfileDirectory, StorageResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use strum::Display;
use tracing::warn;

pub use error::{DirectoryStorageError, DirectoryStorageResult};

/// Maximum number of keys per `BatchGetItem` call
const BATCH_GET_LIMIT: usize = 100;

/// Attempts made for a batch before giving up on unprocessed keys
const BATCH_GET_ATTEMPTS: usize = 5;

/// Attribute names shared by the profiles and cards tables
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DirectoryAttribute {
    /// Row id (Primary Key of both tables)
    Id,
    /// Profile display name
    Username,
    /// Profile avatar
    AvatarUrl,
    /// Card title
    Title,
}

#[derive(Debug, Deserialize)]
struct CardRow {
    id: String,
    title: String,
}

/// Directory client for Dynamo DB lookups
pub struct DirectoryStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    profiles_table_name: String,
    cards_table_name: String,
}

impl DirectoryStorage {
    /// Creates a new directory client
    #[must_use]
    pub const fn new(
        dynamodb_client: Arc<DynamoDbClient>,
        profiles_table_name: String,
        cards_table_name: String,
    ) -> Self {
        Self {
            dynamodb_client,
            profiles_table_name,
            cards_table_name,
        }
    }

    /// Fetches the rows of `table_name` whose id is in `ids`
    ///
    /// # Errors
    ///
    /// Returns `DirectoryStorageError` if a Dynamo DB call fails, a batch keeps
    /// unprocessed keys after every retry, or an item cannot be parsed
    pub async fn batch_get<T: DeserializeOwned>(
        &self,
        table_name: &str,
        ids: &[String],
    ) -> DirectoryStorageResult<Vec<T>> {
        let mut unique: Vec<&String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        let mut rows = Vec::with_capacity(unique.len());

        for chunk in unique.chunks(BATCH_GET_LIMIT) {
            let keys = chunk
                .iter()
                .map(|id| {
                    HashMap::from([(
                        DirectoryAttribute::Id.to_string(),
                        AttributeValue::S((*id).clone()),
                    )])
                })
                .collect();

            let mut pending = HashMap::from([(
                table_name.to_string(),
                KeysAndAttributes::builder().set_keys(Some(keys)).build()?,
            )]);

            for attempt in 1..=BATCH_GET_ATTEMPTS {
                let output = self
                    .dynamodb_client
                    .batch_get_item()
                    .set_request_items(Some(pending))
                    .send()
                    .await?;

                if let Some(items) = output.responses().and_then(|r| r.get(table_name)) {
                    for item in items {
                        let row = serde_dynamo::from_item(item.clone())
                            .map_err(|e| DirectoryStorageError::ParseItemError(e.to_string()))?;
                        rows.push(row);
                    }
                }

                pending = output
                    .unprocessed_keys()
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|(_, keys)| !keys.keys().is_empty())
                    .collect();

                if pending.is_empty() {
                    break;
                }

                if attempt == BATCH_GET_ATTEMPTS {
                    warn!(table_name, "Batch get left unprocessed keys after retries");
                    return Err(DirectoryStorageError::UnprocessedKeys(
                        table_name.to_string(),
                    ));
                }
            }
        }

        Ok(rows)
    }
}

#[async_trait]
impl ProfileDirectory for DirectoryStorage {
    async fn profiles(&self, ids: &[String]) -> StorageResult<HashMap<String, Profile>> {
        let profiles: Vec<Profile> = self.batch_get(&self.profiles_table_name, ids).await?;

        Ok(profiles
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect())
    }

    async fn card_titles(&self, ids: &[String]) -> StorageResult<HashMap<String, String>> {
        let cards: Vec<CardRow> = self.batch_get(&self.cards_table_name, ids).await?;

        Ok(cards.into_iter().map(|card| (card.id, card.title)).collect())
    }
}
