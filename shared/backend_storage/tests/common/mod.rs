#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType, Projection,
    ProjectionType, ScalarAttributeType,
};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use uuid::Uuid;

/// Test configuration for LocalStack
const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";
const TEST_REGION: &str = "us-east-1";

/// Name of the `user_id` index created on subscription test tables
pub const USER_INDEX_NAME: &str = "user_id-index";

/// Table that is deleted when the test finishes
pub struct TestTable {
    pub dynamodb_client: Arc<DynamoDbClient>,
    pub table_name: String,
}

impl Drop for TestTable {
    fn drop(&mut self) {
        let client = self.dynamodb_client.clone();
        let table = self.table_name.clone();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = client.delete_table().table_name(&table).send().await;
            });
        }
    }
}

pub async fn localstack_client() -> Arc<DynamoDbClient> {
    let credentials = Credentials::from_keys("test", "test", None);
    let config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(LOCALSTACK_ENDPOINT)
        .region(Region::new(TEST_REGION))
        .credentials_provider(credentials)
        .load()
        .await;

    Arc::new(DynamoDbClient::new(&config))
}

fn string_attribute(name: &str) -> AttributeDefinition {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .unwrap()
}

fn key(name: &str, key_type: KeyType) -> KeySchemaElement {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .unwrap()
}

/// Creates `user_subscriptions` shaped table: `endpoint` hash key, `user_id` index
pub async fn create_subscriptions_table() -> TestTable {
    let dynamodb_client = localstack_client().await;
    let table_name = format!("test-user-subscriptions-{}", Uuid::new_v4());

    dynamodb_client
        .create_table()
        .table_name(&table_name)
        .attribute_definitions(string_attribute("endpoint"))
        .attribute_definitions(string_attribute("user_id"))
        .key_schema(key("endpoint", KeyType::Hash))
        .global_secondary_indexes(
            GlobalSecondaryIndex::builder()
                .index_name(USER_INDEX_NAME)
                .key_schema(key("user_id", KeyType::Hash))
                .projection(
                    Projection::builder()
                        .projection_type(ProjectionType::All)
                        .build(),
                )
                .build()
                .unwrap(),
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await
        .expect("Failed to create subscriptions table");

    tokio::time::sleep(Duration::from_millis(100)).await;

    TestTable {
        dynamodb_client,
        table_name,
    }
}

/// Creates `notifications` shaped table: `receiver_id` hash key, `id` range key
pub async fn create_notifications_table() -> TestTable {
    let dynamodb_client = localstack_client().await;
    let table_name = format!("test-notifications-{}", Uuid::new_v4());

    dynamodb_client
        .create_table()
        .table_name(&table_name)
        .attribute_definitions(string_attribute("receiver_id"))
        .attribute_definitions(string_attribute("id"))
        .key_schema(key("receiver_id", KeyType::Hash))
        .key_schema(key("id", KeyType::Range))
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await
        .expect("Failed to create notifications table");

    tokio::time::sleep(Duration::from_millis(100)).await;

    TestTable {
        dynamodb_client,
        table_name,
    }
}
