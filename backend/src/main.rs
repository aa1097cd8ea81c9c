use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use backend::{
    account::{AccountDeleter, AuthAdminClient},
    server,
    state::Services,
    types::Environment,
    web_push::{PushSender, WebPushSender},
};
use backend_storage::{
    directory::DirectoryStorage, notification::NotificationStorage,
    push_subscription::PushSubscriptionStorage,
};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // Configure logging format based on environment
    // Use JSON format for staging/production (Datadog), regular format for development
    match environment {
        Environment::Production | Environment::Staging => {
            fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
        }
        Environment::Development { .. } => {
            fmt().with_env_filter(EnvFilter::from_default_env()).init();
        }
    }

    let dynamodb_client = Arc::new(DynamoDbClient::from_conf(
        environment.dynamodb_client_config().await,
    ));

    let subscriptions = Arc::new(PushSubscriptionStorage::new(
        dynamodb_client.clone(),
        environment.subscriptions_table_name(),
        environment.subscriptions_user_index_name(),
    ));
    let notifications = Arc::new(NotificationStorage::new(
        dynamodb_client.clone(),
        environment.notifications_table_name(),
    ));
    let directory = Arc::new(DirectoryStorage::new(
        dynamodb_client,
        environment.profiles_table_name(),
        environment.cards_table_name(),
    ));

    let sender: Option<Arc<dyn PushSender>> = match environment.vapid_config() {
        Some(config) => match WebPushSender::new(
            &config,
            environment.push_ttl_secs(),
            environment.http_client_timeout(),
        ) {
            Ok(sender) => Some(Arc::new(sender)),
            Err(e) => {
                tracing::error!(error = %e, "Invalid push signing keys, push disabled");
                None
            }
        },
        None => {
            tracing::warn!("Push signing keys not set, push disabled");
            None
        }
    };

    let deleter: Option<Arc<dyn AccountDeleter>> = match environment.auth_admin_config() {
        Some(config) => Some(Arc::new(AuthAdminClient::new(
            config,
            environment.http_client_timeout(),
        )?)),
        None => {
            tracing::warn!("Auth admin credentials not set, account deletion disabled");
            None
        }
    };

    let services = Services::new(subscriptions, notifications, directory, sender, deleter);

    server::start(environment, services).await
}
