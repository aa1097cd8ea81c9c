//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};

use crate::account::AuthAdminConfig;
use crate::web_push::VapidConfig;

/// Default lifetime of a push message at the push service: 24 hours
const DEFAULT_PUSH_TTL_SECS: u32 = 24 * 60 * 60;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development {
        /// Optional override for the push message TTL in seconds
        push_ttl_override: Option<u32>,
    },
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => {
                let push_ttl_override = env::var("PUSH_TTL_SECS")
                    .ok()
                    .and_then(|val| val.parse::<u32>().ok());

                Self::Development { push_ttl_override }
            }
            _ => panic!("Invalid environment: {env}"),
        }
    }

    fn table_name(&self, var: &str, development_default: &str) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var(var).unwrap_or_else(|_| panic!("{var} environment variable is not set"))
            }
            Self::Development { .. } => {
                env::var(var).unwrap_or_else(|_| development_default.to_string())
            }
        }
    }

    /// Dynamo DB table holding push subscriptions
    ///
    /// # Panics
    ///
    /// Panics outside development if `SUBSCRIPTIONS_TABLE_NAME` is not set
    #[must_use]
    pub fn subscriptions_table_name(&self) -> String {
        self.table_name("SUBSCRIPTIONS_TABLE_NAME", "user_subscriptions")
    }

    /// Global secondary index on `user_id` of the subscriptions table
    ///
    /// # Panics
    ///
    /// Panics outside development if `SUBSCRIPTIONS_USER_INDEX_NAME` is not set
    #[must_use]
    pub fn subscriptions_user_index_name(&self) -> String {
        self.table_name("SUBSCRIPTIONS_USER_INDEX_NAME", "user_id-index")
    }

    /// Dynamo DB table holding notification rows
    ///
    /// # Panics
    ///
    /// Panics outside development if `NOTIFICATIONS_TABLE_NAME` is not set
    #[must_use]
    pub fn notifications_table_name(&self) -> String {
        self.table_name("NOTIFICATIONS_TABLE_NAME", "notifications")
    }

    /// Dynamo DB table holding public profiles
    ///
    /// # Panics
    ///
    /// Panics outside development if `PROFILES_TABLE_NAME` is not set
    #[must_use]
    pub fn profiles_table_name(&self) -> String {
        self.table_name("PROFILES_TABLE_NAME", "profiles")
    }

    /// Dynamo DB table holding roadmap cards
    ///
    /// # Panics
    ///
    /// Panics outside development if `CARDS_TABLE_NAME` is not set
    #[must_use]
    pub fn cards_table_name(&self) -> String {
        self.table_name("CARDS_TABLE_NAME", "cards")
    }

    /// Push signing configuration, `None` when any of the three variables is missing
    ///
    /// The dispatcher refuses to run without it, so its absence surfaces as a
    /// server error on the send path rather than at startup.
    #[must_use]
    pub fn vapid_config(&self) -> Option<VapidConfig> {
        let subject = non_empty_var("VAPID_SUBJECT")?;
        let public_key = non_empty_var("VAPID_PUBLIC_KEY")?;
        let private_key = non_empty_var("VAPID_PRIVATE_KEY")?;

        Some(VapidConfig {
            subject,
            public_key,
            private_key,
        })
    }

    /// Auth admin API configuration, `None` when either variable is missing
    #[must_use]
    pub fn auth_admin_config(&self) -> Option<AuthAdminConfig> {
        Some(AuthAdminConfig {
            base_url: non_empty_var("AUTH_ADMIN_URL")?,
            service_role_key: non_empty_var("AUTH_SERVICE_ROLE_KEY")?,
        })
    }

    /// Lifetime of a push message at the push service, in seconds
    #[must_use]
    pub fn push_ttl_secs(&self) -> u32 {
        match self {
            Self::Production | Self::Staging => DEFAULT_PUSH_TTL_SECS,
            Self::Development { push_ttl_override } => {
                push_ttl_override.unwrap_or(DEFAULT_PUSH_TTL_SECS)
            }
        }
    }

    /// Timeout for outbound calls to push services and the auth admin API
    #[must_use]
    pub const fn http_client_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development { .. } | Self::Staging)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development { .. } => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// AWS Dynamo DB service configuration
    pub async fn dynamodb_client_config(&self) -> aws_sdk_dynamodb::Config {
        let aws_config = self.aws_config().await;
        (&aws_config).into()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
