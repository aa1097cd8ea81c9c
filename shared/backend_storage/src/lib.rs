//! Backend storage services for the roadmap notification backend
//!
//! DynamoDB implementations of the storage traits in `common_types::store`:
//! push subscriptions, notification rows and the profile/card directory used to
//! hydrate the notification feed.

pub mod directory;
pub mod notification;
pub mod push_subscription;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
