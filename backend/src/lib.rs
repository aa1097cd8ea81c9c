//! Roadmap notifications backend
//!
//! Stores browser push subscriptions and activity notifications, delivers Web
//! Push messages, and deletes accounts together with their data.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Account deletion cascade and the auth admin client
pub mod account;

/// Fan-out of push messages to stored subscriptions
pub mod push_dispatcher;

/// HTTP routes
pub mod routes;

/// Server setup
pub mod server;

/// Services shared across handlers
pub mod state;

/// Environment, errors and extractors
pub mod types;

/// Web Push delivery
pub mod web_push;
