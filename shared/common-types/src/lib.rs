//! Types shared by the backend, the storage layer and the push client.
//!
//! Everything in here is free of I/O: raw notification rows and their grouping,
//! the push payload contract understood by the background worker, the storage
//! traits the backend and client are written against, and the request/response
//! bodies of the HTTP API.

pub mod api;
pub mod display;
pub mod event;
pub mod grouping;
pub mod optimistic;
pub mod payload;
pub mod store;
pub mod subscription;

pub use event::{Actor, EventKind, NotificationEvent, NotificationRecord};
pub use grouping::{group_notifications, NotificationGroup};
pub use payload::{ClickTarget, PushPayload};
pub use subscription::PushSubscription;
