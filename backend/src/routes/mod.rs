mod account;
mod docs;
mod health;
mod notifications;
mod push;
mod subscriptions;

use aide::axum::{
    routing::{delete, get, post},
    ApiRouter,
};

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler())
        .api_route("/health", get(health::handler))
        .api_route("/api/send-push", post(push::send_push))
        .api_route("/api/push/public-key", get(push::public_key))
        .api_route(
            "/api/delete-account",
            post(account::delete_account).delete(account::delete_account),
        )
        .api_route(
            "/api/subscriptions",
            post(subscriptions::save_subscription).delete(subscriptions::remove_subscription),
        )
        .api_route("/api/notifications", post(notifications::record_event))
        .api_route(
            "/api/notifications/{user_id}",
            get(notifications::list_notifications).delete(notifications::clear_notifications),
        )
        .api_route(
            "/api/notifications/{user_id}/read",
            post(notifications::mark_read),
        )
        .api_route(
            "/api/notifications/{user_id}/{id}",
            delete(notifications::delete_notification),
        )
}
