use axum::{http::StatusCode, Extension};
use common_types::api::{RemoveSubscriptionRequest, SaveSubscriptionRequest};
use common_types::store::DynSubscriptionStore;
use common_types::PushSubscription;
use tracing::{info, instrument};

use crate::types::{AppError, ValidatedJson};

/// Store a browser push subscription
///
/// The endpoint identifies one browser installation: any row already stored for
/// it is replaced, whichever user it belonged to. Saving the same subscription
/// twice leaves a single row.
///
/// # Returns
///
/// `201 CREATED` once the row is stored
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Missing field or endpoint is not a URL
/// - `500 INTERNAL_SERVER_ERROR` - Storage failure
#[instrument(skip(store, payload), fields(user_id = %payload.user_id))]
pub async fn save_subscription(
    Extension(store): Extension<DynSubscriptionStore>,
    ValidatedJson(payload): ValidatedJson<SaveSubscriptionRequest>,
) -> Result<StatusCode, AppError> {
    store
        .save(&PushSubscription {
            user_id: payload.user_id,
            endpoint: payload.endpoint,
            p256dh: payload.p256dh,
            auth: payload.auth,
        })
        .await?;

    Ok(StatusCode::CREATED)
}

/// Remove a browser push subscription
///
/// Deletes the row for `endpoint` only if it belongs to `userId`. Removing a
/// subscription that does not exist is not an error.
///
/// # Returns
///
/// `204 NO_CONTENT`
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Missing field
/// - `500 INTERNAL_SERVER_ERROR` - Storage failure
#[instrument(skip(store, payload), fields(user_id = %payload.user_id))]
pub async fn remove_subscription(
    Extension(store): Extension<DynSubscriptionStore>,
    ValidatedJson(payload): ValidatedJson<RemoveSubscriptionRequest>,
) -> Result<StatusCode, AppError> {
    let removed = store.remove(&payload.user_id, &payload.endpoint).await?;
    if !removed {
        info!("No subscription owned by user for endpoint");
    }

    Ok(StatusCode::NO_CONTENT)
}
