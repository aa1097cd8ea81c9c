use std::sync::Arc;

use axum::{Extension, Json};
use common_types::api::{PublicKeyResponse, SendPushRequest, SendPushResponse};
use common_types::PushPayload;
use tracing::instrument;

use crate::push_dispatcher::{DispatchError, PushDispatcher};
use crate::types::{AppError, ValidatedJson};

/// Send a push notification to one or more users
///
/// Delivers the message to every stored subscription of the target users.
/// Targets come from `userIds` when it names anyone, otherwise from `userId`.
/// Subscriptions the push service reports as gone are deleted.
///
/// # Returns
///
/// `200 OK` with the number of subscriptions the message was delivered to. Failed
/// deliveries lower the count but do not fail the request.
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Missing title or target users
/// - `500 INTERNAL_SERVER_ERROR` - Push signing keys are not configured or the
///   subscription lookup failed
#[instrument(skip(dispatcher, payload))]
pub async fn send_push(
    Extension(dispatcher): Extension<Arc<PushDispatcher>>,
    ValidatedJson(payload): ValidatedJson<SendPushRequest>,
) -> Result<Json<SendPushResponse>, AppError> {
    let targets = payload.target_user_ids();
    let message = PushPayload::new(
        payload.title.unwrap_or_default(),
        payload.body.unwrap_or_default(),
        payload.url,
    );

    let report = dispatcher.dispatch(&targets, &message).await?;

    Ok(Json(SendPushResponse { sent: report.sent }))
}

/// Application server key for browser subscriptions
///
/// Clients pass this key to the push manager when subscribing, so every
/// subscription they create can be signed for by this server.
///
/// # Errors
///
/// - `500 INTERNAL_SERVER_ERROR` - Push signing keys are not configured
pub async fn public_key(
    Extension(dispatcher): Extension<Arc<PushDispatcher>>,
) -> Result<Json<PublicKeyResponse>, AppError> {
    let public_key = dispatcher
        .application_server_key()
        .ok_or(DispatchError::NotConfigured)?;

    Ok(Json(PublicKeyResponse {
        public_key: public_key.to_string(),
    }))
}
