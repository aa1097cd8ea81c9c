use std::sync::Arc;

use axum::{Extension, Json};
use common_types::api::{DeleteAccountRequest, DeleteAccountResponse};
use tracing::instrument;

use crate::account::AccountService;
use crate::types::{AppError, ValidatedJson};

/// Delete a user account
///
/// Removes the user's push subscriptions and notifications, then deletes the
/// user at the auth provider. Accepts both `POST` and `DELETE`.
///
/// # Errors
///
/// - `400 BAD_REQUEST` - `userId` is missing
/// - `500 INTERNAL_SERVER_ERROR` - Auth admin credentials are not configured or
///   the deletion failed
#[instrument(skip(accounts, payload))]
pub async fn delete_account(
    Extension(accounts): Extension<Arc<AccountService>>,
    ValidatedJson(payload): ValidatedJson<DeleteAccountRequest>,
) -> Result<Json<DeleteAccountResponse>, AppError> {
    let Some(user_id) = payload.user_id else {
        return Err(AppError::validation("userId is required"));
    };

    accounts.delete_account(&user_id).await?;

    Ok(Json(DeleteAccountResponse { success: true }))
}
