use axum::{extract::Path, http::StatusCode, Extension, Json};
use common_types::api::{
    ClearNotificationsResponse, FeedEntry, MarkReadRequest, MarkReadResponse, NotificationFeed,
    RecordEventRequest,
};
use common_types::display::{describe_event, push_title};
use common_types::event::referenced_ids;
use common_types::grouping::unread_count;
use common_types::store::{DynNotificationStore, DynProfileDirectory};
use common_types::{
    group_notifications, Actor, NotificationEvent, NotificationRecord, PushPayload,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::push_dispatcher::PushNotifier;
use crate::types::{AppError, ValidatedJson};

/// Page the push message for a new notification opens
const NOTIFICATIONS_PAGE: &str = "/notifications";

/// Path of a single notification
#[derive(Debug, Deserialize, JsonSchema)]
pub struct NotificationPath {
    /// Owner of the notification
    pub user_id: String,
    /// Notification id
    pub id: String,
}

/// Record an activity notification
///
/// Stores an unread row for the receiver. Unless the receiver caused the event
/// themselves, a push message describing it is sent in the background; the
/// response does not wait for it and never reflects its outcome.
///
/// # Returns
///
/// `201 CREATED` with the stored row
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Missing receiver
/// - `500 INTERNAL_SERVER_ERROR` - Storage failure
#[instrument(skip_all, fields(kind = %payload.kind, receiver_id = %payload.receiver_id))]
pub async fn record_event(
    Extension(notifications): Extension<DynNotificationStore>,
    Extension(directory): Extension<DynProfileDirectory>,
    Extension(notifier): Extension<PushNotifier>,
    ValidatedJson(payload): ValidatedJson<RecordEventRequest>,
) -> Result<(StatusCode, Json<NotificationRecord>), AppError> {
    let record = NotificationRecord::new(
        payload.kind,
        payload.actor_id,
        payload.receiver_id,
        payload.card_id,
    );
    notifications.insert(&record).await?;

    if record.actor_id.as_deref() != Some(record.receiver_id.as_str()) {
        let body = describe_record(&directory, &record).await;
        notifier.notify_detached(
            vec![record.receiver_id.clone()],
            PushPayload::new(
                push_title(&record.kind),
                body,
                Some(NOTIFICATIONS_PAGE.to_string()),
            ),
        );
    }

    Ok((StatusCode::CREATED, Json(record)))
}

/// Push body for a single row; lookup failures fall back to an anonymous text
async fn describe_record(directory: &DynProfileDirectory, record: &NotificationRecord) -> String {
    let actor_ids: Vec<String> = record.actor_id.iter().cloned().collect();
    let card_ids: Vec<String> = record.card_id.iter().cloned().collect();

    let (profiles, titles) = match tokio::try_join!(
        directory.profiles(&actor_ids),
        directory.card_titles(&card_ids)
    ) {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, "Directory lookup for push body failed");
            Default::default()
        }
    };

    let actor = record.actor_id.as_ref().map(|actor_id| {
        profiles
            .get(actor_id)
            .map_or_else(|| Actor::anonymous(actor_id.clone()), Actor::from)
    });
    let card_title = record.card_id.as_ref().and_then(|card_id| titles.get(card_id));

    describe_event(&record.kind, actor.as_ref(), card_title.map(String::as_str))
}

/// List a user's notifications, grouped
///
/// Joins every row of the user with actor profiles and card titles, then folds
/// them into display groups ordered newest first. Missing profiles and cards
/// degrade to anonymous text instead of failing.
///
/// # Errors
///
/// - `500 INTERNAL_SERVER_ERROR` - Storage failure
#[instrument(skip(notifications, directory))]
pub async fn list_notifications(
    Path(user_id): Path<String>,
    Extension(notifications): Extension<DynNotificationStore>,
    Extension(directory): Extension<DynProfileDirectory>,
) -> Result<Json<NotificationFeed>, AppError> {
    let records = notifications.list_for_receiver(&user_id).await?;
    if records.is_empty() {
        return Ok(Json(NotificationFeed::default()));
    }

    let (actor_ids, card_ids) = referenced_ids(&records);
    let (profiles, titles) = tokio::try_join!(
        directory.profiles(&actor_ids),
        directory.card_titles(&card_ids)
    )?;

    let events = NotificationEvent::hydrate(records, &profiles, &titles);
    let groups = group_notifications(&events);

    Ok(Json(NotificationFeed {
        groups: groups.into_iter().map(FeedEntry::from).collect(),
        unread_count: unread_count(&events),
    }))
}

/// Mark notifications read
///
/// Marks the listed rows read, or every unread row of the user when `ids` is
/// absent. Ids that do not belong to the user are ignored.
///
/// # Returns
///
/// `200 OK` with the number of rows updated
///
/// # Errors
///
/// - `500 INTERNAL_SERVER_ERROR` - Storage failure
#[instrument(skip(notifications, payload))]
pub async fn mark_read(
    Path(user_id): Path<String>,
    Extension(notifications): Extension<DynNotificationStore>,
    ValidatedJson(payload): ValidatedJson<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, AppError> {
    let updated = match payload.ids {
        Some(ids) => notifications.mark_read(&user_id, &ids).await?,
        None => notifications.mark_all_read(&user_id).await?,
    };

    Ok(Json(MarkReadResponse { updated }))
}

/// Delete one notification
///
/// # Returns
///
/// `204 NO_CONTENT` on deletion
///
/// # Errors
///
/// - `404 NOT_FOUND` - The user has no notification with this id
/// - `500 INTERNAL_SERVER_ERROR` - Storage failure
#[instrument(skip(notifications))]
pub async fn delete_notification(
    Path(path): Path<NotificationPath>,
    Extension(notifications): Extension<DynNotificationStore>,
) -> Result<StatusCode, AppError> {
    if !notifications.delete(&path.user_id, &path.id).await? {
        return Err(AppError::new(
            StatusCode::NOT_FOUND,
            "not_found",
            "Notification not found",
            false,
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Delete every notification of a user
///
/// # Errors
///
/// - `500 INTERNAL_SERVER_ERROR` - Storage failure
#[instrument(skip(notifications))]
pub async fn clear_notifications(
    Path(user_id): Path<String>,
    Extension(notifications): Extension<DynNotificationStore>,
) -> Result<Json<ClearNotificationsResponse>, AppError> {
    let deleted = notifications.delete_all(&user_id).await?;

    Ok(Json(ClearNotificationsResponse { deleted }))
}
