//! Request and response bodies of the backend HTTP API

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::event::EventKind;
use crate::grouping::NotificationGroup;

/// Body of `POST /api/send-push`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_push_targets"))]
pub struct SendPushRequest {
    /// Notification title
    #[validate(
        required(message = "title is required"),
        length(min = 1, message = "title is required")
    )]
    pub title: Option<String>,
    /// Notification body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Page opened when the notification is clicked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Single target user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Several target users
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<String>>,
}

impl SendPushRequest {
    /// Target users: `userIds` when it names anyone, otherwise `userId`.
    /// Blank ids are dropped and duplicates collapsed, first occurrence wins.
    #[must_use]
    pub fn target_user_ids(&self) -> Vec<String> {
        let listed = self
            .user_ids
            .iter()
            .flatten()
            .filter(|id| !id.trim().is_empty());

        let candidates: Vec<&String> = if listed.clone().next().is_some() {
            listed.collect()
        } else {
            self.user_id
                .iter()
                .filter(|id| !id.trim().is_empty())
                .collect()
        };

        let mut targets: Vec<String> = Vec::with_capacity(candidates.len());
        for id in candidates {
            if !targets.contains(id) {
                targets.push(id.clone());
            }
        }
        targets
    }
}

fn validate_push_targets(request: &SendPushRequest) -> Result<(), ValidationError> {
    if request.target_user_ids().is_empty() {
        let mut error = ValidationError::new("missing_targets");
        error.message = Some(std::borrow::Cow::Borrowed("userId or userIds is required"));
        return Err(error);
    }
    Ok(())
}

/// Response of `POST /api/send-push`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SendPushResponse {
    /// Number of subscriptions the message was delivered to
    pub sent: usize,
}

/// Response of `GET /api/push/public-key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    /// Application server key browsers subscribe with, base64url
    pub public_key: String,
}

/// Body of `POST|DELETE /api/delete-account`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    #[validate(
        required(message = "userId is required"),
        length(min = 1, message = "userId is required")
    )]
    pub user_id: Option<String>,
}

/// Response of `POST|DELETE /api/delete-account`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeleteAccountResponse {
    pub success: bool,
}

/// Body of `POST /api/subscriptions`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveSubscriptionRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[validate(url(message = "endpoint must be a URL"))]
    pub endpoint: String,
    #[validate(length(min = 1, message = "p256dh is required"))]
    pub p256dh: String,
    #[validate(length(min = 1, message = "auth is required"))]
    pub auth: String,
}

/// Body of `DELETE /api/subscriptions`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveSubscriptionRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "endpoint is required"))]
    pub endpoint: String,
}

/// Body of `POST /api/notifications`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventRequest {
    /// Event type tag (`like`, `comment`, `comment_like`, `follow`)
    #[serde(rename = "type")]
    #[schemars(with = "String")]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    #[validate(length(min = 1, message = "receiverId is required"))]
    pub receiver_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
}

/// Body of `POST /api/notifications/{user_id}/read`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
pub struct MarkReadRequest {
    /// Rows to mark read; every unread row when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
}

/// Response of `POST /api/notifications/{user_id}/read`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MarkReadResponse {
    pub updated: usize,
}

/// Response of `DELETE /api/notifications/{user_id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClearNotificationsResponse {
    pub deleted: usize,
}

/// A notification group with its display text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FeedEntry {
    #[serde(flatten)]
    pub group: NotificationGroup,
    pub text: String,
}

impl From<NotificationGroup> for FeedEntry {
    fn from(group: NotificationGroup) -> Self {
        let text = group.text();
        Self { group, text }
    }
}

/// Response of `GET /api/notifications/{user_id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    pub groups: Vec<FeedEntry>,
    /// Unread rows across all groups
    pub unread_count: usize,
}
