//! Raw notification rows and the actor/card join used before grouping

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Profile;

/// Kind of activity a notification row records
///
/// Stored and transferred as its lowercase string tag. Tags this build does not
/// know are kept verbatim in [`EventKind::Unknown`] instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// Someone liked one of the receiver's roadmap cards
    Like,
    /// Someone commented on one of the receiver's roadmap cards
    Comment,
    /// Someone liked a comment the receiver wrote
    CommentLike,
    /// Someone started following the receiver
    Follow,
    /// Any other tag
    Unknown(String),
}

impl EventKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::CommentLike => "comment_like",
            Self::Follow => "follow",
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<String> for EventKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "like" => Self::Like,
            "comment" => Self::Comment,
            "comment_like" => Self::CommentLike,
            "follow" => Self::Follow,
            _ => Self::Unknown(tag),
        }
    }
}

impl From<&str> for EventKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Unknown(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the `notifications` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationRecord {
    /// Row id
    pub id: String,
    /// Event type tag
    #[serde(rename = "type")]
    #[schemars(with = "String")]
    pub kind: EventKind,
    /// User who caused the event, absent for system generated rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Owner of the row
    pub receiver_id: String,
    /// Roadmap card the event is about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    #[schemars(with = "String")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

impl NotificationRecord {
    /// Creates an unread row stamped with the current time and a fresh id
    #[must_use]
    pub fn new(
        kind: EventKind,
        actor_id: Option<String>,
        receiver_id: String,
        card_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            actor_id,
            receiver_id,
            card_id,
            created_at: Utc::now(),
            is_read: false,
        }
    }
}

/// Public profile fields of the user behind an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Actor {
    /// Actor known only by id, used when the profile row is missing
    #[must_use]
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            avatar_url: None,
        }
    }
}

impl From<&Profile> for Actor {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            username: Some(profile.username.clone()),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}

/// A notification row joined with its actor profile and card title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub id: String,
    pub kind: EventKind,
    pub actor: Option<Actor>,
    pub card_id: Option<String>,
    pub card_title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl NotificationEvent {
    /// Joins raw rows with the profiles and card titles looked up for them.
    ///
    /// Rows whose actor has no profile keep an id-only [`Actor`]; rows without an
    /// actor id have no actor at all.
    #[must_use]
    pub fn hydrate(
        records: Vec<NotificationRecord>,
        profiles: &HashMap<String, Profile>,
        card_titles: &HashMap<String, String>,
    ) -> Vec<Self> {
        records
            .into_iter()
            .map(|record| {
                let actor = record.actor_id.map(|actor_id| {
                    profiles
                        .get(&actor_id)
                        .map_or_else(|| Actor::anonymous(actor_id.clone()), Actor::from)
                });
                let card_title = record
                    .card_id
                    .as_ref()
                    .and_then(|card_id| card_titles.get(card_id).cloned());

                Self {
                    id: record.id,
                    kind: record.kind,
                    actor,
                    card_id: record.card_id,
                    card_title,
                    created_at: record.created_at,
                    is_read: record.is_read,
                }
            })
            .collect()
    }
}

/// Collects the distinct actor and card ids referenced by `records`, in first-seen order
#[must_use]
pub fn referenced_ids(records: &[NotificationRecord]) -> (Vec<String>, Vec<String>) {
    let mut actor_ids: Vec<String> = Vec::new();
    let mut card_ids: Vec<String> = Vec::new();

    for record in records {
        if let Some(actor_id) = &record.actor_id {
            if !actor_ids.contains(actor_id) {
                actor_ids.push(actor_id.clone());
            }
        }
        if let Some(card_id) = &record.card_id {
            if !card_ids.contains(card_id) {
                card_ids.push(card_id.clone());
            }
        }
    }

    (actor_ids, card_ids)
}
