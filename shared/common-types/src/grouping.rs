//! Notification grouping
//!
//! Turns joined notification rows into display groups. Every follow lands in a
//! single group; every other kind is grouped per `(kind, card)` pair. Within a
//! group the actor list holds each actor once, most recent first, and the group
//! stays unread until every member row is read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::display::describe_group;
use crate::event::{Actor, EventKind, NotificationEvent};

/// Key shared by all follow events
pub const FOLLOW_GROUP_KEY: &str = "follow";

/// Card segment used in keys of events that have no card
pub const NO_CARD: &str = "no-card";

/// Computes the grouping key of an event
#[must_use]
pub fn group_key(kind: &EventKind, card_id: Option<&str>) -> String {
    match kind {
        EventKind::Follow => FOLLOW_GROUP_KEY.to_string(),
        EventKind::Like | EventKind::Comment | EventKind::CommentLike | EventKind::Unknown(_) => {
            format!("{}::{}", kind.as_str(), card_id.unwrap_or(NO_CARD))
        }
    }
}

/// A set of notification rows shown as one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationGroup {
    pub key: String,
    #[serde(rename = "type")]
    #[schemars(with = "String")]
    pub kind: EventKind,
    /// Distinct actors, most recent first
    pub actors: Vec<Actor>,
    /// Ids of every member row
    pub event_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_title: Option<String>,
    #[schemars(with = "String")]
    pub latest_at: DateTime<Utc>,
    pub is_read: bool,
    /// Member rows not yet read
    pub unread: usize,
}

impl NotificationGroup {
    fn seed(key: String, event: &NotificationEvent) -> Self {
        Self {
            key,
            kind: event.kind.clone(),
            actors: event.actor.iter().cloned().collect(),
            event_ids: vec![event.id.clone()],
            card_id: event.card_id.clone(),
            card_title: event.card_title.clone(),
            latest_at: event.created_at,
            is_read: event.is_read,
            unread: usize::from(!event.is_read),
        }
    }

    fn absorb(&mut self, event: &NotificationEvent) {
        self.event_ids.push(event.id.clone());

        if let Some(actor) = &event.actor {
            if !self.actors.iter().any(|known| known.id == actor.id) {
                self.actors.push(actor.clone());
            }
        }

        if self.card_title.is_none() {
            self.card_title.clone_from(&event.card_title);
        }

        if !event.is_read {
            self.is_read = false;
            self.unread += 1;
        }
    }

    /// Human readable summary of the group
    #[must_use]
    pub fn text(&self) -> String {
        describe_group(&self.kind, &self.actors, self.card_title.as_deref())
    }
}

/// Groups notification rows for display.
///
/// Rows are visited newest first (ties keep their input order), so the first row
/// seen for a key carries the group's latest timestamp and actor order follows
/// recency. The returned groups are ordered by `latest_at`, newest first.
#[must_use]
pub fn group_notifications(events: &[NotificationEvent]) -> Vec<NotificationGroup> {
    let mut ordered: Vec<&NotificationEvent> = events.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<NotificationGroup> = Vec::new();

    for event in ordered {
        let key = group_key(&event.kind, event.card_id.as_deref());

        if let Some(&position) = positions.get(&key) {
            groups[position].absorb(event);
        } else {
            positions.insert(key.clone(), groups.len());
            groups.push(NotificationGroup::seed(key, event));
        }
    }

    groups.sort_by(|a, b| b.latest_at.cmp(&a.latest_at));
    groups
}

/// Number of unread rows
#[must_use]
pub fn unread_count(events: &[NotificationEvent]) -> usize {
    events.iter().filter(|event| !event.is_read).count()
}
