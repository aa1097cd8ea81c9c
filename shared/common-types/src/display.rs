//! Display text for notification groups and push messages

use crate::event::{Actor, EventKind};

const FALLBACK_ACTOR: &str = "Someone";

fn lead_actor(actors: &[Actor]) -> &str {
    actors
        .first()
        .and_then(|actor| actor.username.as_deref())
        .unwrap_or(FALLBACK_ACTOR)
}

fn others_suffix(actor_count: usize) -> String {
    match actor_count.saturating_sub(1) {
        0 => String::new(),
        1 => " and 1 other".to_string(),
        n => format!(" and {n} others"),
    }
}

fn card_suffix(card_title: Option<&str>) -> String {
    card_title.map_or_else(String::new, |title| format!(" \"{title}\""))
}

/// Describes a group: the most recent actor by name, the rest as a count.
///
/// ```
/// use common_types::{display::describe_group, Actor, EventKind};
///
/// let actors = vec![
///     Actor { id: "1".into(), username: Some("ana".into()), avatar_url: None },
///     Actor::anonymous("2"),
///     Actor::anonymous("3"),
/// ];
/// assert_eq!(
///     describe_group(&EventKind::Like, &actors, Some("Rust in 30 days")),
///     "ana and 2 others liked your roadmap \"Rust in 30 days\""
/// );
/// ```
#[must_use]
pub fn describe_group(kind: &EventKind, actors: &[Actor], card_title: Option<&str>) -> String {
    let who = format!("{}{}", lead_actor(actors), others_suffix(actors.len()));
    let card = card_suffix(card_title);

    match kind {
        EventKind::Like => format!("{who} liked your roadmap{card}"),
        EventKind::Comment => format!("{who} commented on your roadmap{card}"),
        EventKind::CommentLike => {
            let target = if card.is_empty() {
                " a roadmap".to_string()
            } else {
                card
            };
            format!("{who} liked your comment on{target}")
        }
        EventKind::Follow => format!("{who} started following you"),
        EventKind::Unknown(_) => format!("{who} sent you a notification"),
    }
}

/// Describes a single event, used as the body of its push message
#[must_use]
pub fn describe_event(kind: &EventKind, actor: Option<&Actor>, card_title: Option<&str>) -> String {
    describe_group(kind, actor.map(std::slice::from_ref).unwrap_or_default(), card_title)
}

/// Short title used for the system notification of a single event
#[must_use]
pub const fn push_title(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::Like => "New like",
        EventKind::Comment => "New comment",
        EventKind::CommentLike => "Your comment was liked",
        EventKind::Follow => "New follower",
        EventKind::Unknown(_) => "New notification",
    }
}
