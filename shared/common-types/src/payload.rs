//! Push payload contract shared with the background notification worker
//!
//! The worker receives the decrypted push body, renders a system notification
//! from it and, on click, brings the application to `url`. Every field is
//! optional on the wire and falls back to the defaults below; a body that is not
//! JSON is shown as plain text.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Roadmap";
pub const DEFAULT_ICON: &str = "/icons/icon-192x192.png";
pub const DEFAULT_BADGE: &str = "/icons/badge-72x72.png";
pub const DEFAULT_URL: &str = "/";

/// Body of a push message as sent to the push service (before encryption)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
struct WirePayload {
    title: Option<String>,
    body: Option<String>,
    icon: Option<String>,
    badge: Option<String>,
    url: Option<String>,
}

impl PushPayload {
    /// Payload with the default icon and badge
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>, url: Option<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_BADGE.to_string(),
            url: url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        }
    }

    /// Reads a payload the way the worker does: JSON when possible, otherwise the
    /// raw bytes become the body of a default-titled notification.
    #[must_use]
    pub fn from_push_data(data: &[u8]) -> Self {
        match serde_json::from_slice::<WirePayload>(data) {
            Ok(wire) => Self {
                title: wire.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                body: wire.body.unwrap_or_default(),
                icon: wire.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
                badge: wire.badge.unwrap_or_else(|| DEFAULT_BADGE.to_string()),
                url: wire.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
            },
            Err(_) => Self {
                body: String::from_utf8_lossy(data).into_owned(),
                ..Self::new(DEFAULT_TITLE, "", None)
            },
        }
    }

    /// JSON bytes sent as the encrypted push body
    #[must_use]
    pub fn to_json(&self) -> Vec<u8> {
        // Serializing a struct of strings cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// What the worker does when the user clicks a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    /// Focus the open view at `view` and navigate it to `url`
    Focus { view: usize, url: String },
    /// No view is open, open a new one at `url`
    Open { url: String },
}

impl ClickTarget {
    /// Picks the view to reuse for `url` among the application's open views.
    ///
    /// A view already showing `url` wins, otherwise the first open view is reused.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(open_views: &[S], url: &str) -> Self {
        let url = if url.is_empty() { DEFAULT_URL } else { url };

        open_views
            .iter()
            .position(|view| view.as_ref() == url)
            .or_else(|| (!open_views.is_empty()).then_some(0))
            .map_or_else(
                || Self::Open {
                    url: url.to_string(),
                },
                |view| Self::Focus {
                    view,
                    url: url.to_string(),
                },
            )
    }
}
