//! Local copy of the notification feed with optimistic edits
//!
//! Edits show up in the local feed right away. The backend write runs after
//! that; a failed write reverts that one edit and leaves the others in place. A
//! refresh replaces the feed with the server's and re-applies edits whose write
//! is still running.

use std::sync::Arc;

use async_trait::async_trait;
use common_types::api::{FeedEntry, NotificationFeed};
use common_types::optimistic::{Optimistic, Reversible};
use tokio::sync::Mutex;
use tracing::{instrument, warn};

use crate::api::{ApiClient, ApiClientError};

/// Backend operations the inbox needs
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Grouped feed of `user_id`
    async fn fetch(&self, user_id: &str) -> Result<NotificationFeed, ApiClientError>;

    /// Marks every notification of `user_id` read, returning how many changed
    async fn mark_all_read(&self, user_id: &str) -> Result<usize, ApiClientError>;

    /// Deletes one row, returning whether it existed
    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, ApiClientError>;
}

#[async_trait]
impl FeedSource for ApiClient {
    async fn fetch(&self, user_id: &str) -> Result<NotificationFeed, ApiClientError> {
        self.notifications(user_id).await
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<usize, ApiClientError> {
        Ok(self.mark_read(user_id, None).await?.updated)
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, ApiClientError> {
        self.delete_notification(user_id, id).await
    }
}

fn recount(feed: &mut NotificationFeed) {
    feed.unread_count = feed.groups.iter().map(|entry| entry.group.unread).sum();
}

/// An edit to the local feed
#[derive(Debug)]
enum InboxEdit {
    MarkAllRead {
        /// `(key, is_read, unread)` of every group before the edit
        previous: Vec<(String, bool, usize)>,
    },
    Remove {
        key: String,
        /// Position and content of the removed group
        removed: Option<(usize, FeedEntry)>,
    },
}

impl Reversible<NotificationFeed> for InboxEdit {
    fn apply(&mut self, feed: &mut NotificationFeed) {
        match self {
            Self::MarkAllRead { previous } => {
                *previous = feed
                    .groups
                    .iter()
                    .map(|entry| (entry.group.key.clone(), entry.group.is_read, entry.group.unread))
                    .collect();
                for entry in &mut feed.groups {
                    entry.group.is_read = true;
                    entry.group.unread = 0;
                }
            }
            Self::Remove { key, removed } => {
                *removed = feed
                    .groups
                    .iter()
                    .position(|entry| entry.group.key == *key)
                    .map(|position| (position, feed.groups.remove(position)));
            }
        }
        recount(feed);
    }

    fn revert(&self, feed: &mut NotificationFeed) {
        match self {
            Self::MarkAllRead { previous } => {
                for (key, is_read, unread) in previous {
                    if let Some(entry) = feed.groups.iter_mut().find(|e| e.group.key == *key) {
                        entry.group.is_read = *is_read;
                        entry.group.unread = *unread;
                    }
                }
            }
            Self::Remove { removed, .. } => {
                if let Some((position, entry)) = removed {
                    let position = (*position).min(feed.groups.len());
                    feed.groups.insert(position, entry.clone());
                }
            }
        }
        recount(feed);
    }
}

/// Notification feed of one user
pub struct NotificationInbox {
    source: Arc<dyn FeedSource>,
    user_id: String,
    feed: Mutex<Optimistic<NotificationFeed, InboxEdit>>,
}

impl NotificationInbox {
    /// Empty inbox; call [`NotificationInbox::refresh`] to load it
    #[must_use]
    pub fn new(source: Arc<dyn FeedSource>, user_id: impl Into<String>) -> Self {
        Self {
            source,
            user_id: user_id.into(),
            feed: Mutex::new(Optimistic::new(NotificationFeed::default())),
        }
    }

    /// Reloads the feed from the backend
    ///
    /// # Errors
    ///
    /// Returns the fetch failure; the local feed is left as it was
    pub async fn refresh(&self) -> Result<(), ApiClientError> {
        let feed = self.source.fetch(&self.user_id).await?;
        self.feed.lock().await.reset(feed);
        Ok(())
    }

    /// Groups as currently shown, newest first
    pub async fn groups(&self) -> Vec<FeedEntry> {
        self.feed.lock().await.state().groups.clone()
    }

    /// Unread rows across all groups as currently shown
    pub async fn unread_count(&self) -> usize {
        self.feed.lock().await.state().unread_count
    }

    /// Marks everything read
    ///
    /// # Errors
    ///
    /// Returns the write failure after reverting the edit
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn mark_all_read(&self) -> Result<(), ApiClientError> {
        let ticket = self.feed.lock().await.begin(InboxEdit::MarkAllRead {
            previous: Vec::new(),
        });

        let result = self.source.mark_all_read(&self.user_id).await;

        let mut feed = self.feed.lock().await;
        match result {
            Ok(_) => {
                feed.confirm(ticket);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Mark all read failed, reverting");
                feed.rollback(ticket);
                Err(e)
            }
        }
    }

    /// Removes the group with `key` and deletes its rows.
    /// Returns false when no such group is shown.
    ///
    /// # Errors
    ///
    /// Returns the first delete failure after restoring the group. When some of
    /// its rows were already deleted the feed is reloaded from the backend, so
    /// only the rows that still exist are shown.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn remove(&self, key: &str) -> Result<bool, ApiClientError> {
        let (ticket, event_ids) = {
            let mut feed = self.feed.lock().await;
            let Some(entry) = feed.state().groups.iter().find(|e| e.group.key == key) else {
                return Ok(false);
            };
            let event_ids = entry.group.event_ids.clone();

            let ticket = feed.begin(InboxEdit::Remove {
                key: key.to_string(),
                removed: None,
            });
            (ticket, event_ids)
        };

        let mut deleted = 0;
        for id in &event_ids {
            if let Err(e) = self.source.delete(&self.user_id, id).await {
                warn!(error = %e, deleted, "Notification delete failed, restoring group");
                self.feed.lock().await.rollback(ticket);

                // Rows deleted before the failure are gone on the server
                if deleted > 0 {
                    if let Err(refresh_err) = self.refresh().await {
                        warn!(error = %refresh_err, "Failed to reload feed after partial delete");
                    }
                }
                return Err(e);
            }
            deleted += 1;
        }

        self.feed.lock().await.confirm(ticket);
        Ok(true)
    }
}
