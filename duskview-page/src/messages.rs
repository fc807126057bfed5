//! Cross-context signal between the background script and page sessions.
//!
//! Single-page apps swap content without a load event. The background side
//! watches history-state updates and pokes the active tab so its session
//! scans again.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Wire format: `{"status": "CONTENT_UPDATE"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageMessage {
    ContentUpdate,
}

impl PageMessage {
    pub fn parse(json: &str) -> Option<Self> {
        match serde_json::from_str(json) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!("Ignoring unknown page message {}: {}", json, e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(pub i64);

/// Tab messaging as the background context sees it
#[async_trait]
pub trait TabMessenger: Send + Sync {
    /// Active tab of the current window
    async fn active_tab(&self) -> Option<TabId>;

    async fn send(&self, tab: TabId, message: PageMessage) -> Result<()>;
}

/// Background side: history-state updates become `CONTENT_UPDATE` messages
pub struct NavigationRelay<M: TabMessenger> {
    messenger: M,
}

impl<M: TabMessenger> NavigationRelay<M> {
    pub fn new(messenger: M) -> Self {
        Self { messenger }
    }

    /// Returns the tab that was notified, if any
    pub async fn on_history_state_updated(&self, url: &str) -> Option<TabId> {
        tracing::debug!("History state updated: {}", url);

        let Some(tab) = self.messenger.active_tab().await else {
            tracing::debug!("No active tab to notify");
            return None;
        };

        match self.messenger.send(tab, PageMessage::ContentUpdate).await {
            Ok(()) => Some(tab),
            Err(e) => {
                tracing::warn!("Failed to notify tab {}: {:#}", tab.0, e);
                None
            }
        }
    }

    pub fn messenger(&self) -> &M {
        &self.messenger
    }
}
