//! # Synced Filter Settings
//!
//! Typed access to the two persisted values every page shares:
//!
//! - `filterMode`: `"invert" | "dampen" | "darken"` (default `invert`)
//! - `lastToggleState`: `bool` (default `false`)
//!
//! The backing key-value store is external (browser sync storage in the
//! extension); it is reached through [`SettingsStore`]. Change notifications
//! arrive as raw [`StorageChange`]s and are parsed into [`ConfigEvent`]s.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::error::ConfigError;
use crate::mode::FilterMode;

pub const FILTER_MODE_KEY: &str = "filterMode";
pub const LAST_TOGGLE_STATE_KEY: &str = "lastToggleState";

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// One key changing in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Persisted, synced key-value storage
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, ConfigError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), ConfigError>;

    /// Stream of changes made by anyone (this page, other tabs, the options popup)
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store. Notifies subscribers only when a value actually changes.
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: RwLock::new(HashMap::new()),
            changes,
        }
    }

    pub fn with_values<K: Into<String>>(values: impl IntoIterator<Item = (K, Value)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.values.write();
            for (key, value) in values {
                map.insert(key.into(), value);
            }
        }
        store
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        let old_value = self.values.write().insert(key.to_string(), value.clone());
        if old_value.as_ref() != Some(&value) {
            // No receivers is fine
            let _ = self.changes.send(StorageChange {
                key: key.to_string(),
                old_value,
                new_value: Some(value),
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}

// ============================================================================
// Typed events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEvent {
    FilterMode(FilterMode),
    LastToggleState(bool),
}

impl ConfigEvent {
    /// Parse a raw change. Unrelated keys and malformed values yield `None`.
    /// A removed key falls back to its default.
    pub fn from_change(change: &StorageChange) -> Option<Self> {
        match change.key.as_str() {
            FILTER_MODE_KEY => match &change.new_value {
                None => Some(ConfigEvent::FilterMode(FilterMode::default())),
                Some(value) => match serde_json::from_value::<FilterMode>(value.clone()) {
                    Ok(mode) => Some(ConfigEvent::FilterMode(mode)),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid {}: {}", FILTER_MODE_KEY, value);
                        None
                    }
                },
            },
            LAST_TOGGLE_STATE_KEY => match &change.new_value {
                None => Some(ConfigEvent::LastToggleState(false)),
                Some(Value::Bool(toggled)) => Some(ConfigEvent::LastToggleState(*toggled)),
                Some(value) => {
                    tracing::warn!("Ignoring invalid {}: {}", LAST_TOGGLE_STATE_KEY, value);
                    None
                }
            },
            _ => None,
        }
    }
}

/// One subscriber's view of the change stream
pub struct ConfigChanges {
    rx: broadcast::Receiver<StorageChange>,
    lagged: bool,
}

impl ConfigChanges {
    pub fn new(rx: broadcast::Receiver<StorageChange>) -> Self {
        Self { rx, lagged: false }
    }

    /// Whether changes were dropped since the last call. Values seen after a
    /// lag may be out of date; re-read them from the store.
    pub fn take_lagged(&mut self) -> bool {
        std::mem::take(&mut self.lagged)
    }

    /// Everything that arrived since the last call, without waiting
    pub fn drain(&mut self) -> Vec<ConfigEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(change) => events.extend(ConfigEvent::from_change(&change)),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("Settings subscriber lagged by {} changes", skipped);
                    self.lagged = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        events
    }

    /// Wait for the next relevant event; `None` once the store is gone
    pub async fn next(&mut self) -> Option<ConfigEvent> {
        loop {
            match self.rx.recv().await {
                Ok(change) => {
                    if let Some(event) = ConfigEvent::from_change(&change) {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Settings subscriber lagged by {} changes", skipped);
                    self.lagged = true;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

// ============================================================================
// Bridge
// ============================================================================

#[derive(Clone)]
pub struct ConfigBridge {
    store: Arc<dyn SettingsStore>,
}

impl ConfigBridge {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SettingsStore> {
        &self.store
    }

    /// Stored mode, `None` if never set. Malformed values count as unset.
    pub async fn stored_filter_mode(&self) -> Result<Option<FilterMode>, ConfigError> {
        let Some(value) = self.store.get(FILTER_MODE_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<FilterMode>(value.clone()) {
            Ok(mode) => Ok(Some(mode)),
            Err(_) => {
                tracing::warn!("Stored {} is invalid: {}", FILTER_MODE_KEY, value);
                Ok(None)
            }
        }
    }

    pub async fn filter_mode(&self) -> Result<FilterMode, ConfigError> {
        Ok(self.stored_filter_mode().await?.unwrap_or_default())
    }

    pub async fn set_filter_mode(&self, mode: FilterMode) -> Result<(), ConfigError> {
        self.store.set(FILTER_MODE_KEY, Value::from(mode.as_str())).await
    }

    pub async fn last_toggle_state(&self) -> Result<bool, ConfigError> {
        match self.store.get(LAST_TOGGLE_STATE_KEY).await? {
            None => Ok(false),
            Some(Value::Bool(toggled)) => Ok(toggled),
            Some(value) => Err(ConfigError::InvalidValue {
                key: LAST_TOGGLE_STATE_KEY.to_string(),
                value,
            }),
        }
    }

    pub async fn set_last_toggle_state(&self, toggled: bool) -> Result<(), ConfigError> {
        self.store.set(LAST_TOGGLE_STATE_KEY, Value::Bool(toggled)).await
    }

    pub fn subscribe(&self) -> ConfigChanges {
        ConfigChanges::new(self.store.subscribe())
    }
}

// ============================================================================
// Mode selection (options popup)
// ============================================================================

/// Mode picker state: seeds the default on first open and only writes real changes.
pub struct ModeSelector {
    bridge: ConfigBridge,
    current: Option<FilterMode>,
}

impl ModeSelector {
    pub fn new(bridge: ConfigBridge) -> Self {
        Self { bridge, current: None }
    }

    /// Load the stored mode, persisting the default when nothing is stored yet
    pub async fn open(&mut self) -> Result<FilterMode, ConfigError> {
        let mode = match self.bridge.stored_filter_mode().await? {
            Some(mode) => mode,
            None => {
                let mode = FilterMode::default();
                self.bridge.set_filter_mode(mode).await?;
                mode
            }
        };
        self.current = Some(mode);
        Ok(mode)
    }

    /// Returns whether anything was written
    pub async fn choose(&mut self, mode: FilterMode) -> Result<bool, ConfigError> {
        if self.current == Some(mode) {
            return Ok(false);
        }
        self.bridge.set_filter_mode(mode).await?;
        self.current = Some(mode);
        Ok(true)
    }

    pub fn current(&self) -> Option<FilterMode> {
        self.current
    }
}
