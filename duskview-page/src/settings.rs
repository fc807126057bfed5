//! Identifiers the page pipeline injects and looks for.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Class of the known host player's root element
    pub player_class: String,
    /// Control bar of the known host player
    pub player_controls_selector: String,
    /// Id of the single player button (not suffixed per video)
    pub player_control_id: String,
    pub player_control_classes: Vec<String>,
    pub player_icon_class: String,
    pub player_icon: String,

    pub default_control_id: String,
    pub default_icon: String,

    /// Id base and class of the overlay container
    pub surface_id: String,
    pub canvas_id: String,

    pub checked_class: String,
    pub animate_in_class: String,
    pub animate_out_class: String,

    pub stylesheet: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            player_class: "html5-video-player".to_string(),
            player_controls_selector: ".ytp-right-controls".to_string(),
            player_control_id: "ss-youtube-container".to_string(),
            player_control_classes: vec!["playerButton".to_string(), "ytp-button".to_string()],
            player_icon_class: "playerButtonImage".to_string(),
            player_icon: "images/IconTransparent.png".to_string(),
            default_control_id: "ss-default-container".to_string(),
            default_icon: "images/Icon.png".to_string(),
            surface_id: "ss-video-container".to_string(),
            canvas_id: "ss-render-canvas".to_string(),
            checked_class: "checked".to_string(),
            animate_in_class: "animate-in".to_string(),
            animate_out_class: "animate-out".to_string(),
            stylesheet: "overlay_video.css".to_string(),
        }
    }
}

impl PipelineSettings {
    /// Overlay a partial JSON document on the defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse pipeline settings")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize pipeline settings")
    }
}

/// Per-video DOM id: `<base>-<id>`
pub fn element_id(base: &str, id: u64) -> String {
    format!("{}-{}", base, id)
}
