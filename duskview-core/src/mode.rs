//! Filter mode selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Color transform applied to a video while its filter is toggled on.
///
/// The mode is a global, synced setting shared by every video on every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Invert brightness (HSV value), keep hue and saturation
    #[default]
    Invert,
    /// Soft ceiling on brightness and saturation
    Dampen,
    /// Proportional darkening and desaturation
    Darken,
}

impl FilterMode {
    pub const ALL: [FilterMode; 3] = [FilterMode::Invert, FilterMode::Dampen, FilterMode::Darken];

    /// Name as stored in synced settings
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Invert => "invert",
            FilterMode::Dampen => "dampen",
            FilterMode::Darken => "darken",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown filter mode: {0}")]
pub struct UnknownFilterMode(pub String);

impl FromStr for FilterMode {
    type Err = UnknownFilterMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invert" => Ok(FilterMode::Invert),
            "dampen" => Ok(FilterMode::Dampen),
            "darken" => Ok(FilterMode::Darken),
            other => Err(UnknownFilterMode(other.to_string())),
        }
    }
}
