//! # duskview Core
//!
//! GPU color-transform engine for live video and the synced settings it
//! reads. Nothing here touches a page; see `duskview-page` for that.

// ============================================================================
// Filter math
// ============================================================================
pub mod mode;
pub mod color;
pub mod shaders;

// ============================================================================
// GPU
// ============================================================================
pub mod gpu;
pub mod engine;

// ============================================================================
// Settings
// ============================================================================
pub mod config;

pub mod error;

pub use config::{ConfigBridge, ConfigChanges, ConfigEvent, MemoryStore, ModeSelector, SettingsStore};
pub use engine::{EngineHost, EngineState, Filterer, FrameRequestId, FrameToken, MediaEvent};
pub use error::{ConfigError, GpuError, RenderError};
pub use gpu::{FrameRenderer, VideoFrame, WgpuRenderer};
pub use mode::FilterMode;

// ============================================================================
// Version
// ============================================================================
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
