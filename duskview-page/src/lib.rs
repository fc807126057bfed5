//! # duskview Page
//!
//! Page side of the video filter: finds `<video>` elements, injects a toggle
//! and an overlay surface for each, keeps the surface on top of its video and
//! drives one `duskview_core` engine per video.
//!
//! The page itself is reached through [`host::PageHost`].

// ============================================================================
// Host seam
// ============================================================================
pub mod host;

// ============================================================================
// Pipeline
// ============================================================================
pub mod geometry;
pub mod discovery;
pub mod surface;
pub mod toggle;
pub mod session;

// ============================================================================
// Cross-context & setup
// ============================================================================
pub mod messages;
pub mod settings;
pub mod logging;

#[cfg(test)]
pub(crate) mod fake;

pub use host::{EventDisposition, Mutation, NodeId, Observation, PageEvent, PageHost};
pub use messages::{NavigationRelay, PageMessage, TabMessenger};
pub use session::{PageSession, VideoRecord};
pub use settings::PipelineSettings;
