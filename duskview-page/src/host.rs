//! # Page Host Seam
//!
//! Everything the pipeline needs from a live document: node queries, styles,
//! layout boxes, observers, animation frames and GPU context creation.
//! The DOM binding itself (content script glue) lives with the extension, not
//! in this workspace; tests bind the trait to an in-memory page.
//!
//! Observers are registered with [`PageHost::observe`]; whatever they see is
//! fed back into the session as a [`PageEvent`].

use duskview_core::engine::{FrameRequestId, FrameToken, MediaEvent};
use duskview_core::error::GpuError;
use duskview_core::gpu::{create_surface_renderer, FrameRenderer, VideoFrame};

use crate::messages::PageMessage;

/// Opaque handle to a DOM node owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Box edges in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            right: left + width,
            bottom: top + height,
            left,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
            left: self.left + dx,
        }
    }
}

/// Positioning offsets of a box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left];

    pub fn css_name(&self) -> &'static str {
        match self {
            Edge::Top => "top",
            Edge::Right => "right",
            Edge::Bottom => "bottom",
            Edge::Left => "left",
        }
    }
}

/// `HTMLMediaElement.readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

/// Observer registrations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Child list of the whole document subtree
    Document,
    /// Content box size of a video
    VideoSize(NodeId),
    /// `style` attribute of a video, with old values
    StyleAttribute(NodeId),
    /// `src` attribute and child list of a video
    Sources(NodeId),
    /// Playback events of a video
    MediaEvents(NodeId),
    /// Clicks on an injected control
    Clicks(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attribute {
        target: NodeId,
        name: String,
        old_value: Option<String>,
    },
}

/// Everything the host delivers to a [`PageSession`](crate::session::PageSession)
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// Window finished loading
    Loaded,
    Mutations(Vec<Mutation>),
    Resized {
        video: NodeId,
        width: f64,
        height: f64,
    },
    Media {
        video: NodeId,
        event: MediaEvent,
    },
    Click {
        target: NodeId,
    },
    AnimationFrame {
        token: FrameToken,
        request: FrameRequestId,
    },
    Message(PageMessage),
}

/// What the session tells the host after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// Let the event continue
    Pass,
    /// Stop propagation and prevent the default action
    Consumed,
}

pub trait PageHost {
    // --- Document ---
    fn document_element(&self) -> NodeId;
    fn query_all(&self, selector: &str) -> Vec<NodeId>;
    fn query_selector(&self, selector: &str) -> Option<NodeId>;
    fn element_by_id(&self, id: &str) -> Option<NodeId>;
    fn page_url(&self) -> String;

    // --- Tree ---
    fn tag_name(&self, node: NodeId) -> String;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn is_connected(&self, node: NodeId) -> bool;
    /// `false` once the page has let go of the node entirely. A node that is
    /// only out of the document is still alive.
    fn is_alive(&self, node: NodeId) -> bool;

    fn create_element(&mut self, tag: &str) -> NodeId;
    fn insert_after(&mut self, reference: NodeId, node: NodeId);
    fn prepend(&mut self, parent: NodeId, node: NodeId);
    fn append(&mut self, parent: NodeId, node: NodeId);
    fn remove(&mut self, node: NodeId);

    // --- Attributes ---
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn has_class(&self, node: NodeId, class: &str) -> bool;
    fn add_class(&mut self, node: NodeId, class: &str);
    fn remove_class(&mut self, node: NodeId, class: &str);

    // --- Style & layout ---
    /// Inline style property, empty when unset
    fn inline_style(&self, node: NodeId, property: &str) -> String;
    fn set_inline_style(&mut self, node: NodeId, property: &str, value: &str);
    fn computed_style(&self, node: NodeId, property: &str) -> String;
    /// Viewport-relative border box
    fn bounding_rect(&self, node: NodeId) -> Rect;
    /// `(width, height)` of the content box, padding and border excluded
    fn content_box(&self, node: NodeId) -> (f64, f64);
    /// `(pageXOffset, pageYOffset)`
    fn scroll_offset(&self) -> (f64, f64);

    // --- Media ---
    fn ready_state(&self, video: NodeId) -> ReadyState;
    /// `videoWidth`/`videoHeight`, `None` until metadata is known
    fn intrinsic_size(&self, video: NodeId) -> Option<(u32, u32)>;
    fn capture_frame(&mut self, video: NodeId) -> Option<VideoFrame>;

    // --- Extension ---
    fn asset_url(&self, path: &str) -> String;
    fn install_stylesheet(&mut self, href: &str);

    // --- Scheduling & observers ---
    fn observe(&mut self, observation: Observation);
    fn request_animation_frame(&mut self, token: FrameToken) -> FrameRequestId;
    fn cancel_animation_frame(&mut self, request: FrameRequestId);

    // --- GPU ---
    fn set_canvas_size(&mut self, canvas: NodeId, width: u32, height: u32);
    /// Presentable target behind an overlay canvas
    fn surface_target(&mut self, canvas: NodeId) -> Result<wgpu::SurfaceTarget<'static>, GpuError>;

    /// Renderer for an overlay canvas. Blocks on adapter and device requests;
    /// hosts that cannot block override this.
    fn create_renderer(
        &mut self,
        canvas: NodeId,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn FrameRenderer>, GpuError> {
        let target = self.surface_target(canvas)?;
        create_surface_renderer(target, width, height)
    }
}

/// Is the node a `<video>` element
pub fn is_video(host: &dyn PageHost, node: NodeId) -> bool {
    host.tag_name(node).eq_ignore_ascii_case("video")
}
