//! # Render Surface
//!
//! Overlay container plus canvas injected right after a video. The container
//! follows the video's content box and position; the canvas resolution
//! follows the active video area once the intrinsic size is known.

use duskview_core::engine::{EngineHost, FrameRequestId, FrameToken};
use duskview_core::gpu::VideoFrame;

use crate::geometry::{compute_overlay_placement, extract_style_value, find_positioning_ancestor, OverlayPlacement};
use crate::host::{Edge, NodeId, Observation, PageHost};
use crate::settings::{element_id, PipelineSettings};

/// Size of the letterboxed picture inside a `box_w` x `box_h` content box,
/// rounded to whole pixels. `None` while any dimension is zero.
pub fn active_video_area(box_w: f64, box_h: f64, video_w: u32, video_h: u32) -> Option<(u32, u32)> {
    if box_w <= 0.0 || box_h <= 0.0 || video_w == 0 || video_h == 0 {
        return None;
    }
    let scale = (box_w / video_w as f64).min(box_h / video_h as f64);
    let width = (video_w as f64 * scale).round() as u32;
    let height = (video_h as f64 * scale).round() as u32;
    Some((width.max(1), height.max(1)))
}

#[derive(Debug)]
pub struct RenderSurface {
    pub container: NodeId,
    pub canvas: NodeId,
    video: NodeId,
    content_box: (f64, f64),
    resolution: (u32, u32),
}

impl RenderSurface {
    /// Inject the surface after `video`. `None` if one is already there.
    pub fn attach(
        host: &mut dyn PageHost,
        settings: &PipelineSettings,
        video: NodeId,
        id: u64,
    ) -> Option<Self> {
        if let Some(next) = host.next_sibling(video) {
            if host.has_class(next, &settings.surface_id) {
                tracing::debug!("Surface already follows video {:?}", video);
                return None;
            }
        }

        let container = host.create_element("div");
        host.set_attribute(container, "id", &element_id(&settings.surface_id, id));
        host.add_class(container, &settings.surface_id);

        let canvas = host.create_element("canvas");
        host.set_attribute(canvas, "id", &element_id(&settings.canvas_id, id));
        host.append(container, canvas);
        host.insert_after(video, container);

        host.observe(Observation::VideoSize(video));
        host.observe(Observation::StyleAttribute(video));

        let (width, height) = host.content_box(video);
        let mut surface = Self {
            container,
            canvas,
            video,
            content_box: (0.0, 0.0),
            resolution: (0, 0),
        };
        surface.on_resize(host, width, height);

        tracing::debug!("Surface {} attached", id);
        Some(surface)
    }

    pub fn video(&self) -> NodeId {
        self.video
    }

    /// Canvas drawing resolution
    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Video content box changed. Returns the canvas resolution.
    pub fn on_resize(&mut self, host: &mut dyn PageHost, width: f64, height: f64) -> (u32, u32) {
        self.content_box = (width, height);
        host.set_inline_style(self.container, "width", &format!("{}px", width));
        host.set_inline_style(self.container, "height", &format!("{}px", height));

        self.update_resolution(host);
        self.place(host);
        self.resolution
    }

    /// Intrinsic size became known. Returns the canvas resolution.
    pub fn on_metadata(&mut self, host: &mut dyn PageHost) -> (u32, u32) {
        self.update_resolution(host);
        self.resolution
    }

    /// Inline style of the video changed. Returns whether placement re-ran.
    pub fn on_style_mutation(&self, host: &mut dyn PageHost, old_value: Option<&str>) -> bool {
        let moved = match old_value {
            None => true,
            Some(old) => Edge::ALL.iter().any(|edge| {
                host.inline_style(self.video, edge.css_name()) != extract_style_value(old, edge.css_name())
            }),
        };
        if moved {
            self.place(host);
        }
        moved
    }

    pub fn place(&self, host: &mut dyn PageHost) -> OverlayPlacement {
        let ancestor = find_positioning_ancestor(host, self.video);
        let placement = compute_overlay_placement(host, self.video, ancestor);
        placement.apply(host, self.container);
        placement
    }

    /// Visibility swap between surface and video
    pub fn set_filtered_visible(&self, host: &mut dyn PageHost, visible: bool) {
        let (surface, video) = if visible { ("visible", "hidden") } else { ("hidden", "visible") };
        host.set_inline_style(self.container, "visibility", surface);
        host.set_inline_style(self.video, "visibility", video);
    }

    pub fn engine_host<'a>(&'a self, page: &'a mut dyn PageHost) -> SurfaceHost<'a> {
        SurfaceHost { page, surface: self }
    }

    fn update_resolution(&mut self, host: &mut dyn PageHost) {
        let (width, height) = self.content_box;
        let resolution = host
            .intrinsic_size(self.video)
            .and_then(|(vw, vh)| active_video_area(width, height, vw, vh))
            .unwrap_or((width.round().max(1.0) as u32, height.round().max(1.0) as u32));

        if resolution != self.resolution {
            host.set_canvas_size(self.canvas, resolution.0, resolution.1);
            self.resolution = resolution;
        }
    }
}

/// Engine view of one surface and its video
pub struct SurfaceHost<'a> {
    page: &'a mut dyn PageHost,
    surface: &'a RenderSurface,
}

impl EngineHost for SurfaceHost<'_> {
    fn set_filtered_visible(&mut self, visible: bool) {
        self.surface.set_filtered_visible(self.page, visible);
    }

    fn capture_frame(&mut self) -> Option<VideoFrame> {
        self.page.capture_frame(self.surface.video)
    }

    fn request_frame(&mut self, token: FrameToken) -> FrameRequestId {
        self.page.request_animation_frame(token)
    }

    fn cancel_frame(&mut self, request: FrameRequestId) {
        self.page.cancel_animation_frame(request);
    }
}
