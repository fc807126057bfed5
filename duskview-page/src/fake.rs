//! In-memory page for tests.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use duskview_core::engine::{FrameRequestId, FrameToken};
use duskview_core::error::{GpuError, RenderError};
use duskview_core::gpu::{create_surface_renderer, FrameRenderer, VideoFrame};
use duskview_core::mode::FilterMode;

use crate::host::{NodeId, Observation, PageHost, ReadyState, Rect};

type CallLog = Arc<Mutex<Vec<String>>>;

struct FakeNode {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: HashMap<String, String>,
    classes: Vec<String>,
    inline: HashMap<String, String>,
    computed: HashMap<String, String>,
    rect: Rect,
    content: Option<(f64, f64)>,
    ready_state: ReadyState,
    intrinsic: Option<(u32, u32)>,
    alive: bool,
}

impl FakeNode {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_uppercase(),
            parent: None,
            children: Vec::new(),
            attributes: HashMap::new(),
            classes: Vec::new(),
            inline: HashMap::new(),
            computed: HashMap::new(),
            rect: Rect::default(),
            content: None,
            ready_state: ReadyState::HaveNothing,
            intrinsic: None,
            alive: true,
        }
    }
}

struct FakeRenderer {
    calls: CallLog,
}

impl FrameRenderer for FakeRenderer {
    fn modes(&self) -> Vec<FilterMode> {
        FilterMode::ALL.to_vec()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.calls.lock().push(format!("resize {}x{}", width, height));
    }

    fn upload(&mut self, frame: &VideoFrame) -> Result<(), RenderError> {
        self.calls.lock().push(format!("upload {}x{}", frame.width, frame.height));
        Ok(())
    }

    fn draw(&mut self, mode: FilterMode) -> Result<(), RenderError> {
        self.calls.lock().push(format!("draw {}", mode));
        Ok(())
    }
}

pub struct FakePage {
    nodes: Vec<FakeNode>,
    root: NodeId,
    body: NodeId,
    next_frame: u64,
    pub url: String,
    pub scroll: (f64, f64),
    pub gpu_available: bool,
    pub stylesheets: Vec<String>,
    pub observations: Vec<Observation>,
    pub requested_frames: Vec<(FrameToken, FrameRequestId)>,
    pub cancelled_frames: Vec<FrameRequestId>,
    pub canvas_sizes: HashMap<NodeId, (u32, u32)>,
    renderers: HashMap<NodeId, CallLog>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        let mut page = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
            next_frame: 0,
            url: url.to_string(),
            scroll: (0.0, 0.0),
            gpu_available: true,
            stylesheets: Vec::new(),
            observations: Vec::new(),
            requested_frames: Vec::new(),
            cancelled_frames: Vec::new(),
            canvas_sizes: HashMap::new(),
            renderers: HashMap::new(),
        };
        page.root = page.new_node("html");
        page.body = page.add_element(page.root, "body");
        page
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn new_node(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(FakeNode::new(tag));
        id
    }

    fn node(&self, id: NodeId) -> &FakeNode {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut FakeNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn add_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.new_node(tag);
        self.append(parent, id);
        id
    }

    /// Video that has already loaded enough to play
    pub fn add_video(&mut self, parent: NodeId, rect: Rect) -> NodeId {
        let video = self.add_element(parent, "video");
        self.set_rect(video, rect);
        self.set_ready_state(video, ReadyState::HaveEnoughData);
        video
    }

    /// Detach the node and forget it, as a collected element
    pub fn drop_node(&mut self, node: NodeId) {
        self.detach(node);
        self.node_mut(node).alive = false;
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        self.node_mut(node).rect = rect;
    }

    /// Content box smaller than the border box, as with padding or borders
    pub fn set_content_box(&mut self, node: NodeId, width: f64, height: f64) {
        self.node_mut(node).content = Some((width, height));
    }

    pub fn set_computed(&mut self, node: NodeId, property: &str, value: &str) {
        self.node_mut(node).computed.insert(property.to_string(), value.to_string());
    }

    pub fn set_ready_state(&mut self, video: NodeId, state: ReadyState) {
        self.node_mut(video).ready_state = state;
    }

    pub fn set_intrinsic_size(&mut self, video: NodeId, width: u32, height: u32) {
        self.node_mut(video).intrinsic = Some((width, height));
    }

    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.node(node).classes.clone()
    }

    pub fn visibility(&self, node: NodeId) -> String {
        self.inline_style(node, "visibility")
    }

    pub fn renderer_calls(&self, canvas: NodeId) -> Vec<String> {
        self.renderers
            .get(&canvas)
            .map(|calls| calls.lock().clone())
            .unwrap_or_default()
    }

    pub fn renderer_count(&self) -> usize {
        self.renderers.len()
    }

    pub fn last_frame_request(&self, token: FrameToken) -> Option<FrameRequestId> {
        self.requested_frames
            .iter()
            .rev()
            .find(|(t, _)| *t == token)
            .map(|(_, id)| *id)
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.node(node).parent {
            self.node_mut(parent).children.retain(|c| *c != node);
        }
        self.node_mut(node).parent = None;
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        let n = self.node(node);
        if let Some(class) = selector.strip_prefix('.') {
            n.classes.iter().any(|c| c == class)
        } else if let Some(id) = selector.strip_prefix('#') {
            n.attributes.get("id").map(|v| v == id).unwrap_or(false)
        } else {
            n.tag.eq_ignore_ascii_case(selector)
        }
    }

    /// Connected nodes in document order
    fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            for child in self.node(node).children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }
}

impl PageHost for FakePage {
    fn document_element(&self) -> NodeId {
        self.root
    }

    fn query_all(&self, selector: &str) -> Vec<NodeId> {
        self.walk().into_iter().filter(|n| self.matches(*n, selector)).collect()
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.walk().into_iter().find(|n| self.matches(*n, selector))
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.query_selector(&format!("#{}", id))
    }

    fn page_url(&self) -> String {
        self.url.clone()
    }

    fn tag_name(&self, node: NodeId) -> String {
        self.node(node).tag.clone()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node).parent?;
        let siblings = &self.node(parent).children;
        let index = siblings.iter().position(|c| *c == node)?;
        siblings.get(index + 1).copied()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).children.clone()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn is_alive(&self, node: NodeId) -> bool {
        self.node(node).alive
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.new_node(tag)
    }

    fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        self.detach(node);
        let Some(parent) = self.node(reference).parent else {
            return;
        };
        let children = &mut self.node_mut(parent).children;
        let index = children.iter().position(|c| *c == reference).map(|i| i + 1).unwrap_or(children.len());
        children.insert(index, node);
        self.node_mut(node).parent = Some(parent);
    }

    fn prepend(&mut self, parent: NodeId, node: NodeId) {
        self.detach(node);
        self.node_mut(parent).children.insert(0, node);
        self.node_mut(node).parent = Some(parent);
    }

    fn append(&mut self, parent: NodeId, node: NodeId) {
        self.detach(node);
        self.node_mut(parent).children.push(node);
        self.node_mut(node).parent = Some(parent);
    }

    fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node).attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.node_mut(node).attributes.insert(name.to_string(), value.to_string());
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node).classes.iter().any(|c| c == class)
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            self.node_mut(node).classes.push(class.to_string());
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        self.node_mut(node).classes.retain(|c| c != class);
    }

    fn inline_style(&self, node: NodeId, property: &str) -> String {
        self.node(node).inline.get(property).cloned().unwrap_or_default()
    }

    fn set_inline_style(&mut self, node: NodeId, property: &str, value: &str) {
        self.node_mut(node).inline.insert(property.to_string(), value.to_string());
    }

    fn computed_style(&self, node: NodeId, property: &str) -> String {
        if let Some(value) = self.node(node).computed.get(property) {
            return value.clone();
        }
        match property {
            "top" | "right" | "bottom" | "left" => "auto".to_string(),
            "position" => "static".to_string(),
            _ => String::new(),
        }
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        self.node(node).rect
    }

    fn content_box(&self, node: NodeId) -> (f64, f64) {
        let n = self.node(node);
        n.content.unwrap_or((n.rect.width(), n.rect.height()))
    }

    fn scroll_offset(&self) -> (f64, f64) {
        self.scroll
    }

    fn ready_state(&self, video: NodeId) -> ReadyState {
        self.node(video).ready_state
    }

    fn intrinsic_size(&self, video: NodeId) -> Option<(u32, u32)> {
        self.node(video).intrinsic
    }

    fn capture_frame(&mut self, video: NodeId) -> Option<VideoFrame> {
        let (width, height) = self.node(video).intrinsic.unwrap_or((2, 2));
        Some(VideoFrame::solid(width, height, [200, 100, 50, 255]))
    }

    fn asset_url(&self, path: &str) -> String {
        format!("chrome-extension://duskview/{}", path)
    }

    fn install_stylesheet(&mut self, href: &str) {
        self.stylesheets.push(href.to_string());
    }

    fn observe(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    fn request_animation_frame(&mut self, token: FrameToken) -> FrameRequestId {
        self.next_frame += 1;
        let id = FrameRequestId(self.next_frame);
        self.requested_frames.push((token, id));
        id
    }

    fn cancel_animation_frame(&mut self, request: FrameRequestId) {
        self.cancelled_frames.push(request);
    }

    fn set_canvas_size(&mut self, canvas: NodeId, width: u32, height: u32) {
        self.canvas_sizes.insert(canvas, (width, height));
    }

    fn surface_target(&mut self, _canvas: NodeId) -> Result<wgpu::SurfaceTarget<'static>, GpuError> {
        Err(GpuError::Surface("canvas has no GPU context".to_string()))
    }

    fn create_renderer(
        &mut self,
        canvas: NodeId,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn FrameRenderer>, GpuError> {
        if !self.gpu_available {
            let target = self.surface_target(canvas)?;
            return create_surface_renderer(target, width, height);
        }
        let calls: CallLog = Arc::new(Mutex::new(vec![format!("create {}x{}", width, height)]));
        self.renderers.insert(canvas, calls.clone());
        Ok(Box::new(FakeRenderer { calls }))
    }
}
