//! # Page Session
//!
//! One per page. Finds videos, keeps exactly one [`VideoRecord`] per element
//! for as long as the element exists, and routes host events to the record
//! they concern. A video taken out of the document keeps its record (loop
//! suspended) and picks it up again when it is put back.
//!
//! ```text
//! scan ─► register(video)
//!           ├─ CORS policy + source observer
//!           ├─ ToggleControl::attach
//!           ├─ RenderSurface::attach
//!           ├─ Filterer::init(host.create_renderer(canvas))
//!           └─ default toggle state (cached, else storage)
//! ```
//!
//! Handlers log failures and never hand them back to the page.

use std::collections::HashMap;

use duskview_core::config::ConfigBridge;
use duskview_core::engine::{Filterer, FrameRequestId, FrameToken, MediaEvent};
use duskview_core::mode::FilterMode;

use crate::discovery::{adds_video, apply_cors_policy, removes_nodes, VIDEO_SELECTOR};
use crate::host::{EventDisposition, Mutation, NodeId, Observation, PageEvent, PageHost, ReadyState};
use crate::messages::PageMessage;
use crate::settings::PipelineSettings;
use crate::surface::RenderSurface;
use crate::toggle::{ControlKind, ToggleControl};

/// Everything attached to one discovered video
pub struct VideoRecord {
    pub id: u64,
    pub video: NodeId,
    pub toggle: Option<ToggleControl>,
    pub surface: Option<RenderSurface>,
    pub toggled: bool,
    /// Video is out of the document but still alive
    pub detached: bool,
    pub engine: Filterer,
}

impl VideoRecord {
    /// Push the record's toggle state into its engine
    fn apply_toggle(&mut self, host: &mut dyn PageHost) {
        if self.detached {
            tracing::debug!("Video {} detached, toggle applied on return", self.id);
            return;
        }
        match self.surface.as_ref() {
            Some(surface) => self.engine.set(self.toggled, &mut surface.engine_host(host)),
            None => tracing::debug!("Video {} has no surface, toggle not applied", self.id),
        }
    }

    /// Video left the document: stop its loop, keep everything else
    fn suspend(&mut self, host: &mut dyn PageHost) {
        self.detached = true;
        if let Some(surface) = self.surface.as_ref() {
            self.engine.suspend(&mut surface.engine_host(host));
        }
        tracing::debug!("Video {} detached, record kept", self.id);
    }

    /// Video is gone for good: cancel its frame and remove what was injected
    fn dispose(self, host: &mut dyn PageHost) {
        if let Some(request) = self.engine.pending_request() {
            host.cancel_animation_frame(request);
        }
        if let Some(surface) = self.surface.as_ref() {
            host.remove(surface.container);
        }
        if let Some(toggle) = self.toggle.as_ref() {
            host.remove(toggle.node);
        }
        tracing::info!("Video {} gone, record dropped", self.id);
    }
}

pub struct PageSession<H: PageHost> {
    host: H,
    settings: PipelineSettings,
    config: ConfigBridge,
    records: HashMap<NodeId, VideoRecord>,
    next_id: u64,
    last_toggled: Option<bool>,
    stylesheet_installed: bool,
    observing: bool,
}

impl<H: PageHost> PageSession<H> {
    pub fn new(host: H, config: ConfigBridge, settings: PipelineSettings) -> Self {
        Self {
            host,
            settings,
            config,
            records: HashMap::new(),
            next_id: 0,
            last_toggled: None,
            stylesheet_installed: false,
            observing: false,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn record(&self, video: NodeId) -> Option<&VideoRecord> {
        self.records.get(&video)
    }

    pub fn records(&self) -> impl Iterator<Item = &VideoRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cached `lastToggleState`, `None` until first needed
    pub fn last_toggled(&self) -> Option<bool> {
        self.last_toggled
    }

    /// Observe the document and run the first scan
    pub async fn start(&mut self) {
        if !self.observing {
            self.host.observe(Observation::Document);
            self.observing = true;
        }
        self.scan().await;
    }

    /// Register every video not seen before and resume detached ones that
    /// are back in the document. Returns how many were new.
    pub async fn scan(&mut self) -> usize {
        let videos = self.host.query_all(VIDEO_SELECTOR);
        if videos.is_empty() {
            tracing::debug!("No video elements found");
            return 0;
        }

        self.install_stylesheet();

        let mut registered = 0;
        for video in videos {
            match self.records.get(&video).map(|r| r.detached) {
                Some(true) => self.reattach(video),
                Some(false) => {}
                None => {
                    self.register(video).await;
                    registered += 1;
                }
            }
        }
        registered
    }

    pub async fn dispatch(&mut self, event: PageEvent) -> EventDisposition {
        match event {
            PageEvent::Loaded => self.start().await,
            PageEvent::Mutations(mutations) => self.on_mutations(mutations).await,
            PageEvent::Resized { video, width, height } => self.on_resize(video, width, height),
            PageEvent::Media { video, event } => self.on_media(video, event).await,
            PageEvent::Click { target } => return self.on_click(target).await,
            PageEvent::AnimationFrame { token, request } => self.on_animation_frame(token, request).await,
            PageEvent::Message(PageMessage::ContentUpdate) => {
                tracing::debug!("Content update, rescanning");
                self.scan().await;
            }
        }
        EventDisposition::Pass
    }

    /// Suspend records whose video left the document and drop the ones whose
    /// video no longer exists. Returns how many were dropped.
    pub fn prune_detached(&mut self) -> usize {
        let mut gone = Vec::new();
        for record in self.records.values_mut() {
            if self.host.is_connected(record.video) {
                continue;
            }
            if !self.host.is_alive(record.video) {
                gone.push(record.video);
            } else if !record.detached {
                record.suspend(&mut self.host);
            }
        }

        for video in &gone {
            if let Some(record) = self.records.remove(video) {
                record.dispose(&mut self.host);
            }
        }
        gone.len()
    }

    /// Detached video is back: move its controls next to it and resume
    fn reattach(&mut self, video: NodeId) {
        let ready = self.host.ready_state(video) >= ReadyState::HaveFutureData;
        let Some(record) = self.records.get_mut(&video) else {
            return;
        };
        record.detached = false;

        if let Some(toggle) = record.toggle.as_ref() {
            if toggle.kind == ControlKind::Default {
                self.host.insert_after(video, toggle.node);
            }
        }
        if let Some(surface) = record.surface.as_mut() {
            self.host.insert_after(video, surface.container);
            let (width, height) = self.host.content_box(video);
            let (w, h) = surface.on_resize(&mut self.host, width, height);
            record.engine.resize(w, h);
        }

        tracing::info!("Video {} back in document", record.id);
        if ready {
            record.apply_toggle(&mut self.host);
        }
    }

    fn install_stylesheet(&mut self) {
        if self.stylesheet_installed {
            return;
        }
        self.stylesheet_installed = true;
        let href = self.host.asset_url(&self.settings.stylesheet);
        tracing::debug!("Installing stylesheet {}", href);
        self.host.install_stylesheet(&href);
    }

    async fn register(&mut self, video: NodeId) {
        let id = self.next_id;
        self.next_id += 1;
        tracing::info!("Registering video {}", id);

        apply_cors_policy(&mut self.host, video);
        self.host.observe(Observation::Sources(video));
        self.host.observe(Observation::MediaEvents(video));

        let toggle = ToggleControl::attach(&mut self.host, &self.settings, video, id);
        let surface = RenderSurface::attach(&mut self.host, &self.settings, video, id);

        // Subscribe before reading so no change falls in between
        let changes = self.config.subscribe();
        let mut engine = Filterer::new(FrameToken(id));
        engine.select_mode(self.current_mode().await);

        if let Some(surface) = surface.as_ref() {
            let (width, height) = surface.resolution();
            let renderer = self.host.create_renderer(surface.canvas, width, height);
            engine.init(renderer, changes, &mut surface.engine_host(&mut self.host));
        }

        self.records.insert(
            video,
            VideoRecord {
                id,
                video,
                toggle,
                surface,
                toggled: false,
                detached: false,
                engine,
            },
        );

        let toggled = self.default_toggle_state().await;
        let ready = self.host.ready_state(video) >= ReadyState::HaveFutureData;

        let Some(record) = self.records.get_mut(&video) else {
            return;
        };
        record.toggled = toggled;
        if let Some(toggle) = record.toggle.as_mut() {
            toggle.apply_default(&mut self.host, &self.settings, toggled);
        }
        // Otherwise applied on loadeddata
        if ready {
            record.apply_toggle(&mut self.host);
        }
    }

    async fn default_toggle_state(&mut self) -> bool {
        if let Some(toggled) = self.last_toggled {
            return toggled;
        }
        let toggled = match self.config.last_toggle_state().await {
            Ok(toggled) => toggled,
            Err(e) => {
                tracing::warn!("Falling back to untoggled: {}", e);
                false
            }
        };
        self.last_toggled = Some(toggled);
        toggled
    }

    async fn current_mode(&self) -> FilterMode {
        match self.config.filter_mode().await {
            Ok(mode) => mode,
            Err(e) => {
                tracing::warn!("Falling back to {}: {}", FilterMode::default(), e);
                FilterMode::default()
            }
        }
    }

    async fn on_mutations(&mut self, mutations: Vec<Mutation>) {
        for mutation in &mutations {
            match mutation {
                Mutation::ChildList { target, .. } if self.records.contains_key(target) => {
                    apply_cors_policy(&mut self.host, *target);
                }
                Mutation::Attribute { target, name, .. } if name == "src" => {
                    if self.records.contains_key(target) {
                        apply_cors_policy(&mut self.host, *target);
                    }
                }
                Mutation::Attribute { target, name, old_value } if name == "style" => {
                    if let Some(surface) = self.records.get(target).and_then(|r| r.surface.as_ref()) {
                        surface.on_style_mutation(&mut self.host, old_value.as_deref());
                    }
                }
                _ => {}
            }
        }

        if removes_nodes(&mutations) {
            self.prune_detached();
        }
        if adds_video(&self.host, &mutations) {
            tracing::debug!("Video element added, rescanning");
            self.scan().await;
        }
    }

    fn on_resize(&mut self, video: NodeId, width: f64, height: f64) {
        let Some(record) = self.records.get_mut(&video) else {
            return;
        };
        if let Some(surface) = record.surface.as_mut() {
            let (w, h) = surface.on_resize(&mut self.host, width, height);
            record.engine.resize(w, h);
        }
    }

    async fn on_media(&mut self, video: NodeId, event: MediaEvent) {
        if !self.records.contains_key(&video) {
            return;
        }

        let ready = self.host.ready_state(video) >= ReadyState::HaveFutureData;
        let mode = match event {
            MediaEvent::LoadedData if ready => Some(self.current_mode().await),
            _ => None,
        };

        let Some(record) = self.records.get_mut(&video) else {
            return;
        };
        record.engine.on_media_event(event);

        match event {
            MediaEvent::LoadedMetadata => {
                if let Some(surface) = record.surface.as_mut() {
                    let (w, h) = surface.on_metadata(&mut self.host);
                    record.engine.resize(w, h);
                }
            }
            MediaEvent::LoadedData => {
                if let Some(mode) = mode {
                    tracing::debug!("Video {} loaded, applying {} / {}", record.id, mode, record.toggled);
                    record.engine.refresh_mode(mode);
                    record.apply_toggle(&mut self.host);
                }
            }
            _ => {}
        }
    }

    async fn on_click(&mut self, target: NodeId) -> EventDisposition {
        let video = self
            .records
            .values()
            .find(|r| r.toggle.as_ref().map(|t| t.node) == Some(target))
            .map(|r| r.video);
        let Some(record) = video.and_then(|v| self.records.get_mut(&v)) else {
            return EventDisposition::Pass;
        };

        let toggled = !record.toggled;
        record.toggled = toggled;
        if let Some(toggle) = record.toggle.as_mut() {
            toggle.flip(&mut self.host, &self.settings, toggled);
        }
        record.apply_toggle(&mut self.host);
        tracing::debug!("Video {} toggled {}", record.id, toggled);

        self.last_toggled = Some(toggled);
        if let Err(e) = self.config.set_last_toggle_state(toggled).await {
            tracing::warn!("Failed to persist toggle state: {}", e);
        }

        EventDisposition::Consumed
    }

    async fn on_animation_frame(&mut self, token: FrameToken, request: FrameRequestId) {
        let Some(video) = self.records.values().find(|r| r.engine.token() == token).map(|r| r.video) else {
            tracing::trace!("Frame for unknown engine {:?}", token);
            return;
        };

        // Missed setting changes: take the mode from the store before drawing
        let in_sync = match self.records.get_mut(&video) {
            Some(record) => record.engine.pending_request() != Some(request) || record.engine.sync_config(),
            None => true,
        };
        let mode = if in_sync { None } else { Some(self.current_mode().await) };

        let Some(record) = self.records.get_mut(&video) else {
            return;
        };
        if let Some(mode) = mode {
            record.engine.refresh_mode(mode);
        }
        if let Some(surface) = record.surface.as_ref() {
            record.engine.render_frame(request, &mut surface.engine_host(&mut self.host));
        }
    }
}
