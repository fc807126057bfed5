//! # Filterer
//!
//! Per-video render loop. Owns the video's renderer and drives it one
//! animation frame at a time through the host:
//!
//! ```text
//! Uninitialized --init--> Idle --set(true)--> Rendering <--set--> Paused
//!        \
//!         `--init(Err)--> Degraded (video stays visible)
//! ```
//!
//! At most one frame request is outstanding. A frame callback for any other
//! request id is stale and ignored, so `set(false)` always stops the loop.

use crate::config::{ConfigChanges, ConfigEvent};
use crate::error::{GpuError, RenderError};
use crate::gpu::{FrameRenderer, VideoFrame};
use crate::mode::FilterMode;

/// Identifies which engine a frame callback belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// Host-issued animation frame request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequestId(pub u64);

/// Media element events the engine cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    Playing,
    TimeUpdate,
    Pause,
    Waiting,
    Ended,
    LoadedMetadata,
    LoadedData,
}

impl MediaEvent {
    /// New frame-copy gate, `None` if the event does not affect it
    pub fn frames_copyable(&self) -> Option<bool> {
        match self {
            MediaEvent::Playing | MediaEvent::TimeUpdate => Some(true),
            MediaEvent::Pause | MediaEvent::Waiting | MediaEvent::Ended => Some(false),
            MediaEvent::LoadedMetadata | MediaEvent::LoadedData => None,
        }
    }
}

/// What the engine needs from the page around one video
pub trait EngineHost {
    /// `true`: show the surface and hide the video. `false`: the reverse.
    fn set_filtered_visible(&mut self, visible: bool);

    /// Current video frame, `None` if it cannot be read right now
    fn capture_frame(&mut self) -> Option<VideoFrame>;

    fn request_frame(&mut self, token: FrameToken) -> FrameRequestId;

    fn cancel_frame(&mut self, request: FrameRequestId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Idle,
    Rendering,
    Paused,
    Degraded,
}

pub struct Filterer {
    token: FrameToken,
    state: EngineState,
    renderer: Option<Box<dyn FrameRenderer>>,
    changes: Option<ConfigChanges>,
    mode: FilterMode,
    active: bool,
    copyable: bool,
    pending: Option<FrameRequestId>,
    mode_stale: bool,
    missing_mode_logged: Option<FilterMode>,
    frames_rendered: u64,
}

impl Filterer {
    pub fn new(token: FrameToken) -> Self {
        Self {
            token,
            state: EngineState::Uninitialized,
            renderer: None,
            changes: None,
            mode: FilterMode::default(),
            active: false,
            copyable: false,
            pending: None,
            mode_stale: false,
            missing_mode_logged: None,
            frames_rendered: 0,
        }
    }

    /// Take ownership of the renderer built for this video's surface.
    ///
    /// The surface starts hidden. A GPU failure leaves the engine degraded.
    pub fn init(
        &mut self,
        renderer: Result<Box<dyn FrameRenderer>, GpuError>,
        changes: ConfigChanges,
        host: &mut dyn EngineHost,
    ) {
        host.set_filtered_visible(false);
        self.changes = Some(changes);

        match renderer {
            Ok(renderer) => {
                let modes = renderer.modes();
                tracing::debug!("Filterer {} ready with programs {:?}", self.token.0, modes);
                self.renderer = Some(renderer);
                self.state = EngineState::Idle;
            }
            Err(e) => {
                tracing::warn!("Filterer {} degraded: {}", self.token.0, e);
                self.renderer = None;
                self.state = EngineState::Degraded;
            }
        }
    }

    pub fn token(&self) -> FrameToken {
        self.token
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn frames_copyable(&self) -> bool {
        self.copyable
    }

    pub fn pending_request(&self) -> Option<FrameRequestId> {
        self.pending
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn select_mode(&mut self, mode: FilterMode) {
        if self.mode != mode {
            tracing::debug!("Filterer {} mode {} -> {}", self.token.0, self.mode, mode);
            self.mode = mode;
        }
    }

    /// Mode read straight from the store; clears a pending refresh
    pub fn refresh_mode(&mut self, mode: FilterMode) {
        self.select_mode(mode);
        self.mode_stale = false;
    }

    /// Setting changes were dropped and the mode has to be re-read
    pub fn needs_mode_refresh(&self) -> bool {
        self.mode_stale
    }

    /// Apply setting changes queued since the last call. Returns `false`
    /// while the mode may be stale, until [`refresh_mode`](Self::refresh_mode).
    pub fn sync_config(&mut self) -> bool {
        let Some(changes) = self.changes.as_mut() else {
            return true;
        };
        let events = changes.drain();
        if changes.take_lagged() {
            tracing::debug!("Filterer {} missed setting changes", self.token.0);
            self.mode_stale = true;
        }
        for event in events {
            if let ConfigEvent::FilterMode(mode) = event {
                self.select_mode(mode);
            }
        }
        !self.mode_stale
    }

    pub fn on_media_event(&mut self, event: MediaEvent) {
        if let Some(copyable) = event.frames_copyable() {
            self.copyable = copyable;
        }
    }

    /// Canvas resolution changed
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(width, height);
        }
    }

    pub fn set(&mut self, active: bool, host: &mut dyn EngineHost) {
        self.active = active;

        match self.state {
            EngineState::Uninitialized | EngineState::Degraded => {
                host.set_filtered_visible(false);
                tracing::debug!(
                    "Filterer {} in {:?}, toggle {} recorded only",
                    self.token.0,
                    self.state,
                    active
                );
                return;
            }
            EngineState::Idle | EngineState::Rendering | EngineState::Paused => {}
        }

        host.set_filtered_visible(active);

        if active {
            if self.pending.is_none() {
                self.pending = Some(host.request_frame(self.token));
            }
            self.state = EngineState::Rendering;
        } else {
            if let Some(request) = self.pending.take() {
                host.cancel_frame(request);
            }
            if self.state == EngineState::Rendering {
                self.state = EngineState::Paused;
            }
        }
    }

    /// Stop the loop without touching the toggle, e.g. while the video is out
    /// of the document. The next `set(true)` resumes it.
    pub fn suspend(&mut self, host: &mut dyn EngineHost) {
        if let Some(request) = self.pending.take() {
            host.cancel_frame(request);
        }
        if self.state == EngineState::Rendering {
            self.state = EngineState::Paused;
        }
    }

    /// Animation frame callback. Returns whether a frame was processed.
    pub fn render_frame(&mut self, request: FrameRequestId, host: &mut dyn EngineHost) -> bool {
        if self.pending != Some(request) {
            tracing::trace!("Filterer {} ignoring stale frame {:?}", self.token.0, request);
            return false;
        }
        self.pending = None;

        if !self.active || self.state != EngineState::Rendering {
            return false;
        }

        self.sync_config();

        if let Some(renderer) = self.renderer.as_mut() {
            if self.copyable {
                if let Some(frame) = host.capture_frame() {
                    if let Err(e) = renderer.upload(&frame) {
                        tracing::debug!("Filterer {} skipped upload: {}", self.token.0, e);
                    }
                }
            }

            match renderer.draw(self.mode) {
                Ok(()) => {
                    self.frames_rendered += 1;
                    self.missing_mode_logged = None;
                }
                Err(RenderError::ModeUnavailable(mode)) => {
                    if self.missing_mode_logged != Some(mode) {
                        tracing::warn!("Filterer {} has no program for {}", self.token.0, mode);
                        self.missing_mode_logged = Some(mode);
                    }
                }
                Err(e) => tracing::debug!("Filterer {} draw failed: {}", self.token.0, e),
            }
        }

        self.pending = Some(host.request_frame(self.token));
        true
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigBridge, MemoryStore};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Renderer that records calls instead of touching a GPU
    #[derive(Clone, Default)]
    struct RecordingRenderer {
        calls: Arc<Mutex<Vec<String>>>,
        missing: Vec<FilterMode>,
    }

    impl FrameRenderer for RecordingRenderer {
        fn modes(&self) -> Vec<FilterMode> {
            FilterMode::ALL
                .into_iter()
                .filter(|m| !self.missing.contains(m))
                .collect()
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.calls.lock().push(format!("resize {}x{}", width, height));
        }

        fn upload(&mut self, frame: &VideoFrame) -> Result<(), RenderError> {
            self.calls.lock().push(format!("upload {}x{}", frame.width, frame.height));
            Ok(())
        }

        fn draw(&mut self, mode: FilterMode) -> Result<(), RenderError> {
            if self.missing.contains(&mode) {
                return Err(RenderError::ModeUnavailable(mode));
            }
            self.calls.lock().push(format!("draw {}", mode));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeHost {
        visible: Option<bool>,
        next_id: u64,
        requested: Vec<FrameRequestId>,
        cancelled: Vec<FrameRequestId>,
    }

    impl EngineHost for FakeHost {
        fn set_filtered_visible(&mut self, visible: bool) {
            self.visible = Some(visible);
        }

        fn capture_frame(&mut self) -> Option<VideoFrame> {
            Some(VideoFrame::solid(2, 2, [255, 255, 255, 255]))
        }

        fn request_frame(&mut self, _token: FrameToken) -> FrameRequestId {
            self.next_id += 1;
            let id = FrameRequestId(self.next_id);
            self.requested.push(id);
            id
        }

        fn cancel_frame(&mut self, request: FrameRequestId) {
            self.cancelled.push(request);
        }
    }

    fn ready_engine(renderer: RecordingRenderer, host: &mut FakeHost) -> (Filterer, ConfigBridge) {
        let bridge = ConfigBridge::new(Arc::new(MemoryStore::new()));
        let mut engine = Filterer::new(FrameToken(1));
        engine.init(Ok(Box::new(renderer)), bridge.subscribe(), host);
        (engine, bridge)
    }

    #[test]
    fn test_media_events_gate_copying() {
        let mut engine = Filterer::new(FrameToken(0));
        assert!(!engine.frames_copyable());
        engine.on_media_event(MediaEvent::Playing);
        assert!(engine.frames_copyable());
        engine.on_media_event(MediaEvent::LoadedData);
        assert!(engine.frames_copyable());
        engine.on_media_event(MediaEvent::Waiting);
        assert!(!engine.frames_copyable());
        engine.on_media_event(MediaEvent::TimeUpdate);
        engine.on_media_event(MediaEvent::Ended);
        assert!(!engine.frames_copyable());
    }

    #[test]
    fn test_init_hides_surface() {
        let mut host = FakeHost::default();
        let (engine, _) = ready_engine(RecordingRenderer::default(), &mut host);
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(host.visible, Some(false));
    }

    #[test]
    fn test_set_is_idempotent() {
        let mut host = FakeHost::default();
        let (mut engine, _) = ready_engine(RecordingRenderer::default(), &mut host);

        engine.set(true, &mut host);
        engine.set(true, &mut host);
        assert_eq!(host.requested.len(), 1);
        assert_eq!(engine.state(), EngineState::Rendering);
        assert_eq!(host.visible, Some(true));

        engine.set(false, &mut host);
        engine.set(false, &mut host);
        assert_eq!(host.cancelled, vec![FrameRequestId(1)]);
        assert_eq!(engine.state(), EngineState::Paused);
        assert_eq!(host.visible, Some(false));
    }

    #[test]
    fn test_frame_loop_draws_and_reschedules() {
        let renderer = RecordingRenderer::default();
        let calls = renderer.calls.clone();
        let mut host = FakeHost::default();
        let (mut engine, _) = ready_engine(renderer, &mut host);

        engine.set(true, &mut host);
        let first = engine.pending_request().unwrap();
        assert!(engine.render_frame(first, &mut host));
        // Not playing yet: draw without upload
        assert_eq!(*calls.lock(), vec!["draw invert"]);

        engine.on_media_event(MediaEvent::Playing);
        let second = engine.pending_request().unwrap();
        assert_ne!(first, second);
        assert!(engine.render_frame(second, &mut host));
        assert_eq!(*calls.lock(), vec!["draw invert", "upload 2x2", "draw invert"]);
        assert_eq!(engine.frames_rendered(), 2);
    }

    #[test]
    fn test_stale_frames_are_ignored() {
        let renderer = RecordingRenderer::default();
        let calls = renderer.calls.clone();
        let mut host = FakeHost::default();
        let (mut engine, _) = ready_engine(renderer, &mut host);

        engine.set(true, &mut host);
        let request = engine.pending_request().unwrap();
        engine.set(false, &mut host);

        assert!(!engine.render_frame(request, &mut host));
        assert!(calls.lock().is_empty());
        assert_eq!(host.requested.len(), 1);
        assert_eq!(engine.pending_request(), None);
    }

    #[tokio::test]
    async fn test_mode_change_applies_before_next_frame() {
        let renderer = RecordingRenderer::default();
        let calls = renderer.calls.clone();
        let mut host = FakeHost::default();
        let (mut engine, bridge) = ready_engine(renderer, &mut host);

        engine.set(true, &mut host);
        bridge.set_filter_mode(FilterMode::Darken).await.unwrap();

        let request = engine.pending_request().unwrap();
        engine.render_frame(request, &mut host);
        assert_eq!(engine.mode(), FilterMode::Darken);
        assert_eq!(*calls.lock(), vec!["draw darken"]);
    }

    #[tokio::test]
    async fn test_lagged_changes_ask_for_refresh() {
        let mut host = FakeHost::default();
        let (mut engine, bridge) = ready_engine(RecordingRenderer::default(), &mut host);

        bridge.set_filter_mode(FilterMode::Darken).await.unwrap();
        for i in 0..70 {
            bridge.set_last_toggle_state(i % 2 == 0).await.unwrap();
        }

        assert!(!engine.sync_config());
        assert!(engine.needs_mode_refresh());
        assert_eq!(engine.mode(), FilterMode::Invert);
        // Still stale until the mode is re-read
        assert!(!engine.sync_config());

        engine.refresh_mode(FilterMode::Darken);
        assert!(engine.sync_config());
        assert_eq!(engine.mode(), FilterMode::Darken);
    }

    #[test]
    fn test_suspend_keeps_toggle() {
        let mut host = FakeHost::default();
        let (mut engine, _) = ready_engine(RecordingRenderer::default(), &mut host);

        engine.set(true, &mut host);
        engine.suspend(&mut host);
        assert!(engine.is_active());
        assert_eq!(engine.pending_request(), None);
        assert_eq!(engine.state(), EngineState::Paused);
        assert_eq!(host.cancelled, vec![FrameRequestId(1)]);
        assert_eq!(host.visible, Some(true));

        engine.set(true, &mut host);
        assert_eq!(engine.pending_request(), Some(FrameRequestId(2)));
        assert_eq!(engine.state(), EngineState::Rendering);
    }

    #[test]
    fn test_off_then_on_keeps_mode() {
        let renderer = RecordingRenderer::default();
        let calls = renderer.calls.clone();
        let mut host = FakeHost::default();
        let (mut engine, _) = ready_engine(renderer, &mut host);
        engine.select_mode(FilterMode::Dampen);

        engine.set(true, &mut host);
        engine.set(false, &mut host);
        engine.set(true, &mut host);

        let request = engine.pending_request().unwrap();
        engine.render_frame(request, &mut host);
        assert_eq!(engine.mode(), FilterMode::Dampen);
        assert_eq!(*calls.lock(), vec!["draw dampen"]);
    }

    #[test]
    fn test_missing_program_is_a_noop_draw() {
        let renderer = RecordingRenderer {
            missing: vec![FilterMode::Dampen],
            ..Default::default()
        };
        let calls = renderer.calls.clone();
        let mut host = FakeHost::default();
        let (mut engine, _) = ready_engine(renderer, &mut host);
        engine.select_mode(FilterMode::Dampen);

        engine.set(true, &mut host);
        let request = engine.pending_request().unwrap();
        assert!(engine.render_frame(request, &mut host));
        assert!(calls.lock().is_empty());
        assert_eq!(engine.frames_rendered(), 0);
        // Loop keeps running so a later mode change takes effect
        assert!(engine.pending_request().is_some());
    }

    #[test]
    fn test_degraded_engine_keeps_video_visible() {
        let mut host = FakeHost::default();
        let bridge = ConfigBridge::new(Arc::new(MemoryStore::new()));
        let mut engine = Filterer::new(FrameToken(3));
        engine.init(Err(GpuError::NoAdapter), bridge.subscribe(), &mut host);
        assert_eq!(engine.state(), EngineState::Degraded);

        engine.set(true, &mut host);
        assert!(engine.is_active());
        assert_eq!(host.visible, Some(false));
        assert!(host.requested.is_empty());
    }

    #[test]
    fn test_resize_reaches_renderer() {
        let renderer = RecordingRenderer::default();
        let calls = renderer.calls.clone();
        let mut host = FakeHost::default();
        let (mut engine, _) = ready_engine(renderer, &mut host);
        engine.resize(640, 360);
        assert_eq!(*calls.lock(), vec!["resize 640x360"]);
    }
}
