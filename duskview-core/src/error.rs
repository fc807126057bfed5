//! Error types for the GPU engine and the settings bridge.
//!
//! None of these ever reach the host page: the engine and the page session
//! log them and carry on with a degraded (unfiltered) video.

use thiserror::Error;

use crate::mode::FilterMode;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter")]
    NoAdapter,
    #[error("Device request failed: {0}")]
    DeviceRequest(String),
    #[error("Surface creation failed: {0}")]
    Surface(String),
    #[error("Program for {mode} failed to build: {message}")]
    ShaderBuild { mode: FilterMode, message: String },
    #[error("No program could be built")]
    NoPrograms,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No program available for {0}")]
    ModeUnavailable(FilterMode),
    #[error("Frame is {width}x{height} but carries {len} bytes")]
    FrameSize { width: u32, height: u32, len: usize },
    #[error("Surface texture unavailable: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("Readback failed: {0}")]
    Readback(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Settings store failed: {0}")]
    Store(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: serde_json::Value },
}
