//! # GPU Filter Rendering via wgpu
//!
//! Uploads video frames into a texture and redraws them through the program
//! of the selected [`FilterMode`] onto the overlay surface.
//!
//! ```text
//! VideoFrame (RGBA8) ─► video texture ─► full-surface quad ─► target
//!                                         program[mode]       (surface or offscreen)
//! ```
//!
//! All three programs are compiled once when the renderer is created. A
//! program that fails to build is logged and left out; drawing in that mode
//! then reports [`RenderError::ModeUnavailable`] and the caller skips the frame.

use std::collections::HashMap;
use wgpu::util::DeviceExt;

use crate::error::{GpuError, RenderError};
use crate::mode::FilterMode;
use crate::shaders::{self, FRAGMENT_ENTRY, VERTEX_ENTRY};

// ============================================================================
// Quad Geometry
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 2],
    tex_coords: [f32; 2],
}

// Clip space covers the whole surface; texture row 0 is the top of the frame.
// Never recomputed: the pass is a color transform, not a geometric one.
const QUAD: &[Vertex] = &[
    Vertex { position: [-1.0, -1.0], tex_coords: [0.0, 1.0] },
    Vertex { position: [ 1.0, -1.0], tex_coords: [1.0, 1.0] },
    Vertex { position: [ 1.0,  1.0], tex_coords: [1.0, 0.0] },
    Vertex { position: [-1.0,  1.0], tex_coords: [0.0, 0.0] },
];

const QUAD_INDICES: &[u16] = &[0, 1, 2, 2, 3, 0];

/// Shown until the first real frame arrives
const PLACEHOLDER_PIXEL: [u8; 4] = [0, 0, 0, 0];

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// ============================================================================
// Video Frame
// ============================================================================

/// One captured video frame, tightly packed RGBA8
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl VideoFrame {
    pub fn rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(RenderError::FrameSize { width, height, len: data.len() });
        }
        Ok(Self { width, height, data })
    }

    /// Single-color frame
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba.repeat(width as usize * height as usize);
        Self { width, height, data }
    }
}

// ============================================================================
// Renderer Seam
// ============================================================================

/// What the engine needs from a GPU context bound to one overlay surface.
pub trait FrameRenderer {
    /// Modes whose program built successfully
    fn modes(&self) -> Vec<FilterMode>;

    /// Change the drawing resolution of the surface
    fn resize(&mut self, width: u32, height: u32);

    /// Replace the sampled texture with a new frame
    fn upload(&mut self, frame: &VideoFrame) -> Result<(), RenderError>;

    /// Draw the full-surface quad through the program for `mode`
    fn draw(&mut self, mode: FilterMode) -> Result<(), RenderError>;
}

// ============================================================================
// Shader Program Set
// ============================================================================

/// Compiled render pipeline per filter mode. Immutable after creation.
pub struct ShaderProgramSet {
    programs: HashMap<FilterMode, wgpu::RenderPipeline>,
}

impl ShaderProgramSet {
    async fn build(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        format: wgpu::TextureFormat,
    ) -> Self {
        let mut programs = HashMap::new();

        for mode in FilterMode::ALL {
            match Self::build_program(device, layout, format, mode).await {
                Ok(pipeline) => {
                    programs.insert(mode, pipeline);
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }

        Self { programs }
    }

    async fn build_program(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        format: wgpu::TextureFormat,
        mode: FilterMode,
    ) -> Result<wgpu::RenderPipeline, GpuError> {
        // Validation errors land in the scope instead of the uncaptured handler
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let label = format!("{}_program", mode);
        let source = shaders::program_source(mode);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &[vertex_layout],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        match device.pop_error_scope().await {
            Some(err) => Err(GpuError::ShaderBuild { mode, message: err.to_string() }),
            None => Ok(pipeline),
        }
    }

    pub fn get(&self, mode: FilterMode) -> Option<&wgpu::RenderPipeline> {
        self.programs.get(&mode)
    }

    pub fn modes(&self) -> Vec<FilterMode> {
        FilterMode::ALL
            .into_iter()
            .filter(|m| self.programs.contains_key(m))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

// ============================================================================
// wgpu Renderer
// ============================================================================

enum RenderTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

pub struct WgpuRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: RenderTarget,

    programs: ShaderProgramSet,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    // Geometry
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,

    // Sampled video texture
    video_texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    texture_size: (u32, u32),

    width: u32,
    height: u32,
    frames_drawn: u64,
}

/// Instance over every native backend (and WebGPU/WebGL on wasm)
pub fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

async fn request_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'static>>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), GpuError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(GpuError::NoAdapter)?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                label: Some("duskview_device"),
                memory_hints: Default::default(),
            },
            None,
        )
        .await
        .map_err(|e| GpuError::DeviceRequest(e.to_string()))?;

    tracing::info!("GPU renderer: {}", adapter.get_info().name);

    Ok((adapter, device, queue))
}

impl WgpuRenderer {
    /// Renderer drawing into its own texture; read back with [`read_pixels`](Self::read_pixels)
    pub async fn offscreen(width: u32, height: u32) -> Result<Self, GpuError> {
        let instance = create_instance();
        let (_adapter, device, queue) = request_device(&instance, None).await?;

        let texture = create_target_texture(&device, width.max(1), height.max(1));
        Self::build(device, queue, RenderTarget::Offscreen { texture }, OFFSCREEN_FORMAT, width, height).await
    }

    /// Renderer presenting to a surface created by the host (e.g. from the overlay canvas)
    pub async fn for_surface(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<Self, GpuError> {
        let (adapter, device, queue) = request_device(instance, Some(&surface)).await?;

        let caps = surface.get_capabilities(&adapter);
        // Filter math runs on encoded values; keep the target non-sRGB when we can
        let format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| GpuError::Surface("surface reports no formats".into()))?;
        let alpha_mode = caps
            .alpha_modes
            .iter()
            .find(|m| **m == wgpu::CompositeAlphaMode::PreMultiplied)
            .or_else(|| caps.alpha_modes.first())
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Self::build(device, queue, RenderTarget::Surface { surface, config }, format, width, height).await
    }

    async fn build(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target: RenderTarget,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, GpuError> {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("video_bind_group_layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("filter_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let programs = ShaderProgramSet::build(&device, &pipeline_layout, format).await;
        if programs.is_empty() {
            return Err(GpuError::NoPrograms);
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_vertex_buffer"),
            contents: bytemuck::cast_slice(QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_index_buffer"),
            contents: bytemuck::cast_slice(QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let video_texture = create_video_texture(&device, 1, 1);
        write_frame(&queue, &video_texture, &VideoFrame::solid(1, 1, PLACEHOLDER_PIXEL));
        let bind_group = create_bind_group(&device, &bind_group_layout, &video_texture, &sampler);

        Ok(Self {
            device,
            queue,
            target,
            programs,
            bind_group_layout,
            sampler,
            vertex_buffer,
            index_buffer,
            video_texture,
            bind_group,
            texture_size: (1, 1),
            width: width.max(1),
            height: height.max(1),
            frames_drawn: 0,
        })
    }

    pub fn programs(&self) -> &ShaderProgramSet {
        &self.programs
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Copy the offscreen target back to the CPU as tightly packed RGBA8
    pub fn read_pixels(&self) -> Result<Vec<u8>, RenderError> {
        let RenderTarget::Offscreen { texture } = &self.target else {
            return Err(RenderError::Readback("renderer presents to a surface".into()));
        };

        let unpadded_row = 4 * self.width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = unpadded_row.div_ceil(align) * align;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: (padded_row * self.height) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(RenderError::Readback(e.to_string())),
            Err(e) => return Err(RenderError::Readback(e.to_string())),
        }

        let mut pixels = Vec::with_capacity((unpadded_row * self.height) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in data.chunks(padded_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_row as usize]);
            }
        }
        staging_buffer.unmap();

        Ok(pixels)
    }
}

impl FrameRenderer for WgpuRenderer {
    fn modes(&self) -> Vec<FilterMode> {
        self.programs.modes()
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return;
        }

        self.width = width;
        self.height = height;

        match &mut self.target {
            RenderTarget::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
            }
            RenderTarget::Offscreen { texture } => {
                *texture = create_target_texture(&self.device, width, height);
            }
        }
    }

    fn upload(&mut self, frame: &VideoFrame) -> Result<(), RenderError> {
        let expected = frame.width as usize * frame.height as usize * 4;
        if frame.width == 0 || frame.height == 0 || frame.data.len() != expected {
            return Err(RenderError::FrameSize {
                width: frame.width,
                height: frame.height,
                len: frame.data.len(),
            });
        }

        if self.texture_size != (frame.width, frame.height) {
            self.video_texture = create_video_texture(&self.device, frame.width, frame.height);
            self.bind_group = create_bind_group(
                &self.device,
                &self.bind_group_layout,
                &self.video_texture,
                &self.sampler,
            );
            self.texture_size = (frame.width, frame.height);
        }

        write_frame(&self.queue, &self.video_texture, frame);
        Ok(())
    }

    fn draw(&mut self, mode: FilterMode) -> Result<(), RenderError> {
        let pipeline = self
            .programs
            .get(mode)
            .ok_or(RenderError::ModeUnavailable(mode))?;

        let (view, surface_texture) = match &self.target {
            RenderTarget::Surface { surface, config } => {
                let output = match surface.get_current_texture() {
                    Ok(output) => output,
                    Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                        surface.configure(&self.device, config);
                        return Err(e.into());
                    }
                    Err(e) => return Err(e.into()),
                };
                let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
                (view, Some(output))
            }
            RenderTarget::Offscreen { texture } => {
                (texture.create_view(&wgpu::TextureViewDescriptor::default()), None)
            }
        };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("filter_encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("filter_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_viewport(0.0, 0.0, self.width as f32, self.height as f32, 0.0, 1.0);
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(output) = surface_texture {
            output.present();
        }

        self.frames_drawn += 1;
        Ok(())
    }
}

/// Blocking renderer for an overlay canvas or window handed over by the host
pub fn create_surface_renderer(
    target: wgpu::SurfaceTarget<'static>,
    width: u32,
    height: u32,
) -> Result<Box<dyn FrameRenderer>, GpuError> {
    let instance = create_instance();
    let surface = instance
        .create_surface(target)
        .map_err(|e| GpuError::Surface(e.to_string()))?;
    let renderer = pollster::block_on(WgpuRenderer::for_surface(&instance, surface, width, height))?;
    Ok(Box::new(renderer))
}

fn create_target_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen_target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn create_video_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("video_texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &wgpu::Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("video_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn write_frame(queue: &wgpu::Queue, texture: &wgpu::Texture, frame: &VideoFrame) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &frame.data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * frame.width),
            rows_per_image: Some(frame.height),
        },
        wgpu::Extent3d {
            width: frame.width,
            height: frame.height,
            depth_or_array_layers: 1,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color;

    #[test]
    fn test_frame_size_is_validated() {
        assert!(VideoFrame::rgba(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            VideoFrame::rgba(2, 2, vec![0; 15]),
            Err(RenderError::FrameSize { width: 2, height: 2, len: 15 })
        ));
        assert!(VideoFrame::rgba(0, 4, Vec::new()).is_err());
    }

    #[test]
    fn test_solid_frame() {
        let frame = VideoFrame::solid(3, 2, [1, 2, 3, 4]);
        assert_eq!(frame.data.len(), 24);
        assert_eq!(&frame.data[20..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_quad_covers_clip_space() {
        let xs: Vec<f32> = QUAD.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = QUAD.iter().map(|v| v.position[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 1.0);
        // Top of clip space samples the first texture row
        for v in QUAD {
            assert_eq!(v.tex_coords[1], if v.position[1] > 0.0 { 0.0 } else { 1.0 });
        }
    }

    // Runs only where an adapter is available
    #[test]
    fn test_gpu_output_matches_cpu_reference() {
        let Ok(mut renderer) = pollster::block_on(WgpuRenderer::offscreen(64, 4)) else {
            return;
        };
        assert_eq!(renderer.modes(), FilterMode::ALL.to_vec());

        let source = [51u8, 102, 153, 255];
        renderer.upload(&VideoFrame::solid(8, 8, source)).unwrap();

        for mode in FilterMode::ALL {
            renderer.draw(mode).unwrap();
            let pixels = renderer.read_pixels().unwrap();
            assert_eq!(pixels.len(), 64 * 4 * 4);

            let mut expected = source.to_vec();
            color::transform_rgba8(mode, &mut expected);
            for px in pixels.chunks_exact(4) {
                for (got, want) in px.iter().zip(expected.iter()) {
                    assert!((*got as i32 - *want as i32).abs() <= 2, "{mode}: {:?} vs {:?}", px, expected);
                }
            }
        }
        assert_eq!(renderer.frames_drawn(), 3);
    }
}
