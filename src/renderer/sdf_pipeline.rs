//! SDF-based WebGPU render pipeline
//!
//! Ray-marches the whole scene in the fragment shader: floor, walls and every
//! body as a signed distance field. One fullscreen triangle per frame.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use super::{FrameView, RenderError, RenderSurface};
use crate::consts::MAX_BODIES;
use crate::settings::QualityPreset;
use crate::sim::BodyShape;

/// Fixed camera position, looking at the arena centre
const CAMERA_POS: [f32; 3] = [0.0, 13.0, 10.5];
/// Camera offset at full shake
const SHAKE_AMPLITUDE: f32 = 0.25;

// ============================================================================
// GPU DATA STRUCTURES (must match shader)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Globals {
    resolution: [f32; 2], // offset 0
    time: f32,            // offset 8
    body_count: u32,      // offset 12
    camera_pos: [f32; 3], // offset 16 (vec3 aligned to 16)
    fov_y: f32,           // offset 28
    arena_half_size: f32, // offset 32
    wall_height: f32,     // offset 36
    camera_shake: f32,    // offset 40
    march_steps: u32,     // offset 44
    shadows: u32,         // offset 48
    _pad: [u32; 3],       // pad to 64 bytes
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct BodyData {
    position: [f32; 3],
    kind: u32, // 0 = die, 1 = coin
    rotation: [f32; 4],
    /// Die: half extents. Coin: radius, half height.
    dims: [f32; 4],
}

impl BodyData {
    const EMPTY: Self = Self {
        position: [0.0; 3],
        kind: 0,
        rotation: [0.0, 0.0, 0.0, 1.0],
        dims: [0.0; 4],
    };
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(e: wgpu::SurfaceError) -> Self {
        match e {
            wgpu::SurfaceError::Lost => RenderError::Lost,
            wgpu::SurfaceError::Outdated => RenderError::Outdated,
            wgpu::SurfaceError::OutOfMemory => RenderError::OutOfMemory,
            other => RenderError::Other(other.to_string()),
        }
    }
}

// ============================================================================
// SDF RENDER STATE
// ============================================================================

pub struct SdfRenderState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub pipeline: wgpu::RenderPipeline,

    globals_buffer: wgpu::Buffer,
    bodies_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,

    pub size: (u32, u32),
    quality: QualityPreset,
    released: bool,
}

impl SdfRenderState {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
        quality: QualityPreset,
    ) -> Result<Self, RenderError> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("sdf-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await
            .map_err(|e| RenderError::Other(e.to_string()))?;

        let surface_caps = surface.get_capabilities(adapter);
        log::info!("Surface formats: {:?}", surface_caps.formats);

        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::Other("surface has no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        log::info!("Using surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sdf_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sdf_shader.wgsl").into()),
        });

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("globals"),
            contents: bytemuck::bytes_of(&Globals::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // uniform rather than storage so the WebGL2 fallback works
        let bodies_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bodies"),
            contents: bytemuck::cast_slice(&[BodyData::EMPTY; MAX_BODIES]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sdf_bind_group_layout"),
            entries: &[uniform_entry(0), uniform_entry(1)],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sdf_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bodies_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sdf_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sdf_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[], // fullscreen triangle
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::info!("SDF pipeline ready at {}x{}", width, height);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            globals_buffer,
            bodies_buffer,
            bind_group,
            size: (width, height),
            quality,
            released: false,
        })
    }

    fn globals(&self, frame: &FrameView<'_>, body_count: u32) -> Globals {
        // time is ms since page load, convert to seconds
        let time = (frame.time_ms / 1000.0) as f32;
        let shake = frame.camera_shake * SHAKE_AMPLITUDE;
        let wobble = Vec3::new((time * 71.0).sin(), (time * 53.0).cos(), (time * 67.0).sin());
        let camera = Vec3::from_array(CAMERA_POS) + wobble * shake;

        Globals {
            resolution: [self.size.0 as f32, self.size.1 as f32],
            time,
            body_count,
            camera_pos: camera.to_array(),
            fov_y: frame.projection.fov_y,
            arena_half_size: frame.arena_half_size,
            wall_height: frame.wall_height,
            camera_shake: frame.camera_shake,
            march_steps: self.quality.march_steps(),
            shadows: u32::from(self.quality.shadows_enabled()),
            _pad: [0; 3],
        }
    }
}

fn body_data(shape: BodyShape, position: Vec3, rotation: glam::Quat) -> BodyData {
    let (kind, dims) = match shape {
        BodyShape::Box { half_extents } => (0, half_extents.extend(0.0).to_array()),
        BodyShape::Cylinder { radius, height } => (1, [radius, height * 0.5, 0.0, 0.0]),
    };
    BodyData {
        position: position.to_array(),
        kind,
        rotation: rotation.to_array(),
        dims,
    }
}

impl RenderSurface for SdfRenderState {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 && !self.released {
            self.size = (new_width, new_height);
            self.config.width = new_width;
            self.config.height = new_height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Update GPU buffers from the frame and render
    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), RenderError> {
        if self.released {
            return Ok(());
        }

        let mut bodies = [BodyData::EMPTY; MAX_BODIES];
        let mut body_count = 0u32;
        for (slot, visual) in bodies.iter_mut().zip(frame.visuals()) {
            *slot = body_data(visual.shape(), visual.position(), visual.orientation());
            body_count += 1;
        }

        let globals = self.globals(frame, body_count);
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        self.queue
            .write_buffer(&self.bodies_buffer, 0, bytemuck::cast_slice(&bodies));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sdf_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sdf_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Fullscreen triangle
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.globals_buffer.destroy();
        self.bodies_buffer.destroy();
        log::info!("SDF pipeline released");
    }
}
