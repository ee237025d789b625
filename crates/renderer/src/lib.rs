//! Renderer: wgpu init, shader program, mesh upload and per-frame drawing.
//! wgpu = 23.x, winit = 0.30.x

pub mod geometry;
pub mod shader;

use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{Context, Result};
use asset::shader::ShaderSource;
use bytemuck::{Pod, Zeroable};
use corelib::{Mat4, camera::Camera};
use wgpu::{
    BindGroup, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, Buffer,
    BufferBindingType, BufferUsages, CommandEncoderDescriptor, Device, DeviceDescriptor,
    Features, Instance, InstanceDescriptor, Limits, LoadOp, Operations,
    PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, ShaderStages, StoreOp, Surface, SurfaceConfiguration, SurfaceError,
    TextureFormat, TextureUsages, util::DeviceExt,
};
use winit::{dpi::PhysicalSize, window::Window};

pub use geometry::{DrawMode, GeometryData};
pub use shader::{Program, ProgramStatus, ShaderError, ShaderFailurePolicy};

/// Model/view/projection block (three column-major mat4, 192 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Transforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

impl Transforms {
    pub fn new(model: Mat4, camera: &Camera) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view: camera.view().to_cols_array_2d(),
            projection: camera.proj().to_cols_array_2d(),
        }
    }
}

/// Options fixed at GPU init.
#[derive(Clone, Copy, Debug)]
pub struct RendererInit {
    pub backends: wgpu::Backends,
    pub shader_policy: ShaderFailurePolicy,
}

impl Default for RendererInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            shader_policy: ShaderFailurePolicy::default(),
        }
    }
}

/// Vertex + fragment sources for the single program.
#[derive(Clone, Debug)]
pub struct ProgramSources {
    pub vertex: ShaderSource,
    pub fragment: ShaderSource,
}

const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Program & geometry
    program: Program,
    geometry: geometry::GpuGeometry,

    // Uniforms
    transforms_buf: Buffer,
    transforms_bg: BindGroup,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>, compile and link the program
    /// and upload `geometry`.
    pub async fn new(
        window: Arc<Window>,
        init: RendererInit,
        sources: &ProgramSources,
        geometry: &GeometryData,
    ) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("Adapter: {} ({:?}, {})", info.name, info.backend, info.driver_info);

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Meshview Device"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("Failed to request device")?;

        // Anything not caught by an error scope ends up here instead of panicking.
        device.on_uncaptured_error(Box::new(|err| {
            log::error!("Uncaptured wgpu error: {err}");
        }));

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(TextureFormat::is_srgb)
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no supported formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .context("Surface reports no alpha modes")?;
        log::info!("Surface format: {surface_format:?}");

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        // ==== Uniforms ====
        let transforms_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Transforms BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<Transforms>() as u64),
                },
                count: None,
            }],
        });
        let transforms_init = Transforms::new(
            Mat4::IDENTITY,
            &Camera::viewer(Camera::aspect_for(width, height)),
        );
        let transforms_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Transforms UBO"),
            contents: bytemuck::bytes_of(&transforms_init),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let transforms_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Transforms BG"),
            layout: &transforms_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: transforms_buf.as_entire_binding(),
            }],
        });

        // ==== Program ====
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Mesh PipelineLayout"),
            bind_group_layouts: &[&transforms_bgl],
            push_constant_ranges: &[],
        });
        let vs = shader::compile(&device, &sources.vertex, init.shader_policy).await?;
        let fs = shader::compile(&device, &sources.fragment, init.shader_policy).await?;
        let program = shader::ProgramBuilder::new("Mesh Program")
            .attach(vs)
            .attach(fs)
            .link(&device, &pipeline_layout, surface_format, init.shader_policy)
            .await?;

        // ==== Geometry ====
        let geometry = geometry.upload(&device);

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            program,
            geometry,
            transforms_buf,
            transforms_bg,
            width,
            height,
        })
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Resize: reconfigure the surface.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Render one frame: upload transforms, clear, draw the mesh once.
    pub fn render(&mut self, transforms: &Transforms) -> Result<(), SurfaceError> {
        self.queue
            .write_buffer(&self.transforms_buf, 0, bytemuck::bytes_of(transforms));

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            // A program that failed to link draws nothing.
            if self.program.is_usable() {
                rpass.set_pipeline(&self.program.pipeline);
                rpass.set_bind_group(0, &self.transforms_bg, &[]);
                self.geometry.draw(&mut rpass);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_block_is_three_mat4() {
        assert_eq!(std::mem::size_of::<Transforms>(), 192);
    }

    #[test]
    fn transforms_keep_model_view_projection_order() {
        let camera = Camera::viewer(4.0 / 3.0);
        let model = Mat4::from_rotation_y(1.0);
        let t = Transforms::new(model, &camera);
        assert_eq!(t.model, model.to_cols_array_2d());
        assert_eq!(t.view, camera.view().to_cols_array_2d());
        assert_eq!(t.projection, camera.proj().to_cols_array_2d());

        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&t));
        assert_eq!(floats[..16], model.to_cols_array());
    }

    #[test]
    fn lost_and_outdated_surfaces_are_recoverable() {
        assert!(GpuState::is_surface_lost(&SurfaceError::Lost));
        assert!(GpuState::is_surface_lost(&SurfaceError::Outdated));
        assert!(!GpuState::is_surface_lost(&SurfaceError::OutOfMemory));
    }
}
