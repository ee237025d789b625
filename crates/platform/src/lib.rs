//! Platform layer: windowing & event loop.
//!
//! One window, one renderer. The loop polls instead of waiting and redraws
//! every iteration until the window system asks to close.

use std::sync::Arc;

use anyhow::{Context, Result};
use corelib::{camera::Camera, spin::Spin};
use renderer::{GeometryData, GpuState, ProgramSources, RendererInit, Transforms};
use wgpu::SurfaceError;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

/// Initial window parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Project 01".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Everything the viewer needs before the first window exists.
pub struct ViewerSetup {
    pub window: WindowConfig,
    pub renderer: RendererInit,
    pub sources: ProgramSources,
    pub geometry: GeometryData,
    pub spin: Spin,
}

/// Open the window and run the render loop. Returns when the window is closed.
pub fn run_viewer(setup: ViewerSetup) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = Viewer::new(setup);
    event_loop
        .run_app(&mut app)
        .context("Event loop terminated with error")?;

    log::info!("Rendered {} frames", app.frames);
    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct Viewer {
    setup: ViewerSetup,
    camera: Camera,
    spin: Spin,
    frames: u64,
    fatal: Option<anyhow::Error>,

    // Dropped before the window.
    gpu: Option<GpuState>,
    window: Option<Arc<Window>>,
}

impl Viewer {
    fn new(setup: ViewerSetup) -> Self {
        let camera = Camera::viewer(Camera::aspect_for(setup.window.width, setup.window.height));
        let spin = setup.spin;
        Self {
            setup,
            camera,
            spin,
            frames: 0,
            fatal: None,
            gpu: None,
            window: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let cfg = &self.setup.window;
        let attrs = Window::default_attributes()
            .with_title(cfg.title.clone())
            .with_inner_size(PhysicalSize::new(cfg.width.max(1), cfg.height.max(1)));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("Failed to create window")?,
        );

        let PhysicalSize { width, height } = window.inner_size();
        log::info!("Window created: {}x{}", width, height);

        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            self.setup.renderer,
            &self.setup.sources,
            &self.setup.geometry,
        ))
        .context("Failed to initialize renderer")?;

        let (w, h) = gpu.size();
        self.camera = self.camera.with_aspect(Camera::aspect_for(w, h));
        self.gpu = Some(gpu);
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        self.spin.advance();
        let transforms = Transforms::new(self.spin.model(), &self.camera);

        match gpu.render(&transforms) {
            Ok(()) => self.frames += 1,
            Err(err) if GpuState::is_surface_lost(&err) => {
                log::warn!("Surface {err:?}; reconfiguring");
                gpu.recreate_surface();
            }
            Err(SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow::anyhow!("GPU out of memory while presenting"));
            }
            Err(err) => log::warn!("Skipping frame: {err}"),
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                log::debug!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                    let (w, h) = gpu.size();
                    self.camera = self.camera.with_aspect(Camera::aspect_for(w, h));
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.gpu = None;
        self.window = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_matches_viewer_defaults() {
        let cfg = WindowConfig::default();
        assert_eq!((cfg.width, cfg.height), (800, 600));
        assert_eq!(cfg.title, "Project 01");
    }
}
