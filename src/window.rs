//! Windowed host: one winit window showing its share of the field.

use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow},
    window::{Window, WindowId},
};

use crate::config::FieldConfig;
use crate::controller::FieldController;
use crate::error::AppError;
use crate::gpu::GpuState;
use crate::registry::Registry;
use crate::startup::StartupGuard;
use crate::surface::Shape;
use crate::time::Time;

/// Seconds between FPS log lines.
const FPS_LOG_INTERVAL: f32 = 5.0;

/// Desktop-space rectangle of the window's client area.
fn window_shape(window: &Window) -> Shape {
    let position = window
        .inner_position()
        .or_else(|_| window.outer_position())
        .unwrap_or(PhysicalPosition::new(0, 0));
    let size = window.inner_size();
    Shape::new(
        position.x as f32,
        position.y as f32,
        size.width as f32,
        size.height as f32,
    )
}

pub struct App {
    config: FieldConfig,
    registry: Box<dyn Registry>,
    controller: FieldController,
    guard: StartupGuard,
    time: Time,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    fps_timer: Instant,
    error: Option<AppError>,
}

impl App {
    pub fn new(config: FieldConfig, registry: Box<dyn Registry>, controller: FieldController) -> Self {
        let guard = StartupGuard::new(config.settle_delay());
        Self {
            config,
            registry,
            controller,
            guard,
            time: Time::new(),
            window: None,
            gpu_state: None,
            fps_timer: Instant::now(),
            error: None,
        }
    }

    /// First fatal error raised inside the event loop, if any.
    pub fn take_error(&mut self) -> Option<AppError> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: AppError) {
        log::error!("{}", error);
        self.error.get_or_insert(error);
        event_loop.exit();
    }

    fn report_shape(&mut self) {
        if let Some(window) = &self.window {
            self.registry.set_own_shape(window_shape(window));
        }
    }

    fn start_field(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.clone() else { return };
        let shape = window_shape(&window);
        let metadata = self.config.metadata.clone();

        match self.controller.start(&mut self.registry, metadata, shape) {
            Ok(id) => {
                window.set_title(&format!("{} {}", self.config.window.title, id));
                window.request_redraw();
            }
            Err(e) => self.fail(event_loop, e.into()),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if self.controller.is_started() {
            self.time.update();
            self.controller.frame(&mut self.registry, &self.time);
        }

        if let Some(gpu_state) = &mut self.gpu_state {
            let groups = self.controller.scene().groups();
            let offset = self.controller.world_offset();
            match gpu_state.render(groups, offset, self.time.elapsed() as f32) {
                Ok(_) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    gpu_state.reconfigure()
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("surface out of memory");
                    event_loop.exit();
                }
                Err(e) => log::warn!("render error: {:?}", e),
            }
        }

        if self.fps_timer.elapsed().as_secs_f32() >= FPS_LOG_INTERVAL {
            log::info!(
                "FPS: {:.1}, {} particles",
                self.time.fps(),
                self.controller.scene().particle_count()
            );
            self.fps_timer = Instant::now();
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match pollster::block_on(GpuState::new(window.clone(), self.config.point_size)) {
            Ok(gpu_state) => self.gpu_state = Some(gpu_state),
            Err(e) => return self.fail(event_loop, e.into()),
        }

        self.guard
            .on_load(window.is_visible().unwrap_or(true), Instant::now());
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::Occluded(occluded) => {
                self.guard.on_visibility_change(!occluded, Instant::now());
            }
            WindowEvent::Moved(_) => self.report_shape(),
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
                self.report_shape();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.guard.poll(Instant::now()) {
            self.start_field(event_loop);
        }

        if self.controller.is_started() {
            // Redraws stall while the window is hidden or minimised.
            self.controller.heartbeat(&mut self.registry);
            let next = Instant::now() + self.config.registry.poll_interval();
            event_loop.set_control_flow(ControlFlow::WaitUntil(next));
            return;
        }

        match self.guard.deadline() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}
