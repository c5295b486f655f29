//! Field builder and runner

use crate::config::FieldConfig;
use crate::controller::FieldController;
use crate::error::AppError;
use crate::registry::{FileRegistry, Registry};
use crate::scheduler::{FrameScheduler, Interval};
use crate::surface::Shape;
use crate::window::App;
use winit::event_loop::{ControlFlow, EventLoop};

/// A multi-window particle field.
///
/// Use method chaining to configure, then call `.run()` to open a window
/// and join the shared field.
///
/// ```ignore
/// Simulation::new()
///     .with_config(FieldConfig::load("field.json")?)
///     .with_seed(7)
///     .run()?;
/// ```
pub struct Simulation {
    config: FieldConfig,
    registry: Option<Box<dyn Registry>>,
}

impl Simulation {
    /// Create a field with default settings.
    pub fn new() -> Self {
        Self {
            config: FieldConfig::default(),
            registry: None,
        }
    }

    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a specific surface pool instead of the file registry named in
    /// the config.
    pub fn with_registry(mut self, registry: Box<dyn Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Fix the particle RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    fn into_parts(self) -> (FieldConfig, Box<dyn Registry>, FieldController) {
        let registry = match self.registry {
            Some(registry) => registry,
            None => Box::new(FileRegistry::new(&self.config.registry)),
        };
        let controller = FieldController::from_config(&self.config);
        (self.config, registry, controller)
    }

    /// Open the window and run until it is closed.
    pub fn run(self) -> Result<(), AppError> {
        let (config, registry, controller) = self.into_parts();

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let mut app = App::new(config, registry, controller);
        event_loop.run_app(&mut app)?;

        match app.take_error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run `frames` frames without a window, at the configured headless
    /// refresh rate. The surface occupies the configured window size at the
    /// desktop origin.
    ///
    /// Returns the number of frames run.
    pub fn run_headless(self, frames: u64) -> Result<u64, AppError> {
        let shape = Shape::new(
            0.0,
            0.0,
            self.config.window.width as f32,
            self.config.window.height as f32,
        );
        let period = self.config.headless_period();
        let (config, mut registry, mut controller) = self.into_parts();

        let id = controller.start(&mut registry, config.metadata.clone(), shape)?;
        log::info!("headless surface {} running {} frames", id, frames);

        let mut scheduler = FrameScheduler::new(Interval::new(period).with_limit(frames));
        let ran = scheduler.run_forever(|time| {
            controller.frame(&mut registry, time);
            if time.frame() % 60 == 0 {
                log::debug!(
                    "frame {}: {} groups, offset {:?}",
                    time.frame(),
                    controller.scene().groups().len(),
                    controller.world_offset()
                );
            }
        });

        log::info!("headless surface {} finished after {} frames", id, ran);
        Ok(ran)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryPool;

    #[test]
    fn test_headless_runs_requested_frames() {
        let pool = MemoryPool::new();
        let config = FieldConfig {
            particle_count: 20,
            headless_refresh_hz: 1000.0,
            ..FieldConfig::default()
        };

        let ran = Simulation::new()
            .with_config(config)
            .with_registry(Box::new(pool.client()))
            .with_seed(5)
            .run_headless(3)
            .unwrap();

        assert_eq!(ran, 3);
        // The headless surface leaves the pool when it is dropped.
        assert!(pool.is_empty());
    }

    #[test]
    fn test_with_seed_sets_config() {
        let sim = Simulation::new().with_seed(42);
        assert_eq!(sim.config().seed, Some(42));
    }
}
