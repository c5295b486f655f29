//! The per-surface field controller.
//!
//! One frame, in order:
//! 1. refresh the registry snapshot
//! 2. drain registry events (membership rebuilds the field, own-shape
//!    changes retarget the offset)
//! 3. ease the world offset toward its target
//! 4. random-walk every particle inside its surface
//!
//! Rendering and rescheduling belong to whoever drives the loop.

use crate::config::FieldConfig;
use crate::error::RegistryError;
use crate::field::ParticleFieldManager;
use crate::registry::{Registry, RegistryEvent};
use crate::scene::SceneState;
use crate::spawn::FieldRng;
use crate::stepper::SimulationStepper;
use crate::surface::{Metadata, Shape, SurfaceId};
use crate::time::Time;
use crate::Vec2;
use std::sync::mpsc::{Receiver, TryRecvError};

/// World offset that lines this surface's origin up with the desktop.
#[inline]
pub fn offset_for(shape: &Shape) -> Vec2 {
    -shape.position()
}

/// Owns the scene and runs one surface's share of the field.
#[derive(Debug)]
pub struct FieldController {
    scene: SceneState,
    manager: ParticleFieldManager,
    stepper: SimulationStepper,
    rng: FieldRng,
    falloff: f32,
    events: Option<Receiver<RegistryEvent>>,
    rebuilds: u64,
}

impl FieldController {
    pub fn new(config: &FieldConfig, rng: FieldRng) -> Self {
        Self {
            scene: SceneState::new(),
            manager: ParticleFieldManager::new(config.layout()),
            stepper: SimulationStepper::new(config.speed),
            rng,
            falloff: config.falloff,
            events: None,
            rebuilds: 0,
        }
    }

    /// Controller seeded from `config.seed`.
    pub fn from_config(config: &FieldConfig) -> Self {
        Self::new(config, FieldRng::from_seed_option(config.seed))
    }

    /// Join the registry, build the first field and snap the offset to
    /// this surface's position.
    pub fn start<R: Registry + ?Sized>(
        &mut self,
        registry: &mut R,
        metadata: Metadata,
        own_shape: Shape,
    ) -> Result<SurfaceId, RegistryError> {
        let id = registry.init(metadata, own_shape)?;
        self.events = Some(registry.subscribe());
        self.rebuild(registry);
        self.scene.offset.set_target(offset_for(&own_shape), true);
        log::info!("field started for surface {} at {:?}", id, own_shape);
        Ok(id)
    }

    /// Run steps 1-4 of a frame.
    pub fn frame<R: Registry + ?Sized>(&mut self, registry: &mut R, time: &Time) {
        if let Err(e) = registry.update() {
            log::warn!("registry update failed on frame {}: {}", time.frame(), e);
        }

        self.drain_events(registry);
        self.scene.offset.step(self.falloff);
        self.stepper
            .step(self.scene.groups_mut(), registry.windows(), &mut self.rng);
    }

    /// Keep this surface's registry record fresh between frames. Events
    /// raised here stay queued for the next frame.
    pub fn heartbeat<R: Registry + ?Sized>(&mut self, registry: &mut R) {
        if !self.is_started() {
            return;
        }
        if let Err(e) = registry.update() {
            log::warn!("registry heartbeat failed: {}", e);
        }
    }

    /// Apply every pending registry event. Several membership changes in
    /// one frame cause a single rebuild.
    pub fn drain_events<R: Registry + ?Sized>(&mut self, registry: &R) {
        let Some(events) = self.events.as_ref() else { return };

        let mut membership_changed = false;
        let mut disconnected = false;
        loop {
            match events.try_recv() {
                Ok(RegistryEvent::MembershipChanged) => membership_changed = true,
                Ok(RegistryEvent::ShapeChanged { shape, immediate }) => {
                    self.scene.offset.set_target(offset_for(&shape), immediate);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        if disconnected {
            log::warn!("registry event channel closed");
            self.events = None;
        }

        if membership_changed {
            self.rebuild(registry);
        }
    }

    /// Rebuild every group from the registry's current snapshot.
    pub fn rebuild<R: Registry + ?Sized>(&mut self, registry: &R) {
        self.manager
            .rebuild(&mut self.scene, registry.windows(), &mut self.rng);
        self.rebuilds += 1;
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    /// Translation applied to the rendered world this frame.
    pub fn world_offset(&self) -> Vec2 {
        self.scene.offset.current()
    }

    /// Number of rebuilds so far, the initial one included.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn is_started(&self) -> bool {
        self.events.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::registry::{FileRegistry, MemoryPool};
    use std::fs;
    use std::time::{Duration, SystemTime};

    fn config() -> FieldConfig {
        FieldConfig {
            particle_count: 50,
            seed: Some(17),
            ..FieldConfig::default()
        }
    }

    #[test]
    fn test_start_snaps_offset() {
        let pool = MemoryPool::new();
        let mut registry = pool.client();
        let mut controller = FieldController::from_config(&config());

        controller
            .start(&mut registry, Metadata::new(), Shape::new(300.0, 200.0, 800.0, 600.0))
            .unwrap();

        assert_eq!(controller.world_offset(), Vec2::new(-300.0, -200.0));
        assert_eq!(controller.scene().groups().len(), 1);
        assert_eq!(controller.rebuilds(), 1);
    }

    #[test]
    fn test_shape_event_eases_offset() {
        let pool = MemoryPool::new();
        let mut registry = pool.client();
        let mut controller = FieldController::from_config(&config());
        let time = Time::with_origin(SystemTime::now());
        controller
            .start(&mut registry, Metadata::new(), Shape::new(0.0, 0.0, 800.0, 600.0))
            .unwrap();

        registry.set_own_shape(Shape::new(100.0, 0.0, 800.0, 600.0));
        controller.frame(&mut registry, &time);

        assert_eq!(controller.scene().offset.target(), Vec2::new(-100.0, 0.0));
        assert!((controller.world_offset().x - -5.0).abs() < 1e-4);
    }

    #[test]
    fn test_several_joins_rebuild_once() {
        let pool = MemoryPool::new();
        let mut registry = pool.client();
        let mut controller = FieldController::from_config(&config());
        let time = Time::with_origin(SystemTime::now());
        controller
            .start(&mut registry, Metadata::new(), Shape::new(0.0, 0.0, 800.0, 600.0))
            .unwrap();

        let mut others: Vec<_> = (1..=3).map(|_| pool.client()).collect();
        for (i, other) in others.iter_mut().enumerate() {
            other
                .init(Metadata::new(), Shape::new(800.0 * (i + 1) as f32, 0.0, 800.0, 600.0))
                .unwrap();
        }

        controller.frame(&mut registry, &time);
        assert_eq!(controller.scene().groups().len(), 4);
        assert_eq!(controller.rebuilds(), 2);
    }

    #[test]
    fn test_frame_before_start_is_harmless() {
        let pool = MemoryPool::new();
        let mut registry = pool.client();
        let mut controller = FieldController::from_config(&config());
        let time = Time::with_origin(SystemTime::now());

        controller.frame(&mut registry, &time);
        assert!(controller.scene().groups().is_empty());
        assert!(!controller.is_started());
    }

    #[test]
    fn test_failed_start_is_not_started() {
        let blocker = std::env::temp_dir().join(format!("mwpf-controller-{}-blocker", std::process::id()));
        fs::write(&blocker, "").unwrap();
        let mut registry = FileRegistry::at(blocker.join("registry.json"));
        let mut controller = FieldController::from_config(&config());
        let time = Time::with_origin(SystemTime::now());

        let result = controller.start(&mut registry, Metadata::new(), Shape::new(0.0, 0.0, 800.0, 600.0));
        assert!(result.is_err());
        assert!(!controller.is_started());

        controller.frame(&mut registry, &time);
        assert!(controller.scene().groups().is_empty());

        drop(registry);
        let _ = fs::remove_file(&blocker);
    }

    #[test]
    fn test_heartbeat_keeps_record_alive_without_frames() {
        let path = std::env::temp_dir().join(format!("mwpf-controller-{}-heartbeat.json", std::process::id()));
        let _ = fs::remove_file(&path);
        let registry_config = RegistryConfig {
            path: path.clone(),
            poll_interval_ms: 0,
            stale_after_ms: 500,
        };

        let mut registry = FileRegistry::new(&registry_config);
        let mut controller = FieldController::from_config(&config());
        controller
            .start(&mut registry, Metadata::new(), Shape::new(0.0, 0.0, 800.0, 600.0))
            .unwrap();

        let mut other = FileRegistry::new(&registry_config);
        other
            .init(Metadata::new(), Shape::new(800.0, 0.0, 800.0, 600.0))
            .unwrap();

        // Longer than `stale_after` in total, no frame rendered.
        for _ in 0..8 {
            std::thread::sleep(Duration::from_millis(100));
            controller.heartbeat(&mut registry);
            other.update().unwrap();
        }
        assert_eq!(other.windows().len(), 2);

        // The membership change is still waiting for the next frame.
        assert_eq!(controller.scene().groups().len(), 1);
        controller.frame(&mut registry, &Time::with_origin(SystemTime::now()));
        assert_eq!(controller.scene().groups().len(), 2);

        drop(other);
        drop(registry);
        let _ = fs::remove_file(&path);
    }
}
