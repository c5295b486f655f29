//! # MWPF - Multi-Window Particle Field
//!
//! One particle field spanning every open window on the desktop.
//!
//! Each window joins a shared surface pool and renders the same world,
//! translated by its own desktop position. Moving a window slides the
//! view; opening or closing one regenerates the field with one particle
//! group per window.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mwpf::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     env_logger::init();
//!     Simulation::new()
//!         .with_config(FieldConfig::default())
//!         .run()
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Surfaces
//!
//! A surface is one window, described by a [`Shape`] in desktop pixels
//! and identified by a [`SurfaceId`]. A [`Registry`] keeps every live
//! surface in join order and reports changes as [`RegistryEvent`]s.
//!
//! | Backend | Scope |
//! |---------|-------|
//! | [`FileRegistry`] | every process sharing one JSON document |
//! | [`MemoryRegistry`] | clients of one in-process [`MemoryPool`] |
//!
//! ### Groups
//!
//! Surface `i` owns group `i`: a cloud of points around its center with
//! hue `i * 0.1` and spread radius `100 + i * 50`. Each frame every
//! point takes a small random step and is clamped back into its
//! surface.
//!
//! ### Offset
//!
//! The world is drawn translated by `-position` of the owning surface.
//! The offset eases toward its target by a fixed fraction each frame, so
//! moving a window glides the view instead of jumping.
//!
//! ## Headless runs
//!
//! ```ignore
//! let frames = Simulation::new().with_seed(7).run_headless(600)?;
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod field;
pub mod gpu;
pub mod offset;
pub mod registry;
pub mod scene;
pub mod scheduler;
mod simulation;
pub mod spawn;
pub mod startup;
pub mod stepper;
pub mod surface;
pub mod time;
mod window;

pub use config::{FieldConfig, RegistryConfig, WindowConfig};
pub use controller::FieldController;
pub use error::{AppError, ConfigError, GpuError, RegistryError};
pub use field::{GroupLayout, ParticleFieldManager, ParticleGroup};
pub use glam::{Vec2, Vec3};
pub use offset::{OffsetState, OffsetTracker};
pub use registry::{FileRegistry, MemoryPool, MemoryRegistry, Registry, RegistryEvent};
pub use scene::SceneState;
pub use simulation::Simulation;
pub use spawn::FieldRng;
pub use startup::{LaunchMode, LaunchOptions, StartupGuard};
pub use stepper::SimulationStepper;
pub use surface::{Metadata, Shape, SurfaceDescriptor, SurfaceId};
pub use time::Time;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::config::FieldConfig;
    pub use crate::error::AppError;
    pub use crate::registry::{FileRegistry, MemoryPool, Registry};
    pub use crate::simulation::Simulation;
    pub use crate::surface::{Shape, SurfaceId};
    pub use crate::{Vec2, Vec3};
}
