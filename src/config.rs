//! Runtime configuration.
//!
//! Every tunable lives in [`FieldConfig`], which can be saved to and loaded
//! from JSON. Missing keys fall back to their defaults, so a config file
//! only needs the values it changes.

use crate::error::ConfigError;
use crate::field::{GroupLayout, BASE_RADIUS, HUE_STEP, PARTICLES_PER_GROUP, RADIUS_STEP};
use crate::offset::DEFAULT_FALLOFF;
use crate::stepper::DEFAULT_SPEED;
use crate::surface::Metadata;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the shared registry document inside the temp directory.
pub const REGISTRY_FILE_NAME: &str = "mwpf-registry.json";

/// Where and how often the shared registry is polled.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    pub path: PathBuf,
    pub poll_interval_ms: u64,
    /// Records without a heartbeat for this long are pruned.
    pub stale_after_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: std::env::temp_dir().join(REGISTRY_FILE_NAME),
            poll_interval_ms: 100,
            stale_after_ms: 3000,
        }
    }
}

impl RegistryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

/// Initial window attributes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "MWPF - Multi-Window Particle Field".into(),
            width: 800,
            height: 600,
        }
    }
}

/// Complete field configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldConfig {
    /// Offset easing factor per frame, in `(0, 1)`.
    pub falloff: f32,
    /// Random-walk step scale.
    pub speed: f32,
    pub particle_count: usize,
    pub hue_step: f32,
    pub base_radius: f32,
    pub radius_step: f32,
    /// Point sprite size in pixels.
    pub point_size: f32,
    /// Delay between the window becoming visible and reading its position.
    pub settle_delay_ms: u64,
    /// Fixed RNG seed; entropy when absent.
    pub seed: Option<u64>,
    /// Published with this surface's registry record.
    pub metadata: Metadata,
    pub registry: RegistryConfig,
    pub window: WindowConfig,
    /// Frame rate of the headless scheduler.
    pub headless_refresh_hz: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("foo".into(), "bar".into());

        Self {
            falloff: DEFAULT_FALLOFF,
            speed: DEFAULT_SPEED,
            particle_count: PARTICLES_PER_GROUP,
            hue_step: HUE_STEP,
            base_radius: BASE_RADIUS,
            radius_step: RADIUS_STEP,
            point_size: 2.0,
            settle_delay_ms: 500,
            seed: None,
            metadata,
            registry: RegistryConfig::default(),
            window: WindowConfig::default(),
            headless_refresh_hz: 60.0,
        }
    }
}

impl FieldConfig {
    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Group generation constants.
    pub fn layout(&self) -> GroupLayout {
        GroupLayout {
            particle_count: self.particle_count,
            hue_step: self.hue_step,
            base_radius: self.base_radius,
            radius_step: self.radius_step,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Frame period of the headless scheduler.
    pub fn headless_period(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.headless_refresh_hz.max(1.0))
    }
}
