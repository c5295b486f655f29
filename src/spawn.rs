//! Randomness for particle placement and motion.
//!
//! All random draws in the field go through [`FieldRng`] so that a run can
//! be made reproducible by seeding it.

use crate::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{PI, TAU};

/// Random source owned by the controller.
///
/// ```ignore
/// let mut rng = FieldRng::seeded(7);
/// let p = rng.random_in_polar_ball(100.0);
/// ```
#[derive(Clone, Debug)]
pub struct FieldRng {
    rng: SmallRng,
}

impl FieldRng {
    /// Deterministic generator for tests and replayable runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is set, entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Random f32 in `[0, 1)`.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Zero-mean step in `[-scale/2, scale/2)`.
    #[inline]
    pub fn jitter(&mut self, scale: f32) -> f32 {
        (self.random() - 0.5) * scale
    }

    /// Random point within `radius` of the origin.
    ///
    /// Azimuth, polar angle and radius are each drawn uniformly, so points
    /// crowd toward the center and along the polar axis.
    pub fn random_in_polar_ball(&mut self, radius: f32) -> Vec3 {
        let theta = self.random() * TAU;
        let phi = self.random() * PI;
        let r = self.random() * radius;

        Vec3::new(
            r * phi.sin() * theta.cos(),
            r * phi.sin() * theta.sin(),
            r * phi.cos(),
        )
    }
}
