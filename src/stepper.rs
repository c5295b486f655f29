//! Per-frame particle motion.
//!
//! Every particle takes an independent random step in x and y, then is
//! clamped back into the rectangle of the surface at the same index in the
//! current snapshot. There is no velocity: each frame is memoryless.

use crate::field::ParticleGroup;
use crate::spawn::FieldRng;
use crate::surface::SurfaceDescriptor;

/// Default random-walk step scale.
pub const DEFAULT_SPEED: f32 = 1.0;

/// Advances particle positions once per frame.
#[derive(Clone, Copy, Debug)]
pub struct SimulationStepper {
    pub speed: f32,
}

impl Default for SimulationStepper {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
        }
    }
}

impl SimulationStepper {
    pub fn new(speed: f32) -> Self {
        Self { speed }
    }

    /// Step every group that has a matching surface.
    ///
    /// Group `i` is clamped to `surfaces[i]`. When a surface opened or
    /// closed since the last rebuild the two lengths differ; indices past
    /// the shorter one are left untouched until the next rebuild.
    ///
    /// Returns the number of groups stepped.
    pub fn step(&self, groups: &mut [ParticleGroup], surfaces: &[SurfaceDescriptor], rng: &mut FieldRng) -> usize {
        let stepped = groups.len().min(surfaces.len());

        for (group, surface) in groups.iter_mut().zip(surfaces) {
            let shape = surface.shape;
            for p in group.points.iter_mut() {
                p.x += rng.jitter(self.speed);
                p.y += rng.jitter(self.speed);
                *p = shape.clamp_xy(*p);
            }
        }

        stepped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ParticleFieldManager;
    use crate::surface::{Shape, SurfaceId};

    fn surface(id: u64, shape: Shape) -> SurfaceDescriptor {
        SurfaceDescriptor::new(SurfaceId(id), shape)
    }

    #[test]
    fn test_z_never_changes() {
        let mut rng = FieldRng::seeded(21);
        let surfaces = vec![surface(1, Shape::new(0.0, 0.0, 400.0, 400.0))];
        let mut groups = ParticleFieldManager::default().build_groups(&surfaces, &mut rng);
        let z_before: Vec<f32> = groups[0].points.iter().map(|p| p.z).collect();

        let stepper = SimulationStepper::new(25.0);
        for _ in 0..50 {
            stepper.step(&mut groups, &surfaces, &mut rng);
        }

        let z_after: Vec<f32> = groups[0].points.iter().map(|p| p.z).collect();
        assert_eq!(z_before, z_after);
    }

    #[test]
    fn test_particles_follow_moved_surface() {
        let mut rng = FieldRng::seeded(22);
        let before = vec![surface(1, Shape::new(0.0, 0.0, 300.0, 300.0))];
        let mut groups = ParticleFieldManager::default().build_groups(&before, &mut rng);

        // Same membership, different geometry: no rebuild, just clamping.
        let after = vec![surface(1, Shape::new(2000.0, 500.0, 300.0, 300.0))];
        SimulationStepper::default().step(&mut groups, &after, &mut rng);

        assert!(groups[0].points.iter().all(|p| after[0].shape.contains(*p)));
    }

    #[test]
    fn test_zero_speed_only_clamps() {
        let mut rng = FieldRng::seeded(23);
        let surfaces = vec![surface(1, Shape::new(0.0, 0.0, 800.0, 600.0))];
        let mut groups = ParticleFieldManager::default().build_groups(&surfaces, &mut rng);
        let before = groups.clone();

        SimulationStepper::new(0.0).step(&mut groups, &surfaces, &mut rng);
        assert_eq!(before, groups);
    }

    #[test]
    fn test_empty_inputs() {
        let mut rng = FieldRng::seeded(24);
        let stepped = SimulationStepper::default().step(&mut [], &[], &mut rng);
        assert_eq!(stepped, 0);
    }
}
