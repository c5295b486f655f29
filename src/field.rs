//! Particle groups, one per known surface.
//!
//! Each surface in the registry snapshot owns a ball of particles centered
//! on its rectangle. Colour and size of a group depend only on the
//! surface's position in the snapshot, so the whole set is rebuilt from
//! scratch whenever membership changes.

use crate::scene::SceneState;
use crate::spawn::FieldRng;
use crate::surface::SurfaceDescriptor;
use crate::{Vec2, Vec3};

/// Particles generated for every group.
pub const PARTICLES_PER_GROUP: usize = 1000;
/// Hue advance between consecutive groups.
pub const HUE_STEP: f32 = 0.1;
/// Spread radius of group 0.
pub const BASE_RADIUS: f32 = 100.0;
/// Extra spread radius per group index.
pub const RADIUS_STEP: f32 = 50.0;

/// Constants that shape the generated groups.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupLayout {
    pub particle_count: usize,
    pub hue_step: f32,
    pub base_radius: f32,
    pub radius_step: f32,
}

impl Default for GroupLayout {
    fn default() -> Self {
        Self {
            particle_count: PARTICLES_PER_GROUP,
            hue_step: HUE_STEP,
            base_radius: BASE_RADIUS,
            radius_step: RADIUS_STEP,
        }
    }
}

impl GroupLayout {
    /// Hue of group `index`, wrapped to `[0, 1)`.
    pub fn hue(&self, index: usize) -> f32 {
        (index as f32 * self.hue_step).rem_euclid(1.0)
    }

    /// Spread radius of group `index`.
    pub fn spread_radius(&self, index: usize) -> f32 {
        self.base_radius + index as f32 * self.radius_step
    }
}

/// Particles belonging to one surface.
///
/// `points` are absolute desktop positions. `center` is where the ball was
/// placed; the owning rectangle itself is looked up in the live snapshot
/// each frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleGroup {
    /// Position of the owning surface in the snapshot the group was built
    /// from. Not a surface id.
    pub owner_index: usize,
    pub hue: f32,
    /// RGB colour, `HSL(hue, 1.0, 0.5)`.
    pub color: Vec3,
    pub spread_radius: f32,
    pub center: Vec2,
    pub points: Vec<Vec3>,
}

impl ParticleGroup {
    #[inline]
    pub fn particle_count(&self) -> usize {
        self.points.len()
    }
}

/// Builds the full set of groups from a registry snapshot.
#[derive(Clone, Debug, Default)]
pub struct ParticleFieldManager {
    layout: GroupLayout,
}

impl ParticleFieldManager {
    pub fn new(layout: GroupLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &GroupLayout {
        &self.layout
    }

    /// Discard every group in `scene` and create one per surface.
    ///
    /// Groups for surfaces that did not change are recreated too. The new
    /// list is built off to the side and swapped in whole.
    pub fn rebuild(&self, scene: &mut SceneState, surfaces: &[SurfaceDescriptor], rng: &mut FieldRng) {
        let groups = self.build_groups(surfaces, rng);
        log::info!(
            "rebuilt particle field: {} group(s), {} particle(s)",
            groups.len(),
            groups.iter().map(ParticleGroup::particle_count).sum::<usize>()
        );
        scene.replace_groups(groups);
    }

    /// Generate groups for `surfaces` in snapshot order.
    pub fn build_groups(&self, surfaces: &[SurfaceDescriptor], rng: &mut FieldRng) -> Vec<ParticleGroup> {
        surfaces
            .iter()
            .enumerate()
            .map(|(index, surface)| self.build_group(index, surface, rng))
            .collect()
    }

    fn build_group(&self, index: usize, surface: &SurfaceDescriptor, rng: &mut FieldRng) -> ParticleGroup {
        let hue = self.layout.hue(index);
        let spread_radius = self.layout.spread_radius(index);
        let center = surface.shape.center();
        let origin = center.extend(0.0);

        // Small windows can be narrower than the ball; start inside anyway.
        let points = (0..self.layout.particle_count)
            .map(|_| surface.shape.clamp_xy(origin + rng.random_in_polar_ball(spread_radius)))
            .collect();

        ParticleGroup {
            owner_index: index,
            hue,
            color: hsl_to_rgb(hue, 1.0, 0.5),
            spread_radius,
            center,
            points,
        }
    }
}

/// Convert HSL (all components in `[0, 1]`) to RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Vec3 {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let h6 = h.rem_euclid(1.0) * 6.0;
    let x = c * (1.0 - (h6 % 2.0 - 1.0).abs());
    let m = l - c * 0.5;

    let (r, g, b) = match h6 as u32 % 6 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Vec3::new(r + m, g + m, b + m)
}
