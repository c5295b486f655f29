//! Everything the controller renders, owned in one place.

use crate::field::ParticleGroup;
use crate::offset::OffsetTracker;

/// Particle groups plus the smoothed world offset.
///
/// Right after a rebuild there is exactly one group per surface in the
/// snapshot the rebuild used. Between rebuilds the snapshot can drift
/// ahead; the stepper tolerates that.
#[derive(Clone, Debug, Default)]
pub struct SceneState {
    groups: Vec<ParticleGroup>,
    pub offset: OffsetTracker,
}

impl SceneState {
    /// Empty field, zero offset.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &[ParticleGroup] {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> &mut [ParticleGroup] {
        &mut self.groups
    }

    /// Swap in a freshly built group list, returning the old one.
    ///
    /// The list is only ever replaced whole, never patched, so a reader
    /// sees either the old field or the new one.
    pub fn replace_groups(&mut self, groups: Vec<ParticleGroup>) -> Vec<ParticleGroup> {
        std::mem::replace(&mut self.groups, groups)
    }

    /// Total particles across all groups.
    pub fn particle_count(&self) -> usize {
        self.groups.iter().map(ParticleGroup::particle_count).sum()
    }
}
