//! Smoothed world offset of this surface.
//!
//! The rendered world is translated by the negative screen position of the
//! surface so that absolute desktop coordinates line up across windows.
//! When the window moves, the translation eases toward the new value
//! instead of jumping.

use glam::Vec2;

/// Default per-frame easing factor.
pub const DEFAULT_FALLOFF: f32 = 0.05;

/// Target/current pair for the world offset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OffsetState {
    /// Offset the surface wants (negated screen position).
    pub target: Vec2,
    /// Offset actually applied to the rendered world.
    pub current: Vec2,
}

/// Exponential smoothing of the world offset.
///
/// For a fixed target, each [`step`](Self::step) shrinks the remaining gap
/// by the factor `1 - falloff`, so the offset approaches the target
/// monotonically without overshooting.
#[derive(Clone, Debug, Default)]
pub struct OffsetTracker {
    state: OffsetState,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a new target. With `immediate` the current offset snaps to it,
    /// which avoids a visible slide on the first frame.
    pub fn set_target(&mut self, target: Vec2, immediate: bool) {
        self.state.target = target;
        if immediate {
            self.state.current = target;
        }
    }

    /// Move `current` a `falloff` fraction of the way toward `target`.
    ///
    /// `falloff` is expected in `(0, 1)`.
    pub fn step(&mut self, falloff: f32) {
        let gap = self.state.target - self.state.current;
        self.state.current += gap * falloff;
    }

    #[inline]
    pub fn current(&self) -> Vec2 {
        self.state.current
    }

    #[inline]
    pub fn target(&self) -> Vec2 {
        self.state.target
    }

    #[inline]
    pub fn state(&self) -> OffsetState {
        self.state
    }
}
