//! Orthographic camera in surface pixels.

use glam::{Mat4, Vec2, Vec3};

/// Near clip plane.
pub const NEAR: f32 = -10_000.0;
/// Far clip plane.
pub const FAR: f32 = 10_000.0;

/// Maps one surface's pixel rectangle onto the viewport.
///
/// Left is `0`, right is the surface width, top is `0` and bottom is the
/// surface height, so y grows downward like desktop coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrthoCamera {
    width: f32,
    height: f32,
    pub near: f32,
    pub far: f32,
}

impl OrthoCamera {
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Self {
            width: 1.0,
            height: 1.0,
            near: NEAR,
            far: FAR,
        };
        camera.resize(width, height);
        camera
    }

    /// Update the viewport size. Zero dimensions are clamped to one pixel
    /// so the projection never degenerates.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1) as f32;
        self.height = height.max(1) as f32;
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh(0.0, self.width, self.height, 0.0, self.near, self.far)
    }

    /// Projection times a translation of the world by `offset`.
    pub fn view_proj(&self, offset: Vec2) -> Mat4 {
        self.projection() * Mat4::from_translation(Vec3::new(offset.x, offset.y, 0.0))
    }
}

impl Default for OrthoCamera {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn clip(camera: &OrthoCamera, offset: Vec2, p: Vec3) -> Vec3 {
        let v = camera.view_proj(offset) * Vec4::new(p.x, p.y, p.z, 1.0);
        v.truncate() / v.w
    }

    #[test]
    fn test_corners_map_to_clip_space() {
        let camera = OrthoCamera::new(800, 600);
        let top_left = clip(&camera, Vec2::ZERO, Vec3::ZERO);
        let bottom_right = clip(&camera, Vec2::ZERO, Vec3::new(800.0, 600.0, 0.0));

        assert!((top_left.x - -1.0).abs() < 1e-5 && (top_left.y - 1.0).abs() < 1e-5);
        assert!((bottom_right.x - 1.0).abs() < 1e-5 && (bottom_right.y - -1.0).abs() < 1e-5);
    }

    #[test]
    fn test_offset_lines_up_desktop_coordinates() {
        // A surface at desktop (800, 0) sees desktop x=800 at its left edge.
        let camera = OrthoCamera::new(800, 600);
        let p = clip(&camera, Vec2::new(-800.0, 0.0), Vec3::new(800.0, 0.0, 0.0));
        assert!((p.x - -1.0).abs() < 1e-5);
    }

    #[test]
    fn test_depth_range_visible() {
        let camera = OrthoCamera::new(100, 100);
        for z in [-400.0, 0.0, 400.0] {
            let p = clip(&camera, Vec2::ZERO, Vec3::new(50.0, 50.0, z));
            assert!((0.0..=1.0).contains(&p.z), "z {z} mapped to depth {}", p.z);
        }
    }

    #[test]
    fn test_zero_size_clamped() {
        let mut camera = OrthoCamera::new(800, 600);
        camera.resize(0, 0);
        assert_eq!(camera.width(), 1.0);
        assert_eq!(camera.height(), 1.0);
        assert!(camera.projection().is_finite());
    }
}
