//! Surface geometry shared between the registry and the field.
//!
//! Every coordinate here is in absolute desktop pixels. A surface's
//! rectangle is the area of the desktop its window covers.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form key/value data a surface attaches to its registry record.
pub type Metadata = BTreeMap<String, String>;

/// Screen-space rectangle of one surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub x: f32,
    pub y: f32,
    #[serde(rename = "w")]
    pub width: f32,
    #[serde(rename = "h")]
    pub height: f32,
}

impl Shape {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top-left corner.
    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Center of the rectangle.
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Whether `p.x`/`p.y` lie inside the rectangle (edges included).
    /// `p.z` is ignored.
    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// Clamp `p.x`/`p.y` into the rectangle, leaving `p.z` untouched.
    #[inline]
    pub fn clamp_xy(&self, p: Vec3) -> Vec3 {
        // max/min rather than f32::clamp, which panics on an inverted range
        Vec3::new(
            p.x.min(self.x + self.width).max(self.x),
            p.y.min(self.y + self.height).max(self.y),
            p.z,
        )
    }
}

/// Registry-assigned identity of a surface.
///
/// Only used to tell whether the set of surfaces changed. Particle groups
/// are keyed by position in the snapshot, not by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One known surface as seen in a registry snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceDescriptor {
    pub id: SurfaceId,
    pub shape: Shape,
}

impl SurfaceDescriptor {
    pub fn new(id: SurfaceId, shape: Shape) -> Self {
        Self { id, shape }
    }
}

/// True when two snapshots list different surfaces, or the same surfaces
/// in a different order.
pub fn membership_differs(a: &[SurfaceDescriptor], b: &[SurfaceDescriptor]) -> bool {
    a.len() != b.len() || a.iter().zip(b).any(|(l, r)| l.id != r.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center() {
        let shape = Shape::new(800.0, 0.0, 800.0, 600.0);
        assert_eq!(shape.center(), Vec2::new(1200.0, 300.0));
    }

    #[test]
    fn test_clamp_keeps_z() {
        let shape = Shape::new(0.0, 0.0, 100.0, 50.0);
        let p = shape.clamp_xy(Vec3::new(-5.0, 75.0, 42.0));
        assert_eq!(p, Vec3::new(0.0, 50.0, 42.0));
        assert!(shape.contains(p));
    }

    #[test]
    fn test_clamp_degenerate_rect() {
        let shape = Shape::new(10.0, 10.0, 0.0, 0.0);
        let p = shape.clamp_xy(Vec3::new(3.0, 30.0, 1.0));
        assert_eq!(p, Vec3::new(10.0, 10.0, 1.0));
    }

    #[test]
    fn test_shape_json_keys() {
        let json = serde_json::to_string(&Shape::new(1.0, 2.0, 3.0, 4.0)).unwrap();
        assert_eq!(json, r#"{"x":1.0,"y":2.0,"w":3.0,"h":4.0}"#);
    }

    #[test]
    fn test_membership_differs() {
        let a = vec![
            SurfaceDescriptor::new(SurfaceId(1), Shape::default()),
            SurfaceDescriptor::new(SurfaceId(2), Shape::default()),
        ];
        let mut moved = a.clone();
        moved[1].shape.x = 500.0;
        assert!(!membership_differs(&a, &moved));

        let swapped = vec![a[1].clone(), a[0].clone()];
        assert!(membership_differs(&a, &swapped));
        assert!(membership_differs(&a, &a[..1]));
    }
}
