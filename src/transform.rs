//! 2D affine transforms in homogeneous coordinates
//!
//! Transforms are built by chaining `translate`/`scale` calls; a point pushed
//! through the result goes through the operations in the order they were called.

use glam::{Mat3, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// A 3x3 homogeneous matrix describing a 2D affine map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D(pub Mat3);

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2D {
    pub fn identity() -> Self {
        Self(Mat3::IDENTITY)
    }

    /// `a ∘ b`: the result applies `b` first, then `a`
    pub fn multiply(a: &Self, b: &Self) -> Self {
        Self(a.0 * b.0)
    }

    /// Append a translation after the operations already in `self`
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::multiply(&Self(Mat3::from_translation(Vec2::new(dx, dy))), self)
    }

    /// Append a scale after the operations already in `self`
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self::multiply(&Self(Mat3::from_scale(Vec2::new(sx, sy))), self)
    }

    /// Map a point, including the homogeneous divide
    pub fn transform_point(&self, point: Vec2) -> Vec2 {
        let h = self.0 * Vec3::new(point.x, point.y, 1.0);
        Vec2::new(h.x / h.z, h.y / h.z)
    }

    /// Inverse map, if the matrix is invertible
    pub fn inverse(&self) -> Option<Self> {
        let det = self.0.determinant();
        if det.abs() <= f32::EPSILON {
            None
        } else {
            Some(Self(self.0.inverse()))
        }
    }
}

/// Axis-aligned rectangle in logical coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Rectangle hanging down from a top-left corner (y-up space)
    pub fn from_top_left(top_left: Vec2, size: Vec2) -> Self {
        Self {
            min: Vec2::new(top_left.x, top_left.y - size.y),
            max: Vec2::new(top_left.x + size.x, top_left.y),
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}
