//! Joint angle calculation using the dot product
//!
//! The angle at a joint is measured between the vectors vertex→p1 and
//! vertex→p3, so a straight limb reads 180° and a fully folded one reads 0°.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// A 2D coordinate in consumer-defined units (pixels or normalized)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Scale each axis independently
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
        }
    }
}

impl From<(f32, f32)> for Point2D {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Calculate the angle at `vertex` in degrees, in [0, 180]
///
/// Returns 0.0 when either arm has zero length. A 0.0 result therefore means
/// "undetermined" and must not be read as a fully folded joint; use
/// [`try_angle_at`] to get that distinction in the type.
pub fn angle_at(p1: Point2D, vertex: Point2D, p3: Point2D) -> f32 {
    try_angle_at(p1, vertex, p3).unwrap_or(0.0)
}

/// Angle at `vertex` in degrees, `None` when either arm has zero length
///
/// Uses cos(θ) = (v1 · v2) / (|v1| × |v2|), clamped before `acos`.
pub fn try_angle_at(p1: Point2D, vertex: Point2D, p3: Point2D) -> Option<f32> {
    let v1 = (p1.x - vertex.x, p1.y - vertex.y);
    let v2 = (p3.x - vertex.x, p3.y - vertex.y);

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();

    if mag1 == 0.0 || mag2 == 0.0 {
        trace!(
            "Degenerate joint geometry at ({}, {}), angle undetermined",
            vertex.x,
            vertex.y
        );
        return None;
    }

    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(cos_angle.acos().to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 0.05;

    #[test]
    fn test_straight_limb() {
        let angle = angle_at(
            Point2D::new(0.0, 0.0),
            Point2D::new(0.5, 0.0),
            Point2D::new(1.0, 0.0),
        );
        assert!((angle - 180.0).abs() < EPS);
    }

    #[test]
    fn test_right_angle() {
        let angle = angle_at(
            Point2D::new(0.0, 0.0),
            Point2D::new(0.5, 0.0),
            Point2D::new(0.5, 0.5),
        );
        assert!((angle - 90.0).abs() < EPS);
    }

    #[test]
    fn test_straight_limb_in_pixel_units() {
        // Equal arms, arbitrary orientation
        let angle = angle_at(
            Point2D::new(100.0, 400.0),
            Point2D::new(200.0, 300.0),
            Point2D::new(300.0, 200.0),
        );
        assert!((angle - 180.0).abs() < EPS);
    }

    #[test]
    fn test_acute_angle() {
        let angle = angle_at(
            Point2D::new(1.0, 0.0),
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 1.0),
        );
        assert!((angle - 45.0).abs() < EPS);
    }

    #[test]
    fn test_degenerate_arm_is_zero() {
        let vertex = Point2D::new(3.0, 4.0);
        assert_eq!(angle_at(vertex, vertex, Point2D::new(9.0, 9.0)), 0.0);
        assert_eq!(angle_at(Point2D::new(9.0, 9.0), vertex, vertex), 0.0);
        assert_eq!(try_angle_at(vertex, vertex, Point2D::new(9.0, 9.0)), None);
    }

    #[test]
    fn test_scaled_point() {
        let p = Point2D::new(0.5, 0.25).scaled(640.0, 480.0);
        assert_eq!(p, Point2D::new(320.0, 120.0));
    }
}
