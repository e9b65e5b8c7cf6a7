use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Tolerance, in degrees, for treating an angle as a multiple of 90.
pub const GRID_ANGLE_TOLERANCE: f64 = 1e-9;

/// A rigid placement transform.
///
/// Applied to a point as: mirror about the x axis (if set), then rotate
/// counter-clockwise by `rotation` degrees about the origin, then translate
/// by `offset`. The rotation is continuous; nothing here restricts it to
/// multiples of 90.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation offset.
    pub offset: Point,
    /// Rotation in degrees, normalized to [0, 360).
    pub rotation: f64,
    /// Mirror about the x axis, applied before rotation.
    pub mirror_x: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(offset: Point, rotation: f64, mirror_x: bool) -> Self {
        Self {
            offset,
            rotation: normalize_angle(rotation),
            mirror_x,
        }
    }

    pub fn identity() -> Self {
        Self {
            offset: Point::origin(),
            rotation: 0.0,
            mirror_x: false,
        }
    }

    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            offset: Point::new(x, y),
            ..Self::identity()
        }
    }

    /// Rotation about the origin.
    pub fn rotation(angle: f64) -> Self {
        Self::new(Point::origin(), angle, false)
    }

    /// Reflection about the x axis.
    pub fn mirror() -> Self {
        Self {
            mirror_x: true,
            ..Self::identity()
        }
    }

    /// Whether the rotation lies on the 90-degree grid.
    pub fn is_manhattan(&self) -> bool {
        is_grid_angle(self.rotation)
    }

    /// Apply the linear part (mirror and rotation) only.
    pub fn apply_linear(&self, point: &Point) -> Point {
        let y = if self.mirror_x { -point.y } else { point.y };
        let (sin_r, cos_r) = sin_cos_deg(self.rotation);
        Point::new(point.x * cos_r - y * sin_r, point.x * sin_r + y * cos_r)
    }

    pub fn apply(&self, point: &Point) -> Point {
        let p = self.apply_linear(point);
        Point::new(p.x + self.offset.x, p.y + self.offset.y)
    }

    /// Map a facing direction, in degrees, through the linear part.
    pub fn apply_angle(&self, angle: f64) -> f64 {
        let a = if self.mirror_x { -angle } else { angle };
        normalize_angle(a + self.rotation)
    }

    /// The transform equivalent to applying `child` first and then `parent`.
    ///
    /// This is how an instance nested inside another instance lands in the
    /// outer frame: `compose(&outer, &inner)`.
    pub fn compose(parent: &Transform, child: &Transform) -> Transform {
        let rotation = if parent.mirror_x {
            parent.rotation - child.rotation
        } else {
            parent.rotation + child.rotation
        };
        Transform {
            offset: parent.apply(&child.offset),
            rotation: normalize_angle(rotation),
            mirror_x: parent.mirror_x ^ child.mirror_x,
        }
    }

    pub fn then(&self, next: &Transform) -> Transform {
        Transform::compose(next, self)
    }

    pub fn inverse(&self) -> Transform {
        let linear = Transform {
            offset: Point::origin(),
            rotation: if self.mirror_x {
                self.rotation
            } else {
                normalize_angle(-self.rotation)
            },
            mirror_x: self.mirror_x,
        };
        let back = linear.apply_linear(&self.offset);
        Transform {
            offset: Point::new(-back.x, -back.y),
            ..linear
        }
    }
}

/// Normalize an angle in degrees to [0, 360).
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if a >= 360.0 || a.abs() < GRID_ANGLE_TOLERANCE || (360.0 - a) < GRID_ANGLE_TOLERANCE {
        0.0
    } else {
        a
    }
}

pub fn is_grid_angle(angle: f64) -> bool {
    let q = angle / 90.0;
    (q - q.round()).abs() * 90.0 < GRID_ANGLE_TOLERANCE
}

/// Nearest multiple of 90 degrees.
pub fn snap_to_grid_angle(angle: f64) -> f64 {
    normalize_angle((angle / 90.0).round() * 90.0)
}

/// Smallest absolute difference between two directions, in degrees.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let d = normalize_angle(a - b);
    d.min(360.0 - d)
}

/// Sine and cosine of an angle in degrees, exact on the 90-degree grid.
fn sin_cos_deg(angle: f64) -> (f64, f64) {
    if is_grid_angle(angle) {
        match ((angle / 90.0).round() as i64).rem_euclid(4) {
            0 => (0.0, 1.0),
            1 => (1.0, 0.0),
            2 => (0.0, -1.0),
            _ => (-1.0, 0.0),
        }
    } else {
        angle.to_radians().sin_cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point(p: Point, x: f64, y: f64) {
        assert!((p.x - x).abs() < 1e-10, "x: {} != {}", p.x, x);
        assert!((p.y - y).abs() < 1e-10, "y: {} != {}", p.y, y);
    }

    #[test]
    fn test_transform_translate() {
        let t = Transform::translate(10.0, 20.0);
        let result = t.apply(&Point::new(5.0, 5.0));
        assert_point(result, 15.0, 25.0);
    }

    #[test]
    fn test_mirror_then_rotate_then_translate() {
        let t = Transform::new(Point::new(1.0, 1.0), 90.0, true);
        // (2, 3) -> mirror (2, -3) -> rotate 90 (3, 2) -> translate (4, 3)
        assert_point(t.apply(&Point::new(2.0, 3.0)), 4.0, 3.0);
        assert_eq!(t.apply_angle(30.0), 60.0);
    }

    #[test]
    fn test_compose_matches_sequential_application() {
        let parent = Transform::new(Point::new(3.0, -2.0), 30.0, true);
        let child = Transform::new(Point::new(-1.0, 5.0), 75.0, false);
        let composed = Transform::compose(&parent, &child);
        let p = Point::new(0.7, -1.3);
        let expected = parent.apply(&child.apply(&p));
        let got = composed.apply(&p);
        assert_point(got, expected.x, expected.y);
        assert!(composed.mirror_x);
        assert!(
            angle_difference(composed.apply_angle(10.0), parent.apply_angle(child.apply_angle(10.0)))
                < 1e-9
        );
    }

    #[test]
    fn test_inverse_round_trips() {
        for mirror in [false, true] {
            let t = Transform::new(Point::new(4.0, -7.5), 123.0, mirror);
            let id = Transform::compose(&t.inverse(), &t);
            assert_point(id.apply(&Point::new(2.0, 9.0)), 2.0, 9.0);
            assert!(!id.mirror_x);
        }
    }

    #[test]
    fn test_normalize_angle() {
        assert_eq!(normalize_angle(-90.0), 270.0);
        assert_eq!(normalize_angle(720.0), 0.0);
        assert_eq!(normalize_angle(-1e-13), 0.0);
        assert!((normalize_angle(390.0) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_angles() {
        assert!(is_grid_angle(270.0));
        assert!(is_grid_angle(-180.0));
        assert!(!is_grid_angle(30.0));
        assert_eq!(snap_to_grid_angle(44.0), 0.0);
        assert_eq!(snap_to_grid_angle(46.0), 90.0);
    }

    #[test]
    fn test_quarter_turn_is_exact() {
        let t = Transform::rotation(90.0);
        assert_eq!(t.apply(&Point::new(1.0, 0.0)), Point::new(0.0, 1.0));
    }
}
