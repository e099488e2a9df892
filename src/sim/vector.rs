//! Vector helpers on top of `glam::DVec2`
//!
//! glam already supplies add/sub/scale, dot, length and squared length.
//! The collision code additionally needs projection, rotation and angles.

use glam::DVec2;

/// Extra 2D vector operations used by the physics core
pub trait VecExt: Sized {
    /// Projection of `self` onto `onto` (zero if `onto` is zero)
    fn projection_onto(self, onto: DVec2) -> DVec2;

    /// Component of `self` perpendicular to `normal`
    fn tangential_to(self, normal: DVec2) -> DVec2;

    /// Rotated copy (radians, counter-clockwise)
    fn rotated(self, radians: f64) -> DVec2;

    /// Rotate in place, for accumulating orientation
    fn rotate_in_place(&mut self, radians: f64);

    /// Unit vector, or zero for the zero vector
    fn normalized_or_zero(self) -> DVec2;

    /// Heading of the vector in (-π, π]
    fn signed_angle(self) -> f64;

    /// Signed angle from `self` to `other` in (-π, π]
    fn angle_between(self, other: DVec2) -> f64;
}

impl VecExt for DVec2 {
    #[inline]
    fn projection_onto(self, onto: DVec2) -> DVec2 {
        let len_sq = onto.length_squared();
        if len_sq == 0.0 {
            return DVec2::ZERO;
        }
        onto * (self.dot(onto) / len_sq)
    }

    #[inline]
    fn tangential_to(self, normal: DVec2) -> DVec2 {
        self - self.projection_onto(normal)
    }

    #[inline]
    fn rotated(self, radians: f64) -> DVec2 {
        let (sin, cos) = radians.sin_cos();
        DVec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    #[inline]
    fn rotate_in_place(&mut self, radians: f64) {
        *self = self.rotated(radians);
    }

    #[inline]
    fn normalized_or_zero(self) -> DVec2 {
        let len = self.length();
        if len == 0.0 { DVec2::ZERO } else { self / len }
    }

    #[inline]
    fn signed_angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    #[inline]
    fn angle_between(self, other: DVec2) -> f64 {
        self.perp_dot(other).atan2(self.dot(other))
    }
}
