//! Static rectangles: the table fence and obstacle walls

use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WallId(pub u32);

impl fmt::Display for WallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Axis-aligned table boundary (the "fence")
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl Bounds {
    pub fn new(left: f64, right: f64, bottom: f64, top: f64) -> Self {
        Self { left, right, bottom, top }
    }

    /// Bounds with the origin at the bottom-left corner
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, width, 0.0, height)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new((self.left + self.right) / 2.0, (self.bottom + self.top) / 2.0)
    }

    pub fn is_valid(&self) -> bool {
        self.left.is_finite()
            && self.right.is_finite()
            && self.bottom.is_finite()
            && self.top.is_finite()
            && self.right > self.left
            && self.top > self.bottom
    }

    /// True if a circle lies fully inside
    pub fn contains_circle(&self, center: DVec2, radius: f64) -> bool {
        center.x - radius >= self.left
            && center.x + radius <= self.right
            && center.y - radius >= self.bottom
            && center.y + radius <= self.top
    }
}

/// A static rectangle, optionally rotated about its center
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wall {
    pub center: DVec2,
    pub half_width: f64,
    pub half_height: f64,
    /// Rotation (radians, counter-clockwise)
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_wall_restitution")]
    pub restitution: f64,
}

fn default_wall_restitution() -> f64 {
    1.0
}

impl Wall {
    pub fn new(center: DVec2, half_width: f64, half_height: f64) -> Self {
        Self {
            center,
            half_width,
            half_height,
            rotation: 0.0,
            restitution: default_wall_restitution(),
        }
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// The four outer walls (thickness `t`) surrounding `bounds`
    pub fn fence(bounds: &Bounds, t: f64) -> [Wall; 4] {
        let c = bounds.center();
        let hw = bounds.width() / 2.0;
        let hh = bounds.height() / 2.0;
        let h = t / 2.0;
        [
            Wall::new(DVec2::new(bounds.left - h, c.y), h, hh + t),
            Wall::new(DVec2::new(bounds.right + h, c.y), h, hh + t),
            Wall::new(DVec2::new(c.x, bounds.bottom - h), hw + t, h),
            Wall::new(DVec2::new(c.x, bounds.top + h), hw + t, h),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_geometry() {
        let b = Bounds::from_size(10.0, 5.0);
        assert!(b.is_valid());
        assert_eq!(b.center(), DVec2::new(5.0, 2.5));
        assert!(b.contains_circle(DVec2::new(1.0, 1.0), 1.0));
        assert!(!b.contains_circle(DVec2::new(0.5, 1.0), 1.0));

        assert!(!Bounds::new(1.0, 0.0, 0.0, 1.0).is_valid());
    }

    #[test]
    fn test_fence_surrounds_bounds() {
        let b = Bounds::from_size(10.0, 6.0);
        let fence = Wall::fence(&b, 1.0);
        // Left wall's inner face sits on the left bound
        assert!((fence[0].center.x + fence[0].half_width - b.left).abs() < 1e-12);
        // Top wall's inner face sits on the top bound
        assert!((fence[3].center.y - fence[3].half_height - b.top).abs() < 1e-12);
    }
}
