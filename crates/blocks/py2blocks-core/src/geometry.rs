//! Workspace-space coordinates and rectangles.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub const ORIGIN: Coordinate = Coordinate { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Coordinate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Coordinate {
    type Output = Coordinate;

    fn add(self, rhs: Coordinate) -> Coordinate {
        Coordinate::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coordinate {
    type Output = Coordinate;

    fn sub(self, rhs: Coordinate) -> Coordinate {
        Coordinate::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle, `left <= right` and `top <= bottom`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn contains(&self, p: Coordinate) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    /// Nearest point inside the rectangle.
    pub fn clamp(&self, p: Coordinate) -> Coordinate {
        Coordinate::new(
            p.x.clamp(self.left, self.right),
            p.y.clamp(self.top, self.bottom),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_and_ops() {
        let a = Coordinate::new(3.0, 4.0);
        assert_eq!(a.distance(Coordinate::ORIGIN), 5.0);
        assert_eq!(a - Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 3.0));
        assert_eq!(a + Coordinate::new(1.0, -4.0), Coordinate::new(4.0, 0.0));
    }

    #[test]
    fn rect_normalizes_and_clamps() {
        let r = Rect::new(10.0, 10.0, 0.0, 0.0);
        assert_eq!(r.left, 0.0);
        assert_eq!(r.bottom, 10.0);
        assert!(r.contains(Coordinate::new(5.0, 5.0)));
        assert_eq!(r.clamp(Coordinate::new(-4.0, 30.0)), Coordinate::new(0.0, 10.0));
    }
}
