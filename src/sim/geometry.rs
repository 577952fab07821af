//! Axis-aligned rectangle geometry
//!
//! Walls, occluders and goals are all rectangles in screen coordinates
//! (y grows downward, so `top < bottom`). Distance and intersection routines
//! take anything implementing [`AxisRect`].

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build from two corner points `[left, top]`, `[right, bottom]`
    pub fn from_corners(a: [f64; 2], b: [f64; 2]) -> Self {
        Self::new(a[0], a[1], b[0], b[1])
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// True when the rectangle has positive area and finite edges
    pub fn is_valid(&self) -> bool {
        [self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite())
            && self.left < self.right
            && self.top < self.bottom
    }

    /// The four corners: top-left, top-right, bottom-left, bottom-right
    pub fn corners(&self) -> [DVec2; 4] {
        [
            DVec2::new(self.left, self.top),
            DVec2::new(self.right, self.top),
            DVec2::new(self.left, self.bottom),
            DVec2::new(self.right, self.bottom),
        ]
    }

    /// Closest point of the rectangle (boundary or interior) to `p`
    #[inline]
    pub fn clamp_point(&self, p: DVec2) -> DVec2 {
        DVec2::new(
            p.x.clamp(self.left, self.right),
            p.y.clamp(self.top, self.bottom),
        )
    }
}

/// Shared shape of walls, occluders and goals
pub trait AxisRect {
    fn bounds(&self) -> Rect;

    fn left(&self) -> f64 {
        self.bounds().left
    }
    fn top(&self) -> f64 {
        self.bounds().top
    }
    fn right(&self) -> f64 {
        self.bounds().right
    }
    fn bottom(&self) -> f64 {
        self.bounds().bottom
    }
}

impl AxisRect for Rect {
    #[inline]
    fn bounds(&self) -> Rect {
        *self
    }
}

/// Euclidean distance between two points
#[inline]
pub fn edist(a: DVec2, b: DVec2) -> f64 {
    (b - a).length()
}

/// True if `a` and `b` are strictly closer than `r`
#[inline]
pub fn edist_within(a: DVec2, b: DVec2, r: f64) -> bool {
    (a - b).length_squared() < r * r
}

/// Gap from a point to a rectangle.
///
/// Directly above/below the rectangle this is the vertical gap, directly
/// beside it the horizontal gap (both negative when the point is inside).
/// Diagonally outside it is the distance to the nearest corner.
pub fn clever_dist(p: DVec2, rect: &impl AxisRect) -> f64 {
    let r = rect.bounds();
    if p.x >= r.left && p.x <= r.right {
        if p.y >= r.bottom {
            p.y - r.bottom
        } else {
            r.top - p.y
        }
    } else if p.y <= r.bottom && p.y >= r.top {
        if p.x >= r.right {
            p.x - r.right
        } else {
            r.left - p.x
        }
    } else {
        r.corners()
            .iter()
            .map(|&c| edist(p, c))
            .fold(f64::INFINITY, f64::min)
    }
}
