//! Collision detection and response for a circular ball
//!
//! Static geometry comes in two kinds: axis-aligned boxes (walls) and thick
//! segments (the closed table edges). Contacts carry the normal pointing from
//! the shape toward the ball center.

use glam::DVec2;

use super::geometry::{AxisRect, Rect, edist_within};

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Closest point on the shape
    pub point: DVec2,
    /// Unit normal from the shape toward the ball center
    pub normal: DVec2,
    /// Overlap depth (positive)
    pub penetration: f64,
}

/// Check a ball against an axis-aligned box
pub fn ball_box_contact(center: DVec2, radius: f64, rect: &Rect) -> Option<Contact> {
    let closest = rect.clamp_point(center);
    let offset = center - closest;
    let dist_sq = offset.length_squared();

    if dist_sq > 0.0 {
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        return Some(Contact {
            point: closest,
            normal: offset / dist,
            penetration: radius - dist,
        });
    }

    // Center inside the box: push out through the nearest side
    let sides = [
        (center.x - rect.left, DVec2::NEG_X, DVec2::new(rect.left, center.y)),
        (rect.right - center.x, DVec2::X, DVec2::new(rect.right, center.y)),
        (center.y - rect.top, DVec2::NEG_Y, DVec2::new(center.x, rect.top)),
        (rect.bottom - center.y, DVec2::Y, DVec2::new(center.x, rect.bottom)),
    ];
    let mut best = sides[0];
    for side in &sides[1..] {
        if side.0 < best.0 {
            best = *side;
        }
    }
    Some(Contact {
        point: best.2,
        normal: best.1,
        penetration: best.0 + radius,
    })
}

/// Check a ball against a segment `a`-`b` thickened by `seg_radius`
pub fn ball_segment_contact(
    center: DVec2,
    radius: f64,
    a: DVec2,
    b: DVec2,
    seg_radius: f64,
) -> Option<Contact> {
    let line = b - a;
    let len_sq = line.length_squared();
    let t = if len_sq > 0.0 {
        ((center - a).dot(line) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = a + line * t;
    let offset = center - closest;
    let reach = radius + seg_radius;
    let dist_sq = offset.length_squared();

    if dist_sq >= reach * reach {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 0.0 {
        offset / dist
    } else {
        // Center on the spine: fall back to the segment's perpendicular
        DVec2::new(-line.y, line.x).normalize_or_zero()
    };
    Some(Contact {
        point: closest + normal * seg_radius,
        normal,
        penetration: reach - dist,
    })
}

/// Reflect the normal component of `velocity` scaled by `restitution`
///
/// `restitution = 1` is the standard mirror reflection v' = v - 2(v·n)n.
#[inline]
pub fn reflect_velocity(velocity: DVec2, normal: DVec2, restitution: f64) -> DVec2 {
    velocity - (1.0 + restitution) * velocity.dot(normal) * normal
}

/// Does a ball's circle touch a rectangle?
///
/// Bounding-box reject first, then the cheap straight-hit cases (center
/// within the rectangle's horizontal or vertical span), then the corners.
pub fn ball_intersects_rect(center: DVec2, radius: f64, rect: &impl AxisRect) -> bool {
    let rect = rect.bounds();
    let top = center.y - radius;
    let bottom = center.y + radius;
    let right = center.x + radius;
    let left = center.x - radius;

    if rect.left > right || rect.right < left || rect.top > bottom || rect.bottom < top {
        return false;
    }

    if (bottom > rect.top || top < rect.bottom) && center.x > rect.left && center.x < rect.right {
        return true;
    }
    if (right > rect.left || left < rect.right) && center.y > rect.top && center.y < rect.bottom {
        return true;
    }

    rect.corners()
        .iter()
        .any(|&corner| edist_within(center, corner, radius))
}
