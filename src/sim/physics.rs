//! Fixed-step 2D physics world
//!
//! One dynamic circle (the ball) and any number of static shapes. Static
//! shapes never move. Stepping is plain symplectic Euler followed by
//! penetration correction and restitution-scaled reflection against each
//! static shape in insertion order, so equal inputs always replay the same
//! trajectory.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::collision::{Contact, ball_box_contact, ball_segment_contact, reflect_velocity};
use super::geometry::Rect;

/// The single dynamic body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub pos: DVec2,
    pub vel: DVec2,
    pub radius: f64,
    /// Elasticity in [0, 1]
    pub elasticity: f64,
}

/// Static collision geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StaticShape {
    /// Axis-aligned box (walls)
    Box { rect: Rect, elasticity: f64 },
    /// Segment thickened by `radius` (closed table edges)
    Segment {
        a: DVec2,
        b: DVec2,
        radius: f64,
        elasticity: f64,
    },
}

impl StaticShape {
    pub fn elasticity(&self) -> f64 {
        match self {
            StaticShape::Box { elasticity, .. } | StaticShape::Segment { elasticity, .. } => {
                *elasticity
            }
        }
    }

    fn contact(&self, body: &Body) -> Option<Contact> {
        match self {
            StaticShape::Box { rect, .. } => ball_box_contact(body.pos, body.radius, rect),
            StaticShape::Segment { a, b, radius, .. } => {
                ball_segment_contact(body.pos, body.radius, *a, *b, *radius)
            }
        }
    }
}

/// A physics world with exactly one dynamic body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsWorld {
    body: Body,
    statics: Vec<StaticShape>,
}

impl PhysicsWorld {
    pub fn new(body: Body) -> Self {
        Self {
            body,
            statics: Vec::new(),
        }
    }

    pub fn add_static(&mut self, shape: StaticShape) {
        self.statics.push(shape);
    }

    #[inline]
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn set_velocity(&mut self, vel: DVec2) {
        self.body.vel = vel;
    }

    pub fn statics(&self) -> &[StaticShape] {
        &self.statics
    }

    /// Advance by `dt`. Returns the number of collisions (bounces) resolved.
    pub fn step(&mut self, dt: f64) -> u32 {
        let body = &mut self.body;
        body.pos += body.vel * dt;

        let mut bounces = 0;
        for shape in &self.statics {
            let Some(contact) = shape.contact(body) else {
                continue;
            };
            body.pos += contact.normal * contact.penetration;
            if body.vel.dot(contact.normal) < 0.0 {
                let restitution = body.elasticity * shape.elasticity();
                body.vel = reflect_velocity(body.vel, contact.normal, restitution);
                bounces += 1;
            }
        }
        bounces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball_at(x: f64, y: f64, vx: f64, vy: f64) -> Body {
        Body {
            pos: DVec2::new(x, y),
            vel: DVec2::new(vx, vy),
            radius: 5.0,
            elasticity: 1.0,
        }
    }

    #[test]
    fn test_free_flight() {
        let mut world = PhysicsWorld::new(ball_at(0.0, 0.0, 100.0, -50.0));
        for _ in 0..10 {
            assert_eq!(world.step(0.001), 0);
        }
        assert!((world.body().pos - DVec2::new(1.0, -0.5)).length() < 1e-9);
    }

    #[test]
    fn test_elastic_box_bounce() {
        let mut world = PhysicsWorld::new(ball_at(50.0, 50.0, 200.0, 0.0));
        world.add_static(StaticShape::Box {
            rect: Rect::new(60.0, 0.0, 70.0, 100.0),
            elasticity: 1.0,
        });

        let mut bounces = 0;
        for _ in 0..100 {
            bounces += world.step(0.001);
        }
        assert_eq!(bounces, 1);
        assert!((world.body().vel.x + 200.0).abs() < 1e-9);
        assert!(world.body().pos.x < 55.0);
    }

    #[test]
    fn test_restitution_is_product_of_elasticities() {
        let mut body = ball_at(50.0, 50.0, 200.0, 0.0);
        body.elasticity = 0.5;
        let mut world = PhysicsWorld::new(body);
        world.add_static(StaticShape::Box {
            rect: Rect::new(60.0, 0.0, 70.0, 100.0),
            elasticity: 0.5,
        });
        for _ in 0..100 {
            world.step(0.001);
        }
        assert!((world.body().vel.x + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut live = PhysicsWorld::new(ball_at(0.0, 0.0, 100.0, 0.0));
        let mut copy = live.clone();
        for _ in 0..50 {
            copy.step(0.001);
        }
        assert_eq!(live.body().pos, DVec2::ZERO);
        for _ in 0..50 {
            live.step(0.001);
        }
        assert_eq!(live, copy);
    }
}
