//! Trial specification as stored in the trial JSON files
//!
//! The on-disk layout uses positional arrays, e.g.
//! `"Ball": [[x, y], [vx, vy], radius, [r, g, b], elasticity]`, so each entry
//! is a tuple struct. Unknown extras that imply unsupported mechanics
//! (`AbnormWalls`, `Paddle`) are rejected by [`TrialSpec::validate`].

use serde::{Deserialize, Serialize};

use super::geometry::Rect;
use crate::error::LoadError;

/// RGBA color, 0-255 per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const BLUE: Color = Color([0, 0, 255, 255]);
    pub const RED: Color = Color([255, 0, 0, 255]);
    pub const GREEN: Color = Color([0, 255, 0, 255]);
    pub const GREY: Color = Color([128, 128, 128, 255]);

    /// Parse `[r, g, b]` or `[r, g, b, a]`; alpha defaults to opaque
    pub fn from_components(c: &[f64], kind: &'static str) -> Result<Self, LoadError> {
        let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        match c {
            [r, g, b] => Ok(Color([channel(*r), channel(*g), channel(*b), 255])),
            [r, g, b, a] => Ok(Color([channel(*r), channel(*g), channel(*b), channel(*a)])),
            _ => Err(LoadError::InvalidColor { kind, len: c.len() }),
        }
    }
}

/// `[[x, y], [vx, vy], radius, color, elasticity]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallSpec(pub [f64; 2], pub [f64; 2], pub f64, pub Vec<f64>, pub f64);

/// `[[left, top], [right, bottom], color, elasticity]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallSpec(pub [f64; 2], pub [f64; 2], pub Vec<f64>, pub f64);

/// `[[left, top], [right, bottom], color]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccluderSpec(pub [f64; 2], pub [f64; 2], pub Vec<f64>);

/// `[[left, top], [right, bottom], outcome code, color]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSpec(pub [f64; 2], pub [f64; 2], pub i64, pub Vec<f64>);

impl WallSpec {
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.0, self.1)
    }
}

impl OccluderSpec {
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.0, self.1)
    }
}

impl GoalSpec {
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.0, self.1)
    }
}

/// One trial, read-only once loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Dims")]
    pub dims: [f64; 2],
    #[serde(rename = "BKColor")]
    pub background: Vec<f64>,
    /// Closed edges, 1 = top, 2 = right, 3 = bottom, 4 = left
    #[serde(rename = "ClosedEnds")]
    pub closed_ends: Vec<i64>,
    #[serde(rename = "Ball")]
    pub ball: BallSpec,
    #[serde(rename = "Walls")]
    pub walls: Vec<WallSpec>,
    #[serde(rename = "Occluders")]
    pub occluders: Vec<OccluderSpec>,
    #[serde(rename = "Goals")]
    pub goals: Vec<GoalSpec>,
    #[serde(rename = "AbnormWalls", default, skip_serializing_if = "Vec::is_empty")]
    pub abnormal_walls: Vec<serde_json::Value>,
    #[serde(rename = "Paddle", default, skip_serializing_if = "Option::is_none")]
    pub paddle: Option<serde_json::Value>,
}

impl TrialSpec {
    /// Parse and validate a trial from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let spec: TrialSpec = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Reject anything the table cannot represent faithfully
    pub fn validate(&self) -> Result<(), LoadError> {
        if !self.abnormal_walls.is_empty() {
            return Err(LoadError::Unsupported("AbnormWalls"));
        }
        if self.paddle.as_ref().is_some_and(|p| !p.is_null()) {
            return Err(LoadError::Unsupported("Paddle"));
        }

        let [width, height] = self.dims;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(LoadError::InvalidDims { width, height });
        }
        Color::from_components(&self.background, "background")?;
        self.closed_edges()?;

        let BallSpec(pos, vel, radius, color, elasticity) = &self.ball;
        if !pos.iter().chain(vel.iter()).all(|v| v.is_finite()) {
            return Err(LoadError::InvalidBall("non-finite position or velocity".into()));
        }
        if !(radius.is_finite() && *radius > 0.0) {
            return Err(LoadError::InvalidBall(format!("radius {radius}")));
        }
        Color::from_components(color, "ball")?;
        check_restitution("ball", *elasticity)?;

        for (index, wall) in self.walls.iter().enumerate() {
            if !wall.rect().is_valid() {
                return Err(LoadError::DegenerateRect { kind: "wall", index });
            }
            Color::from_components(&wall.2, "wall")?;
            check_restitution("wall", wall.3)?;
        }
        for (index, occ) in self.occluders.iter().enumerate() {
            if !occ.rect().is_valid() {
                return Err(LoadError::DegenerateRect {
                    kind: "occluder",
                    index,
                });
            }
            Color::from_components(&occ.2, "occluder")?;
        }

        if self.goals.is_empty() {
            return Err(LoadError::NoGoals);
        }
        for (index, goal) in self.goals.iter().enumerate() {
            if !goal.rect().is_valid() {
                return Err(LoadError::DegenerateRect { kind: "goal", index });
            }
            super::table::Target::from_code(goal.2)?;
            Color::from_components(&goal.3, "goal")?;
        }
        Ok(())
    }

    /// Closed-edge flags in order top, right, bottom, left
    pub fn closed_edges(&self) -> Result<[bool; 4], LoadError> {
        let mut edges = [false; 4];
        for &end in &self.closed_ends {
            if !(1..=4).contains(&end) {
                return Err(LoadError::InvalidClosedEnd(end));
            }
            edges[(end - 1) as usize] = true;
        }
        Ok(edges)
    }
}

fn check_restitution(kind: &'static str, value: f64) -> Result<(), LoadError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(LoadError::InvalidRestitution { kind, value })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A closed 400x300 table with the ball heading right toward one goal
    pub(crate) const STRAIGHT_SHOT: &str = r#"{
        "Name": "straight",
        "Dims": [400, 300],
        "BKColor": [255, 255, 255],
        "ClosedEnds": [1, 2, 3, 4],
        "Ball": [[100, 150], [200, 0], 10, [0, 0, 255], 1.0],
        "Walls": [],
        "Occluders": [],
        "Goals": [[[350, 100], [380, 200], 201, [255, 0, 0]]],
        "AbnormWalls": []
    }"#;

    /// The usual layout: red goal on the right, green on the left, ball
    /// heading left into green
    pub(crate) const TWO_GOALS: &str = r#"{
        "Name": "two_goals",
        "Dims": [400, 300],
        "BKColor": [255, 255, 255],
        "ClosedEnds": [1, 2, 3, 4],
        "Ball": [[200, 150], [-200, 0], 10, [0, 0, 255], 1.0],
        "Walls": [],
        "Occluders": [],
        "Goals": [
            [[350, 100], [380, 200], 201, [255, 0, 0]],
            [[20, 100], [50, 200], 202, [0, 255, 0]]
        ]
    }"#;

    #[test]
    fn test_parse_straight_shot() {
        let spec = TrialSpec::from_json_str(STRAIGHT_SHOT).unwrap();
        assert_eq!(spec.name, "straight");
        assert_eq!(spec.dims, [400.0, 300.0]);
        assert_eq!(spec.closed_edges().unwrap(), [true; 4]);
        assert_eq!(spec.goals[0].rect(), Rect::new(350.0, 100.0, 380.0, 200.0));
        assert_eq!(spec.ball.1, [200.0, 0.0]);
    }

    #[test]
    fn test_parse_two_goals() {
        let spec = TrialSpec::from_json_str(TWO_GOALS).unwrap();
        assert_eq!(spec.goals.len(), 2);
        assert_eq!(spec.goals[0].2, 201);
        assert_eq!(spec.goals[1].2, 202);
        assert!(spec.abnormal_walls.is_empty());
    }

    #[test]
    fn test_missing_geometry_keys_are_fatal() {
        for key in ["ClosedEnds", "Walls", "Occluders", "Goals"] {
            let err = edited(|v| {
                v.as_object_mut().unwrap().remove(key);
            });
            assert!(matches!(err, Err(LoadError::Json(_))), "missing {key} should not load");
        }
        // Optional extras may be left out
        let ok = edited(|v| {
            v.as_object_mut().unwrap().remove("AbnormWalls");
        });
        assert!(ok.is_ok());
    }

    #[test]
    fn test_color_alpha_default() {
        assert_eq!(
            Color::from_components(&[1.0, 2.0, 3.0], "x").unwrap(),
            Color([1, 2, 3, 255])
        );
        assert_eq!(
            Color::from_components(&[1.0, 2.0, 3.0, 4.0], "x").unwrap(),
            Color([1, 2, 3, 4])
        );
        assert!(Color::from_components(&[1.0, 2.0], "x").is_err());
    }

    fn edited(f: impl FnOnce(&mut serde_json::Value)) -> Result<TrialSpec, LoadError> {
        let mut v: serde_json::Value = serde_json::from_str(STRAIGHT_SHOT).unwrap();
        f(&mut v);
        TrialSpec::from_json_str(&v.to_string())
    }

    #[test]
    fn test_unsupported_fields_are_fatal() {
        let err = edited(|v| v["AbnormWalls"] = serde_json::json!([[[0, 0], [1, 1], [2, 2]]]));
        assert!(matches!(err, Err(LoadError::Unsupported("AbnormWalls"))));

        let err = edited(|v| v["Paddle"] = serde_json::json!({"width": 10}));
        assert!(matches!(err, Err(LoadError::Unsupported("Paddle"))));
    }

    #[test]
    fn test_malformed_geometry_is_fatal() {
        let err = edited(|v| v["ClosedEnds"] = serde_json::json!([0]));
        assert!(matches!(err, Err(LoadError::InvalidClosedEnd(0))));

        let err = edited(|v| v["Walls"] = serde_json::json!([[[50, 50], [40, 60], [0, 0, 0], 1.0]]));
        assert!(matches!(
            err,
            Err(LoadError::DegenerateRect { kind: "wall", index: 0 })
        ));

        let err = edited(|v| v["Goals"] = serde_json::json!([]));
        assert!(matches!(err, Err(LoadError::NoGoals)));

        let err = edited(|v| v["Goals"][0][2] = serde_json::json!(203));
        assert!(matches!(err, Err(LoadError::UnknownGoalTag(203))));

        let err = edited(|v| v["Ball"][4] = serde_json::json!(1.5));
        assert!(matches!(err, Err(LoadError::InvalidRestitution { kind: "ball", .. })));

        let err = edited(|v| v["Ball"] = serde_json::json!([[1, 2], [3, 4]]));
        assert!(matches!(err, Err(LoadError::Json(_))));
    }
}
