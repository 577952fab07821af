//! Simulated participants for headless runs
//!
//! A participant is asked once per trial, when the response window opens.
//! It may answer with a goal and a latency, or stay silent and let the
//! window time out.

use std::collections::VecDeque;

use crate::sim::table::{Table, Target};
use crate::sim::trial::FreezeFrame;

/// A key press: which goal, and how long after the freeze (ms)
pub type Answer = (Target, f64);

pub trait Participant {
    fn respond(&mut self, table: &Table, frame: &FreezeFrame) -> Option<Answer>;
}

/// Picks whichever goal is closest to the frozen ball
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestGoal {
    pub latency_ms: f64,
}

impl Default for NearestGoal {
    fn default() -> Self {
        Self { latency_ms: 600.0 }
    }
}

impl Participant for NearestGoal {
    fn respond(&mut self, _table: &Table, frame: &FreezeFrame) -> Option<Answer> {
        frame
            .goal_distances
            .iter()
            .min_by(|a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|g| (g.goal.target, self.latency_ms))
    }
}

/// Never presses a key
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Participant for Silent {
    fn respond(&mut self, _table: &Table, _frame: &FreezeFrame) -> Option<Answer> {
        None
    }
}

/// Replays a fixed list of answers, then goes silent
#[derive(Debug, Clone, Default)]
pub struct Scripted {
    answers: VecDeque<Option<Answer>>,
}

impl Scripted {
    pub fn new(answers: impl IntoIterator<Item = Option<Answer>>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Participant for Scripted {
    fn respond(&mut self, _table: &Table, _frame: &FreezeFrame) -> Option<Answer> {
        self.answers.pop_front().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::GoalDistance;
    use crate::sim::geometry::Rect;
    use crate::sim::spec::TrialSpec;
    use crate::sim::spec::tests::STRAIGHT_SHOT;
    use crate::sim::table::Goal;
    use glam::DVec2;

    fn goal_at(target: Target, distance: f64) -> GoalDistance {
        GoalDistance {
            name: target.label().to_string(),
            goal: Goal {
                rect: Rect::new(0.0, 0.0, 10.0, 10.0),
                target,
                color: target.color(),
            },
            distance,
        }
    }

    fn table() -> Table {
        let spec = TrialSpec::from_json_str(STRAIGHT_SHOT).unwrap();
        Table::from_spec(&spec, DVec2::new(175.0, 180.0)).unwrap()
    }

    #[test]
    fn test_nearest_goal() {
        let frame = FreezeFrame {
            ball_pos: DVec2::ZERO,
            goal_distances: vec![goal_at(Target::First, 120.0), goal_at(Target::Second, 40.0)],
            wall_distances: vec![],
        };
        let mut p = NearestGoal { latency_ms: 450.0 };
        assert_eq!(p.respond(&table(), &frame), Some((Target::Second, 450.0)));
    }

    #[test]
    fn test_scripted_then_silent() {
        let frame = FreezeFrame {
            ball_pos: DVec2::ZERO,
            goal_distances: vec![],
            wall_distances: vec![],
        };
        let mut p = Scripted::new([Some((Target::First, 300.0)), None]);
        let t = table();
        assert_eq!(p.respond(&t, &frame), Some((Target::First, 300.0)));
        assert_eq!(p.respond(&t, &frame), None);
        assert_eq!(p.remaining(), 0);
        assert_eq!(p.respond(&t, &frame), None);
        assert_eq!(Silent.respond(&t, &frame), None);
    }
}
