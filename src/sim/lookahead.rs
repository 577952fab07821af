//! Ground-truth lookahead
//!
//! Runs an independent copy of a table to its terminal outcome. The live
//! table is only borrowed, never mutated, and the loop is bounded so an
//! open table whose ball escapes fails loudly instead of spinning forever.

use std::time::Instant;

use glam::DVec2;

use super::spec::TrialSpec;
use super::table::{StepOutcome, Table, Target};
use crate::error::TrialError;

/// Bounds for a lookahead run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookaheadLimits {
    /// Tick length passed to `Table::step` (seconds)
    pub dt: f64,
    /// Maximum number of ticks before giving up
    pub max_steps: u64,
    /// Optional simulated-time budget; exceeding it is a `TimedUp` outcome
    pub max_elapsed: Option<f64>,
}

/// Terminal result of a lookahead run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookahead {
    pub outcome: StepOutcome,
    pub bounces: u32,
    /// Ticks taken
    pub steps: u64,
    /// Simulated seconds at termination
    pub elapsed: f64,
    /// Wall-clock cost (ms)
    pub cost_ms: f64,
}

impl Lookahead {
    /// The goal reached, if the run ended at a goal
    pub fn target(&self) -> Option<Target> {
        match self.outcome {
            StepOutcome::ReachedGoal(t) => Some(t),
            _ => None,
        }
    }
}

/// Step a clone of `table` until it reaches a terminal outcome
pub fn simulate_to_termination(
    table: &Table,
    limits: &LookaheadLimits,
) -> Result<Lookahead, TrialError> {
    let started = Instant::now();
    let mut clone = table.clone();
    let mut steps = 0;

    loop {
        if steps >= limits.max_steps {
            return Err(TrialError::NonTerminatingLookahead {
                steps,
                elapsed: clone.elapsed(),
            });
        }
        let outcome = clone.step(limits.dt, limits.max_elapsed);
        steps += 1;
        if outcome.is_terminal() {
            return Ok(Lookahead {
                outcome,
                bounces: clone.bounces(),
                steps,
                elapsed: clone.elapsed(),
                cost_ms: started.elapsed().as_secs_f64() * 1000.0,
            });
        }
    }
}

/// Build a table from a spec and run it to termination
pub fn simulate_spec(
    spec: &TrialSpec,
    default_speed: DVec2,
    limits: &LookaheadLimits,
) -> Result<Lookahead, TrialError> {
    let table = Table::from_spec(spec, default_speed)?;
    simulate_to_termination(&table, limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::spec::tests::{STRAIGHT_SHOT, TWO_GOALS};
    use crate::sim::spec::WallSpec;

    const DEFAULT_SPEED: DVec2 = DVec2::new(175.0, 180.0);

    fn limits() -> LookaheadLimits {
        LookaheadLimits {
            dt: 0.025,
            max_steps: 4_000,
            max_elapsed: None,
        }
    }

    fn spec() -> TrialSpec {
        TrialSpec::from_json_str(STRAIGHT_SHOT).unwrap()
    }

    #[test]
    fn test_straight_shot_reaches_goal() {
        let result = simulate_spec(&spec(), DEFAULT_SPEED, &limits()).unwrap();
        assert_eq!(result.outcome, StepOutcome::ReachedGoal(Target::First));
        assert_eq!(result.target(), Some(Target::First));
        assert_eq!(result.bounces, 0);
        // Ball edge meets the goal after ~1.2s of 25ms ticks
        assert!((48..=49).contains(&result.steps));
    }

    #[test]
    fn test_two_goals_reaches_green() {
        let spec = TrialSpec::from_json_str(TWO_GOALS).unwrap();
        let result = simulate_spec(&spec, DEFAULT_SPEED, &limits()).unwrap();
        assert_eq!(result.outcome, StepOutcome::ReachedGoal(Target::Second));
        assert_eq!(result.target(), Some(Target::Second));
        assert_eq!(result.bounces, 0);
    }

    #[test]
    fn test_swapped_table_reports_swapped_target() {
        let spec = TrialSpec::from_json_str(TWO_GOALS).unwrap();
        let mut table = Table::from_spec(&spec, DEFAULT_SPEED).unwrap();
        table.swap_goals();
        let result = simulate_to_termination(&table, &limits()).unwrap();
        assert_eq!(result.target(), Some(Target::First));
    }

    #[test]
    fn test_live_table_untouched() {
        let table = Table::from_spec(&spec(), DEFAULT_SPEED).unwrap();
        simulate_to_termination(&table, &limits()).unwrap();
        assert_eq!(table.elapsed(), 0.0);
        assert_eq!(table.bounces(), 0);
    }

    #[test]
    fn test_escaping_ball_fails_loudly() {
        let mut s = spec();
        s.closed_ends.clear();
        s.ball.1 = [-200.0, 0.0];
        let err = simulate_spec(&s, DEFAULT_SPEED, &limits()).unwrap_err();
        assert!(matches!(
            err,
            TrialError::NonTerminatingLookahead { steps: 4_000, .. }
        ));
    }

    #[test]
    fn test_elapsed_budget_times_up() {
        let mut s = spec();
        s.closed_ends.clear();
        s.ball.1 = [-200.0, 0.0];
        let limits = LookaheadLimits {
            max_elapsed: Some(2.0),
            ..limits()
        };
        let result = simulate_spec(&s, DEFAULT_SPEED, &limits).unwrap();
        assert_eq!(result.outcome, StepOutcome::TimedUp);
        assert_eq!(result.target(), None);
    }

    #[test]
    fn test_deterministic_replay_with_walls() {
        let mut s = spec();
        s.ball.1 = [1.0, -1.0];
        s.walls = vec![
            WallSpec([200.0, 0.0], [220.0, 120.0], vec![0.0, 0.0, 0.0], 1.0),
            WallSpec([260.0, 220.0], [280.0, 300.0], vec![0.0, 0.0, 0.0], 0.9),
        ];
        let limits = LookaheadLimits {
            max_elapsed: Some(30.0),
            ..limits()
        };
        let a = simulate_spec(&s, DEFAULT_SPEED, &limits).unwrap();
        let b = simulate_spec(&s, DEFAULT_SPEED, &limits).unwrap();
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.bounces, b.bounces);
        assert_eq!(a.steps, b.steps);
        assert_eq!(a.elapsed, b.elapsed);
        assert!(a.bounces > 0);
    }
}
