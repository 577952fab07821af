//! Table model: one ball, walls, occluders and goals in a physics world
//!
//! A `Table` is built fresh from a [`TrialSpec`] for every trial. Cloning a
//! table deep-copies the physics world, so a clone can be run forward to
//! peek at the outcome without touching the original.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::collision::ball_intersects_rect;
use super::geometry::{AxisRect, Rect};
use super::physics::{Body, PhysicsWorld, StaticShape};
use super::spec::{BallSpec, Color, TrialSpec};
use crate::consts::{EDGE_THICKNESS, TIME_RESOLUTION};
use crate::error::LoadError;
use crate::renderer::Canvas;

/// One of the two goal identities. `First` is shown red, `Second` green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    First,
    Second,
}

impl Target {
    /// Outcome code used in trial files
    pub const FIRST_CODE: i64 = 201;
    pub const SECOND_CODE: i64 = 202;

    pub fn from_code(code: i64) -> Result<Self, LoadError> {
        match code {
            Self::FIRST_CODE => Ok(Target::First),
            Self::SECOND_CODE => Ok(Target::Second),
            other => Err(LoadError::UnknownGoalTag(other)),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Target::First => Self::FIRST_CODE,
            Target::Second => Self::SECOND_CODE,
        }
    }

    /// The other identity
    pub fn complement(&self) -> Self {
        match self {
            Target::First => Target::Second,
            Target::Second => Target::First,
        }
    }

    /// Participant-facing name
    pub fn label(&self) -> &'static str {
        match self {
            Target::First => "red",
            Target::Second => "green",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Target::First => Color::RED,
            Target::Second => Color::GREEN,
        }
    }
}

/// Result of advancing a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Running,
    ReachedGoal(Target),
    TimedUp,
}

impl StepOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepOutcome::Running)
    }
}

/// Resolve the ball's initial velocity from the raw trial values.
///
/// `±1` components are direction codes scaled by the default speed, any
/// component of magnitude 10 or more means a literal velocity, and anything
/// else falls back to the default speed unscaled.
pub fn resolve_velocity(raw: DVec2, default_speed: DVec2) -> DVec2 {
    if raw.x.abs() == 1.0 || raw.y.abs() == 1.0 {
        default_speed * raw
    } else if raw.x.abs() >= 10.0 || raw.y.abs() >= 10.0 {
        raw
    } else {
        default_speed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub radius: f64,
    pub color: Color,
    pub elasticity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    #[serde(flatten)]
    pub rect: Rect,
    pub color: Color,
    pub elasticity: f64,
}

/// Visual-only cover; no physics body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Occluder {
    #[serde(flatten)]
    pub rect: Rect,
    pub color: Color,
}

/// Passive zone polled for intersection after every step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    #[serde(flatten)]
    pub rect: Rect,
    pub target: Target,
    pub color: Color,
}

impl AxisRect for Wall {
    fn bounds(&self) -> Rect {
        self.rect
    }
}

impl AxisRect for Occluder {
    fn bounds(&self) -> Rect {
        self.rect
    }
}

impl AxisRect for Goal {
    fn bounds(&self) -> Rect {
        self.rect
    }
}

/// The table model
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub dims: DVec2,
    pub background: Color,
    /// Physics step size (seconds)
    time_resolution: f64,
    /// Closed edges: top, right, bottom, left
    closed_edges: [bool; 4],
    world: PhysicsWorld,
    ball: Ball,
    walls: Vec<Wall>,
    occluders: Vec<Occluder>,
    goals: Vec<Goal>,
    /// Physics steps taken
    ticks: u64,
    bounces: u32,
}

impl Table {
    /// Build a table from a trial spec
    pub fn from_spec(spec: &TrialSpec, default_speed: DVec2) -> Result<Self, LoadError> {
        Self::from_spec_with_resolution(spec, default_speed, TIME_RESOLUTION)
    }

    pub fn from_spec_with_resolution(
        spec: &TrialSpec,
        default_speed: DVec2,
        time_resolution: f64,
    ) -> Result<Self, LoadError> {
        spec.validate()?;

        let BallSpec(pos, vel, radius, color, elasticity) = &spec.ball;
        let ball = Ball {
            radius: *radius,
            color: Color::from_components(color, "ball")?,
            elasticity: *elasticity,
        };
        let body = Body {
            pos: DVec2::from(*pos),
            vel: resolve_velocity(DVec2::from(*vel), default_speed),
            radius: *radius,
            elasticity: *elasticity,
        };

        let dims = DVec2::from(spec.dims);
        let closed_edges = spec.closed_edges()?;
        let mut world = PhysicsWorld::new(body);
        for shape in edge_shapes(dims, closed_edges) {
            world.add_static(shape);
        }

        let mut walls = Vec::with_capacity(spec.walls.len());
        for w in &spec.walls {
            let wall = Wall {
                rect: w.rect(),
                color: Color::from_components(&w.2, "wall")?,
                elasticity: w.3,
            };
            world.add_static(StaticShape::Box {
                rect: wall.rect,
                elasticity: wall.elasticity,
            });
            walls.push(wall);
        }

        let occluders = spec
            .occluders
            .iter()
            .map(|o| {
                Ok(Occluder {
                    rect: o.rect(),
                    color: Color::from_components(&o.2, "occluder")?,
                })
            })
            .collect::<Result<Vec<_>, LoadError>>()?;

        let goals = spec
            .goals
            .iter()
            .map(|g| {
                Ok(Goal {
                    rect: g.rect(),
                    target: Target::from_code(g.2)?,
                    color: Color::from_components(&g.3, "goal")?,
                })
            })
            .collect::<Result<Vec<_>, LoadError>>()?;

        Ok(Self {
            name: spec.name.clone(),
            dims,
            background: Color::from_components(&spec.background, "background")?,
            time_resolution,
            closed_edges,
            world,
            ball,
            walls,
            occluders,
            goals,
            ticks: 0,
            bounces: 0,
        })
    }

    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    pub fn ball_pos(&self) -> DVec2 {
        self.world.body().pos
    }

    pub fn ball_vel(&self) -> DVec2 {
        self.world.body().vel
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn occluders(&self) -> &[Occluder] {
        &self.occluders
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn closed_edges(&self) -> [bool; 4] {
        self.closed_edges
    }

    pub fn time_resolution(&self) -> f64 {
        self.time_resolution
    }

    /// Simulated seconds elapsed
    pub fn elapsed(&self) -> f64 {
        self.ticks as f64 * self.time_resolution
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn bounces(&self) -> u32 {
        self.bounces
    }

    /// Advance by `t` seconds in steps of the time resolution.
    ///
    /// Stops early at the first goal hit or once elapsed time exceeds
    /// `max_elapsed`. The goal check runs first, so a step that does both
    /// reports the goal.
    pub fn step(&mut self, t: f64, max_elapsed: Option<f64>) -> StepOutcome {
        let ratio = t / self.time_resolution;
        let nsteps = if (ratio - ratio.round()).abs() < 1e-9 {
            ratio.round()
        } else {
            log::warn!(
                "Step {t} is not a multiple of the time resolution {}; truncating",
                self.time_resolution
            );
            ratio.floor()
        };

        for _ in 0..nsteps.max(0.0) as u64 {
            self.bounces += self.world.step(self.time_resolution);
            self.ticks += 1;
            if let Some(target) = self.check_goals() {
                return StepOutcome::ReachedGoal(target);
            }
            if max_elapsed.is_some_and(|max| self.elapsed() > max) {
                return StepOutcome::TimedUp;
            }
        }
        StepOutcome::Running
    }

    /// First goal (in load order) the ball currently touches
    pub fn check_goals(&self) -> Option<Target> {
        self.goals
            .iter()
            .find(|g| self.ball_intersects_rect(*g))
            .map(|g| g.target)
    }

    pub fn ball_intersects_rect(&self, rect: &impl AxisRect) -> bool {
        ball_intersects_rect(self.ball_pos(), self.ball.radius, rect)
    }

    /// Exchange the two goal identities (and their colors)
    pub fn swap_goals(&mut self) {
        for goal in &mut self.goals {
            goal.target = goal.target.complement();
            goal.color = goal.target.color();
        }
    }

    /// Paint the table: background, ball, walls, goals, occluders
    pub fn draw(&self, canvas: &mut impl Canvas) {
        canvas.fill_background(self.dims, self.background);
        canvas.fill_circle(self.ball_pos(), self.ball.radius, self.ball.color);
        for wall in &self.walls {
            canvas.fill_rect(wall.rect, wall.color);
        }
        for goal in &self.goals {
            canvas.fill_rect(goal.rect, goal.color);
        }
        for occ in &self.occluders {
            canvas.fill_rect(occ.rect, occ.color);
        }
    }
}

/// Thick segments just outside each closed edge (top, right, bottom, left)
fn edge_shapes(dims: DVec2, closed: [bool; 4]) -> Vec<StaticShape> {
    let (w, h, t) = (dims.x, dims.y, EDGE_THICKNESS);
    let segments = [
        (DVec2::new(-1.0, -t), DVec2::new(w + 1.0, -t)),
        (DVec2::new(w + t, -1.0), DVec2::new(w + t, h + t)),
        (DVec2::new(-1.0, h + t), DVec2::new(w + 1.0, h + t)),
        (DVec2::new(-t, -1.0), DVec2::new(-t, h + 1.0)),
    ];
    segments
        .iter()
        .zip(closed)
        .filter(|(_, is_closed)| *is_closed)
        .map(|(&(a, b), _)| StaticShape::Segment {
            a,
            b,
            radius: t,
            elasticity: 1.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{DrawCommand, DrawList};
    use crate::sim::spec::OccluderSpec;
    use crate::sim::spec::tests::{STRAIGHT_SHOT, TWO_GOALS};

    const DEFAULT_SPEED: DVec2 = DVec2::new(175.0, 180.0);

    fn straight_table() -> Table {
        let spec = TrialSpec::from_json_str(STRAIGHT_SHOT).unwrap();
        Table::from_spec(&spec, DEFAULT_SPEED).unwrap()
    }

    #[test]
    fn test_velocity_direction_code() {
        let v = resolve_velocity(DVec2::new(1.0, -1.0), DEFAULT_SPEED);
        assert_eq!(v, DVec2::new(175.0, -180.0));
        // A single unit component is enough to trigger scaling
        let v = resolve_velocity(DVec2::new(0.0, -1.0), DEFAULT_SPEED);
        assert_eq!(v, DVec2::new(0.0, -180.0));
    }

    #[test]
    fn test_velocity_literal_override() {
        let v = resolve_velocity(DVec2::new(10.0, 3.0), DEFAULT_SPEED);
        assert_eq!(v, DVec2::new(10.0, 3.0));
        let v = resolve_velocity(DVec2::new(-250.0, 0.0), DEFAULT_SPEED);
        assert_eq!(v, DVec2::new(-250.0, 0.0));
    }

    #[test]
    fn test_velocity_fallback() {
        assert_eq!(resolve_velocity(DVec2::new(2.0, 5.0), DEFAULT_SPEED), DEFAULT_SPEED);
        assert_eq!(resolve_velocity(DVec2::ZERO, DEFAULT_SPEED), DEFAULT_SPEED);
        assert_eq!(resolve_velocity(DVec2::new(9.9, -9.9), DEFAULT_SPEED), DEFAULT_SPEED);
    }

    #[test]
    fn test_load_builds_closed_edges_only() {
        let mut spec = TrialSpec::from_json_str(STRAIGHT_SHOT).unwrap();
        spec.closed_ends = vec![1, 3];
        let table = Table::from_spec(&spec, DEFAULT_SPEED).unwrap();
        assert_eq!(table.closed_edges(), [true, false, true, false]);
        assert_eq!(table.world.statics().len(), 2);
    }

    #[test]
    fn test_occluders_have_no_physics() {
        let mut spec = TrialSpec::from_json_str(STRAIGHT_SHOT).unwrap();
        spec.closed_ends.clear();
        spec.occluders = vec![OccluderSpec(
            [150.0, 100.0],
            [250.0, 200.0],
            vec![128.0, 128.0, 128.0],
        )];
        let mut table = Table::from_spec(&spec, DEFAULT_SPEED).unwrap();
        assert!(table.world.statics().is_empty());
        // Ball passes straight through the occluder
        assert_eq!(table.step(0.5, None), StepOutcome::Running);
        assert_eq!(table.bounces(), 0);
        assert!((table.ball_pos().x - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_step_reaches_goal() {
        let mut table = straight_table();
        let mut outcome = StepOutcome::Running;
        for _ in 0..100 {
            outcome = table.step(0.025, None);
            if outcome.is_terminal() {
                break;
            }
        }
        assert_eq!(outcome, StepOutcome::ReachedGoal(Target::First));
        assert_eq!(table.bounces(), 0);
        // Ball edge meets the goal at x = 350 after 1.2s
        assert!((table.elapsed() - 1.2).abs() < 0.002);
    }

    #[test]
    fn test_step_times_up() {
        let mut table = straight_table();
        assert_eq!(table.step(0.025, Some(0.0105)), StepOutcome::TimedUp);
        assert_eq!(table.ticks(), 11);
    }

    #[test]
    fn test_goal_beats_timeup_in_same_step() {
        let mut spec = TrialSpec::from_json_str(STRAIGHT_SHOT).unwrap();
        spec.ball.0 = [339.9, 150.0];
        let mut table = Table::from_spec(&spec, DEFAULT_SPEED).unwrap();
        // First substep both touches the goal and exceeds the time budget
        let outcome = table.step(0.025, Some(0.0));
        assert_eq!(outcome, StepOutcome::ReachedGoal(Target::First));
    }

    #[test]
    fn test_non_integer_step_truncates() {
        let mut table = straight_table();
        table.step(0.0105, None);
        assert_eq!(table.ticks(), 10);
    }

    #[test]
    fn test_boundary_bounce_counts() {
        let mut spec = TrialSpec::from_json_str(STRAIGHT_SHOT).unwrap();
        spec.ball.1 = [-200.0, 0.0];
        let mut table = Table::from_spec(&spec, DEFAULT_SPEED).unwrap();
        let mut outcome = StepOutcome::Running;
        while !outcome.is_terminal() {
            outcome = table.step(0.025, Some(10.0));
        }
        assert_eq!(outcome, StepOutcome::ReachedGoal(Target::First));
        assert_eq!(table.bounces(), 1);
    }

    #[test]
    fn test_clone_does_not_perturb_original() {
        let table = straight_table();
        let mut copy = table.clone();
        copy.step(0.5, None);
        assert_eq!(table.elapsed(), 0.0);
        assert_eq!(table.ball_pos(), DVec2::new(100.0, 150.0));
        assert!(copy.ball_pos().x > 150.0);
    }

    #[test]
    fn test_swap_goals() {
        let mut table = straight_table();
        table.swap_goals();
        assert_eq!(table.goals()[0].target, Target::Second);
        assert_eq!(table.goals()[0].color, Color::GREEN);
        table.swap_goals();
        assert_eq!(table.goals()[0].target, Target::First);
        assert_eq!(table.goals()[0].color, Color::RED);
    }

    #[test]
    fn test_two_goals_ball_finds_green() {
        let spec = TrialSpec::from_json_str(TWO_GOALS).unwrap();
        let mut table = Table::from_spec(&spec, DEFAULT_SPEED).unwrap();
        assert_eq!(table.check_goals(), None);
        let mut outcome = StepOutcome::Running;
        while !outcome.is_terminal() {
            outcome = table.step(0.025, Some(10.0));
        }
        assert_eq!(outcome, StepOutcome::ReachedGoal(Target::Second));
        assert_eq!(table.check_goals(), Some(Target::Second));
        // Ball edge meets x = 50 after 0.7s
        assert!((table.elapsed() - 0.7).abs() < 0.002);
    }

    #[test]
    fn test_swap_goals_exchanges_both() {
        let spec = TrialSpec::from_json_str(TWO_GOALS).unwrap();
        let mut table = Table::from_spec(&spec, DEFAULT_SPEED).unwrap();
        table.swap_goals();
        let tags: Vec<_> = table.goals().iter().map(|g| (g.target, g.color)).collect();
        assert_eq!(
            tags,
            vec![(Target::Second, Color::GREEN), (Target::First, Color::RED)]
        );
        // Geometry stays put
        assert_eq!(table.goals()[0].rect, Rect::new(350.0, 100.0, 380.0, 200.0));
    }

    #[test]
    fn test_draw_is_idempotent() {
        let table = straight_table();
        let mut first = DrawList::default();
        let mut second = DrawList::default();
        table.draw(&mut first);
        table.draw(&mut second);
        assert_eq!(first, second);
        assert_eq!(first.commands.len(), 3);
        assert!(matches!(first.commands[1], DrawCommand::Circle { .. }));
        assert_eq!(table.elapsed(), 0.0);
    }
}
