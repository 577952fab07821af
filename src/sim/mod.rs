//! Deterministic simulation module
//!
//! Everything that decides where the ball goes lives here. This module must
//! stay deterministic:
//! - Fixed time resolution only
//! - Stable iteration order (load order of walls and goals)
//! - No rendering or platform dependencies; time comes from the caller

pub mod collision;
pub mod geometry;
pub mod lookahead;
pub mod physics;
pub mod schedule;
pub mod scoring;
pub mod spec;
pub mod table;
pub mod trial;

pub use geometry::{AxisRect, Rect, clever_dist, edist, edist_within};
pub use lookahead::{Lookahead, LookaheadLimits, simulate_spec, simulate_to_termination};
pub use physics::{Body, PhysicsWorld, StaticShape};
pub use schedule::{TickScheduler, TimerFired, TimerId, TimerKind};
pub use scoring::{Response, ScoringConfig, raw_score, score};
pub use spec::{Color, TrialSpec};
pub use table::{Goal, Occluder, StepOutcome, Table, Target, Wall};
pub use trial::{FreezeFrame, TrialConfig, TrialEngine, TrialEvent, TrialPhase};
