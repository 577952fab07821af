//! Trial engine: the per-trial state machine
//!
//! `Idle -> LookaheadComputed -> PreRoll -> AwaitingResponse -> Resolving -> Done`
//!
//! The engine owns the live table and exactly one tick source. Every phase
//! transition disarms the current timer before arming the next, and timer
//! fires are checked against the id the engine last armed, so whichever of
//! key press and response timeout arrives second is silently dropped.

use glam::DVec2;
use rand::Rng;

use super::geometry::clever_dist;
use super::lookahead::{Lookahead, LookaheadLimits, simulate_to_termination};
use super::schedule::{TickScheduler, TimerFired, TimerId, TimerKind};
use super::scoring::{Response, ScoringConfig, score};
use super::spec::TrialSpec;
use super::table::{StepOutcome, Table, Target};
use crate::error::TrialError;
use crate::records::{GoalDistance, Position, TrialRecord, WallDistance};
use crate::settings::{Settings, Timing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    Idle,
    LookaheadComputed,
    PreRoll,
    AwaitingResponse,
    Resolving,
    Done,
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrialEvent {
    Timer(TimerFired),
    Key(Target),
}

/// Per-trial parameters derived from `Settings`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialConfig {
    pub timing: Timing,
    pub default_velocity: DVec2,
    pub scoring: ScoringConfig,
    pub lookahead_max_steps: u64,
    pub lookahead_max_elapsed: Option<f64>,
}

impl TrialConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            timing: settings.timing,
            default_velocity: DVec2::from(settings.default_velocity),
            scoring: settings.scoring,
            lookahead_max_steps: settings.lookahead_max_steps,
            lookahead_max_elapsed: settings.lookahead_max_elapsed,
        }
    }

    pub fn lookahead_limits(&self) -> LookaheadLimits {
        LookaheadLimits {
            dt: self.timing.dt,
            max_steps: self.lookahead_max_steps,
            max_elapsed: self.lookahead_max_elapsed,
        }
    }
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// State captured when the simulation freezes for the response
#[derive(Debug, Clone, PartialEq)]
pub struct FreezeFrame {
    pub ball_pos: DVec2,
    pub goal_distances: Vec<GoalDistance>,
    pub wall_distances: Vec<WallDistance>,
}

impl FreezeFrame {
    fn capture(table: &Table) -> Self {
        let ball_pos = table.ball_pos();
        let goal_distances = table
            .goals()
            .iter()
            .map(|g| GoalDistance {
                name: g.target.label().to_string(),
                goal: *g,
                distance: clever_dist(ball_pos, g),
            })
            .collect();
        let wall_distances = table
            .walls()
            .iter()
            .map(|w| WallDistance {
                wall: *w,
                distance: clever_dist(ball_pos, w),
            })
            .collect();
        Self {
            ball_pos,
            goal_distances,
            wall_distances,
        }
    }
}

pub struct TrialEngine {
    spec: TrialSpec,
    config: TrialConfig,
    phase: TrialPhase,
    table: Table,
    scheduler: TickScheduler,
    /// Timer the engine currently listens to
    armed: Option<TimerId>,

    lookahead: Option<Lookahead>,
    truth: Option<Target>,
    swap_decided: bool,
    swapped: bool,

    ball_start: DVec2,
    freeze: Option<FreezeFrame>,
    response: Response,
    response_started_ms: f64,
    response_ms: f64,
    resolve_started_ms: f64,
    resolve_ms: f64,
    resolved: Option<StepOutcome>,
    score: Option<i64>,
}

impl TrialEngine {
    /// Build the live table for a trial
    pub fn load(spec: TrialSpec, config: TrialConfig) -> Result<Self, TrialError> {
        let table = Table::from_spec_with_resolution(
            &spec,
            config.default_velocity,
            config.timing.time_resolution,
        )?;
        log::info!(
            "Loaded trial '{}' ({} walls, {} goals)",
            spec.name,
            table.walls().len(),
            table.goals().len()
        );
        let ball_start = table.ball_pos();
        Ok(Self {
            spec,
            config,
            phase: TrialPhase::Idle,
            table,
            scheduler: TickScheduler::new(),
            armed: None,
            lookahead: None,
            truth: None,
            swap_decided: false,
            swapped: false,
            ball_start,
            freeze: None,
            response: Response::NoResponse,
            response_started_ms: 0.0,
            response_ms: 0.0,
            resolve_started_ms: 0.0,
            resolve_ms: 0.0,
            resolved: None,
            score: None,
        })
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == TrialPhase::Done
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &TrialSpec {
        &self.spec
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn lookahead(&self) -> Option<&Lookahead> {
        self.lookahead.as_ref()
    }

    /// Ground truth for the current presentation (after any goal swap)
    pub fn truth(&self) -> Option<Target> {
        self.truth
    }

    pub fn goals_swapped(&self) -> bool {
        self.swapped
    }

    pub fn freeze_frame(&self) -> Option<&FreezeFrame> {
        self.freeze.as_ref()
    }

    pub fn response(&self) -> Response {
        self.response
    }

    pub fn response_ms(&self) -> f64 {
        self.response_ms
    }

    /// Terminal outcome of the live table
    pub fn resolved(&self) -> Option<StepOutcome> {
        self.resolved
    }

    pub fn score(&self) -> Option<i64> {
        self.score
    }

    /// When the armed tick source fires next
    pub fn next_due(&self) -> Option<f64> {
        self.scheduler.next_due()
    }

    fn expect_phase(&self, phase: TrialPhase, action: &'static str) -> Result<(), TrialError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(TrialError::InvalidTransition {
                from: self.phase,
                action,
            })
        }
    }

    fn arm_interval(&mut self, kind: TimerKind, now_ms: f64, period_ms: f64) {
        self.armed = Some(self.scheduler.arm_interval(kind, now_ms, period_ms));
    }

    fn arm_timeout(&mut self, kind: TimerKind, now_ms: f64, delay_ms: f64) {
        self.armed = Some(self.scheduler.arm_timeout(kind, now_ms, delay_ms));
    }

    fn disarm(&mut self) {
        self.scheduler.disarm();
        self.armed = None;
    }

    /// Idle -> LookaheadComputed: run a clone of the table to its outcome
    pub fn compute_lookahead(&mut self) -> Result<&Lookahead, TrialError> {
        self.expect_phase(TrialPhase::Idle, "compute lookahead")?;
        let result = simulate_to_termination(&self.table, &self.config.lookahead_limits())?;
        log::info!(
            "Lookahead for '{}': {:?} after {} bounces ({:.2}s simulated, {:.2}ms)",
            self.spec.name,
            result.outcome,
            result.bounces,
            result.elapsed,
            result.cost_ms
        );
        self.truth = result.target();
        self.phase = TrialPhase::LookaheadComputed;
        Ok(&*self.lookahead.insert(result))
    }

    /// Swap goal identities with probability 1/2. Returns whether it swapped.
    pub fn randomize_goals<R: Rng>(&mut self, rng: &mut R) -> Result<bool, TrialError> {
        let swap = rng.random_bool(0.5);
        self.set_goal_swap(swap)?;
        Ok(swap)
    }

    /// Decide the goal swap for this trial. Allowed once, after the lookahead.
    pub fn set_goal_swap(&mut self, swap: bool) -> Result<(), TrialError> {
        self.expect_phase(TrialPhase::LookaheadComputed, "swap goals")?;
        if self.swap_decided {
            return Err(TrialError::InvalidTransition {
                from: self.phase,
                action: "swap goals twice",
            });
        }
        self.swap_decided = true;
        if swap {
            self.table.swap_goals();
            self.truth = self.truth.map(|t| t.complement());
            self.swapped = true;
            log::info!("Goals swapped for '{}'", self.spec.name);
        }
        Ok(())
    }

    /// LookaheadComputed -> PreRoll: start the display ticks
    pub fn start(&mut self, now_ms: f64) -> Result<(), TrialError> {
        self.expect_phase(TrialPhase::LookaheadComputed, "start")?;
        self.swap_decided = true;
        self.ball_start = self.table.ball_pos();
        let period = self.config.timing.display_interval_ms();
        self.arm_interval(TimerKind::Display, now_ms, period);
        self.phase = TrialPhase::PreRoll;
        Ok(())
    }

    /// Fire every timer due at or before `now_ms`
    pub fn advance_to(&mut self, now_ms: f64) -> Result<TrialPhase, TrialError> {
        while let Some(fired) = self.scheduler.poll(now_ms) {
            self.handle(TrialEvent::Timer(fired), fired.at_ms)?;
            if self.is_done() {
                break;
            }
        }
        Ok(self.phase)
    }

    /// Participant key press
    pub fn press(&mut self, target: Target, now_ms: f64) -> Result<TrialPhase, TrialError> {
        self.handle(TrialEvent::Key(target), now_ms)
    }

    /// Dispatch a single event
    pub fn handle(&mut self, event: TrialEvent, now_ms: f64) -> Result<TrialPhase, TrialError> {
        match event {
            TrialEvent::Timer(fired) => {
                if self.armed != Some(fired.id) {
                    log::debug!("Ignoring stale {:?} timer", fired.kind);
                    return Ok(self.phase);
                }
                match (self.phase, fired.kind) {
                    (TrialPhase::PreRoll, TimerKind::Display) => self.display_tick(now_ms)?,
                    (TrialPhase::AwaitingResponse, TimerKind::ResponseTimeout) => {
                        self.respond(Response::NoResponse, now_ms)
                    }
                    (TrialPhase::Resolving, TimerKind::Resolution) => self.resolution_tick(now_ms),
                    (phase, kind) => log::debug!("Ignoring {kind:?} timer while {phase:?}"),
                }
            }
            TrialEvent::Key(target) => {
                if self.phase == TrialPhase::AwaitingResponse {
                    self.respond(Response::Chose(target), now_ms);
                } else {
                    log::debug!("Ignoring {:?} key while {:?}", target, self.phase);
                }
            }
        }
        Ok(self.phase)
    }

    fn display_tick(&mut self, now_ms: f64) -> Result<(), TrialError> {
        let display_time = self.config.timing.display_time;
        match self.table.step(self.config.timing.dt, Some(display_time)) {
            StepOutcome::Running => Ok(()),
            StepOutcome::TimedUp => {
                self.await_response(now_ms);
                Ok(())
            }
            StepOutcome::ReachedGoal(target) => {
                self.disarm();
                Err(TrialError::PrematureOutcome(target))
            }
        }
    }

    /// PreRoll -> AwaitingResponse: freeze and capture features
    fn await_response(&mut self, now_ms: f64) {
        self.disarm();
        let frame = FreezeFrame::capture(&self.table);
        log::debug!("Response window opens with ball at {:?}", frame.ball_pos);
        self.freeze = Some(frame);
        self.response_started_ms = now_ms;
        let timeout = self.config.timing.response_timeout_ms();
        self.arm_timeout(TimerKind::ResponseTimeout, now_ms, timeout);
        self.phase = TrialPhase::AwaitingResponse;
    }

    /// AwaitingResponse -> Resolving: first trigger wins
    fn respond(&mut self, response: Response, now_ms: f64) {
        self.disarm();
        self.response = response;
        self.response_ms = now_ms - self.response_started_ms;
        log::info!(
            "Response '{}' after {:.0}ms",
            response.label(),
            self.response_ms
        );
        self.resolve_started_ms = now_ms;
        let period = self.config.timing.resolution_interval_ms();
        self.arm_interval(TimerKind::Resolution, now_ms, period);
        self.phase = TrialPhase::Resolving;
    }

    fn resolution_tick(&mut self, now_ms: f64) {
        let outcome = self
            .table
            .step(self.config.timing.dt, Some(self.config.timing.max_time));
        if !outcome.is_terminal() {
            return;
        }
        self.disarm();
        match outcome {
            StepOutcome::TimedUp => {
                log::warn!("Trial '{}' timed up before reaching a goal", self.spec.name)
            }
            StepOutcome::ReachedGoal(target) if Some(target) != self.truth => log::warn!(
                "Trial '{}' resolved to {:?} but lookahead predicted {:?}",
                self.spec.name,
                target,
                self.truth
            ),
            _ => {}
        }
        self.resolved = Some(outcome);
        self.resolve_ms = now_ms - self.resolve_started_ms;
        let points = score(
            self.response,
            self.truth,
            self.response_ms,
            &self.config.scoring,
        );
        log::info!("Trial '{}' scored {}", self.spec.name, points);
        self.score = Some(points);
        self.phase = TrialPhase::Done;
    }

    /// Build the log record for a finished trial
    pub fn record(&self, trial_index: usize, timestamp: f64) -> Result<TrialRecord, TrialError> {
        let (Some(points), Some(frame)) = (self.score, self.freeze.as_ref()) else {
            return Err(TrialError::NotFinished);
        };
        Ok(TrialRecord {
            timestamp,
            trial_name: self.spec.name.clone(),
            trial_index,
            trial_structure: self.spec.clone(),
            goal_distances: frame.goal_distances.clone(),
            num_walls: self.spec.walls.len(),
            wall_distances: frame.wall_distances.clone(),
            num_bounces: self.lookahead.map(|l| l.bounces).unwrap_or(0),
            ball_start_pos: Position::from(self.ball_start),
            ball_wait_pos: Position::from(frame.ball_pos),
            trial_target: self.truth.map(|t| t.label().to_string()),
            target_switched: self.swapped,
            user_target: self.response.label().to_string(),
            response_time: self.response_ms,
            sim_time: self.lookahead.map(|l| l.cost_ms).unwrap_or(0.0),
            resolve_time: self.resolve_ms,
            score: points,
        })
    }
}
