//! Containment Physics - a ball-trajectory prediction experiment
//!
//! Core modules:
//! - `sim`: Deterministic trial simulation (physics, table, lookahead, trial state machine)
//! - `experiment`: Trial list loading and experiment sequencing
//! - `records`: Logged trial records and the submit payload
//! - `participant`: Simulated participants for headless runs
//! - `persistence`: Data sink for finished experiments
//! - `renderer`: Draw hook for tables

pub mod error;
pub mod experiment;
pub mod participant;
pub mod persistence;
pub mod records;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use error::{ExportError, LoadError, SinkError, TrialError};
pub use experiment::{ExperimentRunner, TrialList};
pub use records::{ExperimentData, TrialRecord};
pub use settings::{RunMode, Settings};

/// Experiment configuration constants (defaults for `Settings`)
pub mod consts {
    /// Logged with every payload
    pub const TASK_NAME: &str = "containment_physics";
    pub const TASK_VERSION: &str = "1.0";

    /// Display tick interval (seconds of simulated time per tick)
    pub const DT: f64 = 0.025;
    /// Physics step size (seconds)
    pub const TIME_RESOLUTION: f64 = 0.001;
    /// Pre-roll length before the response window opens (seconds)
    pub const DISPLAY_TIME: f64 = 0.5;
    /// Response window length (seconds)
    pub const RESPONSE_TIME: f64 = 10.0;
    /// Simulated time budget for the resolution phase (seconds)
    pub const MAX_TIME: f64 = 20.0;
    /// Resolution plays back this many times faster than the display
    pub const FAST_FORWARD: f64 = 3.0;

    /// Speed applied to direction-coded ball velocities (px/s, per axis)
    pub const DEFAULT_VELOCITY: [f64; 2] = [175.0, 180.0];

    /// Scoring: base score, per-ms discount, latency allowance (ms)
    pub const STARTING_SCORE: f64 = 100.0;
    pub const DISCOUNT_FACTOR: f64 = 0.0001;
    pub const BUFFER_CONSTANT: f64 = 250.0;
    /// Flat penalty for choosing the wrong goal
    pub const WRONG_RESPONSE_PENALTY: i64 = -10;

    /// Lookahead safety bound, in display ticks
    pub const LOOKAHEAD_MAX_STEPS: u64 = 40_000;

    /// Boundary edges sit this far outside the table (segment radius)
    pub const EDGE_THICKNESS: f64 = 10.0;
}

/// Current Unix time in milliseconds
pub fn unix_millis() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}
