//! Experiment settings
//!
//! Loaded from an optional JSON file; every field falls back to the defaults in `consts`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::LoadError;
use crate::sim::scoring::ScoringConfig;

/// How the experiment is run and whether its data is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Real participant session, data submitted as `user_<ts>`
    #[default]
    Normal,
    /// Full run, data submitted as `TEST_<ts>`
    Test,
    /// Two trials only, nothing submitted
    Short,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Normal => "normal",
            RunMode::Test => "test",
            RunMode::Short => "short",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" | "" => Some(RunMode::Normal),
            "test" => Some(RunMode::Test),
            "short" => Some(RunMode::Short),
            _ => None,
        }
    }

    /// Session id prefix for submitted data
    pub fn session_prefix(&self) -> &'static str {
        match self {
            RunMode::Test => "TEST_",
            RunMode::Normal | RunMode::Short => "user_",
        }
    }

    /// Maximum number of trials to run (None = whole list)
    pub fn trial_limit(&self) -> Option<usize> {
        match self {
            RunMode::Short => Some(2),
            _ => None,
        }
    }

    pub fn submits(&self) -> bool {
        *self != RunMode::Short
    }
}

/// Trial pacing, all in seconds of simulated time unless noted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Display tick interval
    pub dt: f64,
    /// Physics step size
    pub time_resolution: f64,
    /// Pre-roll length
    pub display_time: f64,
    /// Response window length
    pub response_time: f64,
    /// Resolution time budget
    pub max_time: f64,
    /// Resolution tick speed-up relative to the display cadence
    pub fast_forward: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            dt: DT,
            time_resolution: TIME_RESOLUTION,
            display_time: DISPLAY_TIME,
            response_time: RESPONSE_TIME,
            max_time: MAX_TIME,
            fast_forward: FAST_FORWARD,
        }
    }
}

impl Timing {
    /// Wall-clock interval between display ticks (ms)
    pub fn display_interval_ms(&self) -> f64 {
        self.dt * 1000.0
    }

    /// Wall-clock interval between resolution ticks (ms)
    pub fn resolution_interval_ms(&self) -> f64 {
        self.dt * 1000.0 / self.fast_forward
    }

    pub fn response_timeout_ms(&self) -> f64 {
        self.response_time * 1000.0
    }
}

/// Experiment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub task_name: String,
    pub task_version: String,
    pub mode: RunMode,

    pub timing: Timing,
    /// Speed (px/s per axis) for direction-coded ball velocities
    pub default_velocity: [f64; 2],
    pub scoring: ScoringConfig,

    /// Lookahead safety bound (display ticks)
    pub lookahead_max_steps: u64,
    /// Optional simulated-time bound for the lookahead
    pub lookahead_max_elapsed: Option<f64>,

    /// Swap goal identities with 50% probability each trial
    pub randomize_goals: bool,
    /// RNG seed for shuffling and goal swaps (random when absent)
    pub seed: Option<u64>,
    /// Extra submit attempts after the first failure
    pub submit_retries: u32,
    /// Log and skip a trial that fails instead of halting the session
    pub skip_failed_trials: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            task_name: TASK_NAME.to_string(),
            task_version: TASK_VERSION.to_string(),
            mode: RunMode::Normal,
            timing: Timing::default(),
            default_velocity: DEFAULT_VELOCITY,
            scoring: ScoringConfig::default(),
            lookahead_max_steps: LOOKAHEAD_MAX_STEPS,
            lookahead_max_elapsed: None,
            randomize_goals: true,
            seed: None,
            submit_retries: 3,
            skip_failed_trials: false,
        }
    }
}

impl Settings {
    /// Create settings for a run mode (everything else default)
    pub fn from_mode(mode: RunMode) -> Self {
        let mut settings = Self::default();
        settings.mode = mode;
        settings
    }

    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
