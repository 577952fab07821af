//! Error taxonomy for trial loading, trial execution and data submission

use thiserror::Error;

use crate::sim::table::Target;
use crate::sim::trial::TrialPhase;

/// Malformed or unsupported trial data. Always fatal for the trial load.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid table dimensions: {width} x {height}")]
    InvalidDims { width: f64, height: f64 },

    #[error("Invalid closed end index {0} (expected 1-4)")]
    InvalidClosedEnd(i64),

    #[error("Invalid ball: {0}")]
    InvalidBall(String),

    #[error("Degenerate {kind} rectangle at index {index}")]
    DegenerateRect { kind: &'static str, index: usize },

    #[error("Restitution {value} out of range [0, 1] for {kind}")]
    InvalidRestitution { kind: &'static str, value: f64 },

    #[error("Invalid color for {kind}: expected 3 or 4 components, got {len}")]
    InvalidColor { kind: &'static str, len: usize },

    #[error("Unknown goal outcome tag: {0}")]
    UnknownGoalTag(i64),

    #[error("Trial has no goals")]
    NoGoals,

    #[error("{0} not supported")]
    Unsupported(&'static str),

    #[error("Unknown trial: {0}")]
    UnknownTrial(String),

    #[error("Condition list entry {0} has no trial file name")]
    InvalidConditionEntry(usize),

    #[error("Trial list is empty")]
    EmptyTrialList,
}

/// Failures while running a trial. Nothing here is retried by the engine.
#[derive(Error, Debug)]
pub enum TrialError {
    #[error("Trial load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Lookahead did not terminate after {steps} steps ({elapsed:.3}s simulated)")]
    NonTerminatingLookahead { steps: u64, elapsed: f64 },

    #[error("Ball reached the {0:?} goal during pre-roll")]
    PrematureOutcome(Target),

    #[error("Cannot {action} while {from:?}")]
    InvalidTransition {
        from: TrialPhase,
        action: &'static str,
    },

    #[error("No tick source armed while {0:?}")]
    NoActiveTickSource(TrialPhase),

    #[error("Trial not finished")]
    NotFinished,
}

/// Data sink failures. Reported, never fatal to the experiment.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Submission rejected: {0}")]
    Rejected(String),
}

impl SinkError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            SinkError::Io(_) => true,
            SinkError::Rejected(_) => true,
            SinkError::Json(_) => false,
        }
    }
}

/// Failures while exporting saved sessions
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
