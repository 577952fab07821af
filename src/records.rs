//! Logged trial records and the end-of-experiment payload
//!
//! Field names follow the wire keys consumed by the analysis scripts
//! (`logts`, `trialname`, ...), so the structs carry serde renames.

use std::io::Write;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExportError;
use crate::sim::spec::TrialSpec;
use crate::sim::table::{Goal, Wall};

/// A point logged as `{"x": .., "y": ..}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl From<DVec2> for Position {
    fn from(v: DVec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// Gap from the frozen ball to one goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalDistance {
    /// Goal color name at presentation time
    pub name: String,
    pub goal: Goal,
    #[serde(rename = "goaldist")]
    pub distance: f64,
}

/// Gap from the frozen ball to one wall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallDistance {
    pub wall: Wall,
    #[serde(rename = "walldist")]
    pub distance: f64,
}

/// One finished trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Completion time (Unix ms)
    #[serde(rename = "logts")]
    pub timestamp: f64,
    #[serde(rename = "trialname")]
    pub trial_name: String,
    /// 1-based position in this session
    #[serde(rename = "trialindex")]
    pub trial_index: usize,
    /// Full trial definition so the trial can be rebuilt
    #[serde(rename = "trialstructure")]
    pub trial_structure: TrialSpec,
    #[serde(rename = "goaldistances")]
    pub goal_distances: Vec<GoalDistance>,
    #[serde(rename = "numwalls")]
    pub num_walls: usize,
    #[serde(rename = "walldistances")]
    pub wall_distances: Vec<WallDistance>,
    #[serde(rename = "numbounces")]
    pub num_bounces: u32,
    #[serde(rename = "ballstartpos")]
    pub ball_start_pos: Position,
    #[serde(rename = "ballwaitpos")]
    pub ball_wait_pos: Position,
    /// True goal ("red"/"green"), null if the ball never reached one
    #[serde(rename = "trialtarget")]
    pub trial_target: Option<String>,
    #[serde(rename = "targetswitched")]
    pub target_switched: bool,
    /// "red", "green" or "no response"
    #[serde(rename = "usertarget")]
    pub user_target: String,
    /// Response latency (ms)
    #[serde(rename = "responsetime")]
    pub response_time: f64,
    /// Lookahead wall-clock cost (ms)
    #[serde(rename = "simtime")]
    pub sim_time: f64,
    /// Resolution playback duration on the driver clock (ms)
    #[serde(rename = "resolvetime")]
    pub resolve_time: f64,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentInfo {
    #[serde(rename = "exptname")]
    pub name: String,
    #[serde(rename = "exptversion")]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Session id
    pub sid: String,
    pub test: bool,
}

/// Everything submitted at the end of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentData {
    pub expt: ExperimentInfo,
    pub client: ClientInfo,
    pub trials: Vec<TrialRecord>,
}

impl ExperimentData {
    pub fn total_score(&self) -> i64 {
        self.trials.iter().map(|t| t.score).sum()
    }
}

/// Record keys in wire order, as exported after the `subjID` column
pub const CSV_COLUMNS: [&str; 17] = [
    "logts",
    "trialname",
    "trialindex",
    "trialstructure",
    "goaldistances",
    "numwalls",
    "walldistances",
    "numbounces",
    "ballstartpos",
    "ballwaitpos",
    "trialtarget",
    "targetswitched",
    "usertarget",
    "responsetime",
    "simtime",
    "resolvetime",
    "score",
];

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        // Nested structures stay as compact JSON
        other => other.to_string(),
    }
}

/// Flatten sessions into one CSV row per trial. Returns the row count.
pub fn write_csv<W: Write>(sessions: &[ExperimentData], writer: W) -> Result<usize, ExportError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(std::iter::once("subjID").chain(CSV_COLUMNS))?;
    let mut rows = 0;
    for session in sessions {
        for trial in &session.trials {
            let value = serde_json::to_value(trial)?;
            let mut row = vec![session.client.sid.clone()];
            row.extend(CSV_COLUMNS.iter().map(|key| csv_cell(&value[*key])));
            out.write_record(&row)?;
            rows += 1;
        }
    }
    out.flush()?;
    log::info!("Exported {} trials from {} sessions", rows, sessions.len());
    Ok(rows)
}

/// Running score shown to the participant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub total: i64,
    pub trials: usize,
    pub last: Option<i64>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, score: i64) {
        self.total += score;
        self.trials += 1;
        self.last = Some(score);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Mean score per trial (0 when empty)
    pub fn average(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.total as f64 / self.trials as f64
        }
    }
}
