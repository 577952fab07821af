//! Trial scoring
//!
//! A correct response earns `STARTING_SCORE ^ (1 - DISCOUNT * (rt - BUFFER))`,
//! which decays exponentially as latency grows past the buffer allowance
//! (and can exceed the starting score for very fast responses). A wrong goal
//! costs a flat penalty; no response scores zero.

use serde::{Deserialize, Serialize};

use super::table::Target;
use crate::consts::{BUFFER_CONSTANT, DISCOUNT_FACTOR, STARTING_SCORE, WRONG_RESPONSE_PENALTY};

/// Scoring constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub starting_score: f64,
    /// Per-millisecond exponent discount
    pub discount_factor: f64,
    /// Latency allowance (ms) before decay starts biting
    pub buffer_constant: f64,
    pub wrong_penalty: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            starting_score: STARTING_SCORE,
            discount_factor: DISCOUNT_FACTOR,
            buffer_constant: BUFFER_CONSTANT,
            wrong_penalty: WRONG_RESPONSE_PENALTY,
        }
    }
}

/// What the participant chose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Response {
    Chose(Target),
    #[default]
    NoResponse,
}

impl Response {
    pub fn target(&self) -> Option<Target> {
        match self {
            Response::Chose(t) => Some(*t),
            Response::NoResponse => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Response::Chose(t) => t.label(),
            Response::NoResponse => "no response",
        }
    }
}

impl Serialize for Response {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Unrounded score of a correct response after `response_ms`
pub fn raw_score(response_ms: f64, config: &ScoringConfig) -> f64 {
    config
        .starting_score
        .powf(1.0 - config.discount_factor * (response_ms - config.buffer_constant))
}

/// Score a trial. `truth` is `None` when the ball never reached a goal.
pub fn score(
    response: Response,
    truth: Option<Target>,
    response_ms: f64,
    config: &ScoringConfig,
) -> i64 {
    match response {
        Response::NoResponse => 0,
        Response::Chose(chosen) if Some(chosen) == truth => {
            raw_score(response_ms, config).round() as i64
        }
        Response::Chose(_) => config.wrong_penalty,
    }
}
