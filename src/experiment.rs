//! Experiment sequencing
//!
//! `TrialList` preloads every trial named in a condition list. The
//! `ExperimentRunner` shuffles it, plays each trial headlessly on a virtual
//! millisecond clock, and collects the records for submission.

use std::path::Path;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;

use crate::error::{LoadError, TrialError};
use crate::participant::Participant;
use crate::persistence::{DataSink, submit_with_retry};
use crate::records::{ClientInfo, ExperimentData, ExperimentInfo, Scoreboard, TrialRecord};
use crate::settings::{RunMode, Settings};
use crate::sim::spec::TrialSpec;
use crate::sim::trial::{TrialConfig, TrialEngine, TrialPhase};
use crate::unix_millis;

/// Trial specs keyed by file name, in condition-list order
#[derive(Debug, Clone, PartialEq)]
pub struct TrialList {
    entries: Vec<(String, TrialSpec)>,
}

impl TrialList {
    /// Load a condition list and every trial file it names from `trial_dir`
    pub fn load(condition_list: &Path, trial_dir: &Path) -> Result<Self, LoadError> {
        let json = std::fs::read_to_string(condition_list)?;
        let names = Self::parse_condition_list(&json)?;
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let path = trial_dir.join(&name);
            let spec = std::fs::read_to_string(&path)
                .map_err(LoadError::from)
                .and_then(|json| TrialSpec::from_json_str(&json))
                .inspect_err(|e| log::error!("Failed to load trial {}: {}", path.display(), e))?;
            entries.push((name, spec));
        }
        log::info!(
            "Loaded {} trials from {}",
            entries.len(),
            condition_list.display()
        );
        Self::from_entries(entries)
    }

    /// Condition lists are arrays of arrays; the trial file name comes first
    pub fn parse_condition_list(json: &str) -> Result<Vec<String>, LoadError> {
        let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(json)?;
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                row.first()
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or(LoadError::InvalidConditionEntry(i))
            })
            .collect()
    }

    pub fn from_entries(entries: Vec<(String, TrialSpec)>) -> Result<Self, LoadError> {
        if entries.is_empty() {
            return Err(LoadError::EmptyTrialList);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Result<&TrialSpec, LoadError> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
            .ok_or_else(|| LoadError::UnknownTrial(name.to_string()))
    }
}

/// Pick the condition list for a run. Short runs use their own list when
/// one is given (the trial cap still applies).
pub fn condition_list_for<'a>(
    mode: RunMode,
    conditions: &'a Path,
    short_conditions: Option<&'a Path>,
) -> &'a Path {
    match (mode, short_conditions) {
        (RunMode::Short, Some(path)) => path,
        _ => conditions,
    }
}

pub struct ExperimentRunner {
    settings: Settings,
    config: TrialConfig,
    trials: TrialList,
    order: Vec<String>,
    next: usize,
    seed: u64,
    rng: Pcg32,
    session_id: String,
    records: Vec<TrialRecord>,
    /// Trials abandoned after an error
    skipped: Vec<String>,
    scoreboard: Scoreboard,
    /// Virtual driver clock (ms)
    clock_ms: f64,
}

impl ExperimentRunner {
    pub fn new(settings: Settings, trials: TrialList) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut order: Vec<String> = trials.names().map(str::to_string).collect();
        order.shuffle(&mut rng);

        let session_id = format!(
            "{}{}",
            settings.mode.session_prefix(),
            unix_millis() as u64
        );
        log::info!(
            "New experiment {} ({} mode, {} trials, seed {})",
            session_id,
            settings.mode.as_str(),
            order.len(),
            seed
        );

        Self {
            config: TrialConfig::from_settings(&settings),
            settings,
            trials,
            order,
            next: 0,
            seed,
            rng,
            session_id,
            records: Vec::new(),
            skipped: Vec::new(),
            scoreboard: Scoreboard::new(),
            clock_ms: 0.0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Shuffled presentation order
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// Trials this session will run
    pub fn total_trials(&self) -> usize {
        match self.settings.mode.trial_limit() {
            Some(limit) => limit.min(self.order.len()),
            None => self.order.len(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.total_trials()
    }

    pub fn next_trial_name(&self) -> Option<&str> {
        if self.is_finished() {
            None
        } else {
            self.order.get(self.next).map(String::as_str)
        }
    }

    /// Play the next trial. Returns `None` once the session is over.
    pub fn run_next(
        &mut self,
        participant: &mut dyn Participant,
    ) -> Result<Option<&TrialRecord>, TrialError> {
        let Some(name) = self.next_trial_name() else {
            return Ok(None);
        };
        let spec = self.trials.get(name)?.clone();
        let index = self.next + 1;
        let record = self.play(spec, participant, index)?;

        self.scoreboard.add(record.score);
        log::info!(
            "Trial {}/{} '{}' scored {} (total {})",
            index,
            self.total_trials(),
            record.trial_name,
            record.score,
            self.scoreboard.total
        );
        self.records.push(record);
        self.next += 1;
        Ok(self.records.last())
    }

    /// Give up on the pending trial and move on to the next one
    pub fn skip_current(&mut self) -> Option<String> {
        let name = self.next_trial_name()?.to_string();
        log::warn!("Skipping trial '{}'", name);
        self.skipped.push(name.clone());
        self.next += 1;
        Some(name)
    }

    /// Play every remaining trial.
    ///
    /// A failing trial halts the run and stays pending, unless
    /// `skip_failed_trials` is set. Records finished so far are kept either way.
    pub fn run(&mut self, participant: &mut dyn Participant) -> Result<&[TrialRecord], TrialError> {
        loop {
            match self.run_next(participant).map(|r| r.is_some()) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) if self.settings.skip_failed_trials => {
                    log::warn!("Trial {} failed: {}", self.next + 1, e);
                    self.skip_current();
                }
                Err(e) => return Err(e),
            }
        }
        log::info!(
            "Experiment {} done: {} trials, {} skipped, total score {}",
            self.session_id,
            self.records.len(),
            self.skipped.len(),
            self.scoreboard.total
        );
        Ok(&self.records)
    }

    fn play(
        &mut self,
        spec: TrialSpec,
        participant: &mut dyn Participant,
        index: usize,
    ) -> Result<TrialRecord, TrialError> {
        let mut engine = TrialEngine::load(spec, self.config)?;
        engine.compute_lookahead()?;
        if self.settings.randomize_goals {
            engine.randomize_goals(&mut self.rng)?;
        } else {
            engine.set_goal_swap(false)?;
        }
        engine.start(self.clock_ms)?;

        // Pending key press at an absolute clock time
        let mut key = None;
        let mut asked = false;
        while !engine.is_done() {
            if engine.phase() == TrialPhase::AwaitingResponse && !asked {
                asked = true;
                if let Some(frame) = engine.freeze_frame() {
                    key = participant
                        .respond(engine.table(), frame)
                        .map(|(target, latency)| (target, self.clock_ms + latency.max(0.0)));
                }
            }
            let due = engine
                .next_due()
                .ok_or(TrialError::NoActiveTickSource(engine.phase()))?;
            match key.take() {
                Some((target, at))
                    if engine.phase() == TrialPhase::AwaitingResponse && at < due =>
                {
                    self.clock_ms = at;
                    engine.press(target, at)?;
                }
                _ => {
                    self.clock_ms = due;
                    engine.advance_to(due)?;
                }
            }
        }
        engine.record(index, unix_millis())
    }

    /// End-of-session payload
    pub fn payload(&self) -> ExperimentData {
        ExperimentData {
            expt: ExperimentInfo {
                name: self.settings.task_name.clone(),
                version: self.settings.task_version.clone(),
            },
            client: ClientInfo {
                sid: self.session_id.clone(),
                test: self.settings.mode == RunMode::Test,
            },
            trials: self.records.clone(),
        }
    }

    /// Submit the payload. Returns whether anything was stored.
    pub fn finish(&self, sink: &mut dyn DataSink) -> bool {
        if !self.settings.mode.submits() {
            log::info!("{} run; not submitting data", self.settings.mode.as_str());
            return false;
        }
        submit_with_retry(
            sink,
            &self.session_id,
            &self.payload(),
            self.settings.submit_retries,
        )
    }
}
