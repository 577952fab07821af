//! Data sinks for finished experiments
//!
//! Features:
//! - `DataSink` trait so the runner does not care where data goes
//! - JSON directory sink (`<session id>.json`, written via tmp + rename)
//! - In-memory sink for tests and dry runs
//! - Bounded retry that logs failures instead of crashing the session
//! - Reading saved sessions back for export

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ExportError, SinkError};
use crate::records::ExperimentData;

pub trait DataSink {
    fn submit(&mut self, session_id: &str, data: &ExperimentData) -> Result<(), SinkError>;
}

/// Writes one pretty-printed JSON file per session
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    /// Read back saved participant sessions, sorted by file name.
    /// `TEST_` sessions are skipped unless `include_test` is set.
    pub fn load_sessions(&self, include_test: bool) -> Result<Vec<ExperimentData>, ExportError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let wanted = name.starts_with("user_") || (include_test && name.starts_with("TEST_"));
            if wanted && name.ends_with(".json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut sessions = Vec::with_capacity(paths.len());
        for path in paths {
            log::debug!("Reading {}", path.display());
            let json = fs::read_to_string(&path)?;
            sessions.push(serde_json::from_str(&json)?);
        }
        Ok(sessions)
    }
}

impl DataSink for JsonDirSink {
    fn submit(&mut self, session_id: &str, data: &ExperimentData) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(data)?;
        let path = self.path_for(session_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        log::info!(
            "Saved {} trials for {} to {}",
            data.trials.len(),
            session_id,
            path.display()
        );
        Ok(())
    }
}

/// Keeps submissions in memory. `fail_next` rejects that many submits first.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub submitted: Vec<(String, ExperimentData)>,
    pub fail_next: u32,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataSink for MemorySink {
    fn submit(&mut self, session_id: &str, data: &ExperimentData) -> Result<(), SinkError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(SinkError::Rejected("sink unavailable".to_string()));
        }
        self.submitted.push((session_id.to_string(), data.clone()));
        Ok(())
    }
}

/// Submit with up to `retries` extra attempts. Returns whether it landed.
pub fn submit_with_retry(
    sink: &mut dyn DataSink,
    session_id: &str,
    data: &ExperimentData,
    retries: u32,
) -> bool {
    for attempt in 0..=retries {
        match sink.submit(session_id, data) {
            Ok(()) => return true,
            Err(e) if e.is_recoverable() && attempt < retries => {
                log::warn!("Submit attempt {} failed: {}", attempt + 1, e);
            }
            Err(e) => {
                log::error!("Failed to submit data for {}: {}", session_id, e);
                return false;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ClientInfo, ExperimentInfo};

    fn data() -> ExperimentData {
        ExperimentData {
            expt: ExperimentInfo {
                name: "containment_physics".to_string(),
                version: "1.0".to_string(),
            },
            client: ClientInfo {
                sid: "TEST_1".to_string(),
                test: true,
            },
            trials: vec![],
        }
    }

    #[test]
    fn test_json_dir_sink_writes_payload() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonDirSink::new(dir.path().join("out"));
        sink.submit("TEST_1", &data()).unwrap();

        let written = fs::read_to_string(sink.path_for("TEST_1")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["expt"]["exptname"], "containment_physics");
        assert_eq!(value["client"]["sid"], "TEST_1");
        assert_eq!(value["client"]["test"], true);
        assert!(!sink.path_for("TEST_1").with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_sessions_filters_test_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonDirSink::new(dir.path());
        sink.submit("user_2", &data()).unwrap();
        sink.submit("user_1", &data()).unwrap();
        sink.submit("TEST_3", &data()).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let sessions = sink.load_sessions(false).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sink.load_sessions(true).unwrap().len(), 3);
        assert_eq!(sessions[0], data());
    }

    #[test]
    fn test_retry_recovers() {
        let mut sink = MemorySink {
            fail_next: 2,
            ..MemorySink::default()
        };
        assert!(submit_with_retry(&mut sink, "user_1", &data(), 3));
        assert_eq!(sink.submitted.len(), 1);
    }

    #[test]
    fn test_retry_gives_up() {
        let mut sink = MemorySink {
            fail_next: 5,
            ..MemorySink::default()
        };
        assert!(!submit_with_retry(&mut sink, "user_1", &data(), 2));
        assert!(sink.submitted.is_empty());
        assert_eq!(sink.fail_next, 2);
    }
}
