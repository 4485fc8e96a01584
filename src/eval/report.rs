//! Result sinks

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::core::{DebateOutcome, Result};

/// Destination for finished debates
pub trait ResultSink: Send {
    /// Persist one outcome
    fn record(&mut self, outcome: &DebateOutcome) -> Result<()>;

    /// Question ids already recorded
    fn existing_ids(&self) -> Result<HashSet<String>>;
}

/// Appends one JSON-encoded [`DebateOutcome`] per line
pub struct JsonlSink {
    path: PathBuf,
    file: File,
}

impl JsonlSink {
    /// Open `path` for appending, truncating it first when `overwrite` is set
    pub fn open(path: impl AsRef<Path>, overwrite: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(!overwrite)
            .write(true)
            .truncate(overwrite)
            .open(&path)?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Deserialize)]
struct RecordedId {
    result: RecordedResult,
}

#[derive(Deserialize)]
struct RecordedResult {
    question_id: String,
}

impl ResultSink for JsonlSink {
    fn record(&mut self, outcome: &DebateOutcome) -> Result<()> {
        let line = serde_json::to_string(outcome)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    fn existing_ids(&self) -> Result<HashSet<String>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut ids = HashSet::new();

        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RecordedId>(&line) {
                Ok(record) => {
                    ids.insert(record.result.question_id);
                }
                Err(e) => warn!(path = %self.path.display(), line = n + 1, error = %e, "skipping unreadable result line"),
            }
        }

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DebateResult, TerminationReason, Transcript};
    use std::collections::BTreeMap;

    fn outcome(id: &str) -> DebateOutcome {
        DebateOutcome {
            result: DebateResult {
                question_id: id.to_string(),
                answer: Some("true".to_string()),
                agent_answers: Vec::new(),
                votes: BTreeMap::new(),
                rounds_run: 1,
                reason: TerminationReason::Converged,
                abort_cause: None,
                inconclusive: false,
                partial_failure: false,
                judged: false,
            },
            transcript: Transcript::new(0),
        }
    }

    #[test]
    fn test_record_and_read_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.jsonl");

        let mut sink = JsonlSink::open(&path, false).unwrap();
        sink.record(&outcome("q1")).unwrap();
        sink.record(&outcome("q2")).unwrap();

        let ids = sink.existing_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("q1"));

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");

        JsonlSink::open(&path, false).unwrap().record(&outcome("q1")).unwrap();
        let sink = JsonlSink::open(&path, false).unwrap();
        assert!(sink.existing_ids().unwrap().contains("q1"));
    }

    #[test]
    fn test_overwrite_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");

        JsonlSink::open(&path, false).unwrap().record(&outcome("q1")).unwrap();
        let sink = JsonlSink::open(&path, true).unwrap();
        assert!(sink.existing_ids().unwrap().is_empty());
    }

    #[test]
    fn test_garbage_lines_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        fs::write(&path, "garbage\n").unwrap();

        let mut sink = JsonlSink::open(&path, false).unwrap();
        sink.record(&outcome("q9")).unwrap();
        let ids = sink.existing_ids().unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("q9"));
    }
}
