//! Question datasets in JSON lines format

use std::fs;
use std::path::Path;

use crate::core::{DebateError, Question, Result};

/// Read one `Question` per non-empty line
pub fn load_questions(path: &Path) -> Result<Vec<Question>> {
    let content = fs::read_to_string(path)?;
    parse_questions(&content).map_err(|e| match e {
        DebateError::Other(msg) => DebateError::Other(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Parse JSON lines; blank lines are skipped
pub fn parse_questions(content: &str) -> Result<Vec<Question>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<Question>(line)
                .map_err(|e| DebateError::Other(format!("line {}: {}", n + 1, e)))
        })
        .collect()
}
