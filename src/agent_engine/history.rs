use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::agent_engine::state::{Action, StepReport};
use crate::errors::AgentResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: i64,
    pub step: u32,
    pub role: String,
    pub content: Option<String>,
    pub action: Option<Action>,
}

/// Append-only JSONL transcript of one session.
pub struct SessionHistory {
    pub session_id: String,
    entries: Vec<HistoryEntry>,
    file_path: PathBuf,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::in_dir(&default_history_dir())
    }

    /// Transcript under `dir`, which is created when missing.
    pub fn in_dir(dir: &Path) -> Self {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::warn!(error = %e, path = %dir.display(), "cannot create history directory");
        }
        let session_id = uuid::Uuid::new_v4().to_string();
        let file_path = dir.join(format!("session_{session_id}.jsonl"));
        Self {
            session_id,
            entries: Vec::new(),
            file_path,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn record_task(&mut self, task: &str) {
        self.push(HistoryEntry {
            ts: chrono::Utc::now().timestamp_millis(),
            step: 0,
            role: "user".into(),
            content: Some(task.to_string()),
            action: None,
        });
    }

    pub fn record_step(&mut self, report: &StepReport) {
        self.push(HistoryEntry {
            ts: chrono::Utc::now().timestamp_millis(),
            step: report.step,
            role: "assistant".into(),
            content: Some(report.message.clone()),
            action: report.action.clone(),
        });
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, path = %self.file_path.display(), "history flush failed");
        }
    }

    /// Append the latest entry to the JSONL file.
    pub fn flush(&self) -> AgentResult<()> {
        if let Some(last) = self.entries.last() {
            let line = serde_json::to_string(last)?;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file_path)?;
            writeln!(file, "{}", line)?;
            tracing::debug!(
                path = %self.file_path.display(),
                "history entry flushed"
            );
        }
        Ok(())
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// `<data_local_dir>/phone-agent/sessions`, falling back to the working directory.
pub fn default_history_dir() -> PathBuf {
    if let Some(base) = dirs::data_local_dir() {
        let d = base.join("phone-agent").join("sessions");
        if std::fs::create_dir_all(&d).is_ok() {
            return d;
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
