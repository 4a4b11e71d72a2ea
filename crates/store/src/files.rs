//! Per-task file artifacts.
//!
//! A human-readable append-only markdown log and the final report are
//! written as side effects; they are not part of the state machine's
//! correctness, so callers log and continue on write failures.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use taskforge_core::error::Result;

/// Writes task logs and report artifacts under `<data_dir>/files/`.
#[derive(Debug, Clone)]
pub struct TaskFileSink {
    files_dir: PathBuf,
}

impl TaskFileSink {
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let files_dir = data_dir.as_ref().join("files");
        std::fs::create_dir_all(&files_dir)?;
        Ok(Self { files_dir })
    }

    pub fn log_path(&self, task_id: &str) -> PathBuf {
        self.files_dir.join(format!("{task_id}_log.md"))
    }

    pub fn report_path(&self, task_id: &str) -> PathBuf {
        self.files_dir.join(format!("{task_id}_report.md"))
    }

    /// Start a fresh log with the task header.
    pub fn init_log(&self, task_id: &str, goal: &str, mode: &str) -> Result<()> {
        let header = format!(
            "# Agent Task Log: {task_id}\n\n**Goal:** {goal}\n\n**Mode:** {mode}\n\n---\n\n"
        );
        std::fs::write(self.log_path(task_id), header)?;
        Ok(())
    }

    /// Append one entry to the task log.
    pub fn append_log(&self, task_id: &str, entry: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(task_id))?;
        file.write_all(entry.as_bytes())?;
        Ok(())
    }

    /// Write the report artifact with its header block.
    pub fn write_report(&self, task_id: &str, goal: &str, status: &str, body: &str) -> Result<()> {
        let mut status_label = status.to_string();
        if let Some(first) = status_label.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        let content = format!(
            "# Agent Final Report: {task_id}\n\n**Goal:** {goal}\n\n**Status:** {status_label}\n\n---\n\n{body}"
        );
        std::fs::write(self.report_path(task_id), content)?;
        Ok(())
    }
}
