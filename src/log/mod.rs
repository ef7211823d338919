//! Structured execution log — JSON lines per project.
//!
//! Every trigger registration and build request appends to a `.jsonl`
//! file under the project state directory. Each line is a self-contained
//! JSON object with a timestamp, making logs easy to grep, stream, and
//! post-process. The ordered `phase_tasks_executed` events are the
//! durable record of which tasks fired around an operation.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

/// Timestamp as ISO 8601 string.
fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A structured event in the execution log.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// ISO 8601 timestamp.
    pub timestamp: String,
    /// The event type and its data.
    #[serde(flatten)]
    pub event: LogEvent,
}

/// All event types that can appear in the execution log.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum LogEvent {
    /// A trigger was registered.
    TriggerAdded {
        system: String,
        phase: String,
        project_path: String,
        task: String,
    },
    /// A trigger registration was removed.
    TriggerRemoved {
        system: String,
        phase: String,
        project_path: String,
        task: String,
    },
    /// A build or rebuild was requested.
    BuildRequested {
        request: String,
        operation: String,
        module: String,
    },
    /// A phase's tasks were executed, in the listed order.
    PhaseTasksExecuted {
        request: String,
        phase: String,
        tasks: Vec<String>,
    },
    /// The underlying operation finished.
    OperationFinished {
        request: String,
        operation: String,
        success: bool,
    },
    /// The whole request finished.
    BuildFinished {
        request: String,
        operation: String,
        success: bool,
    },
}

/// Writer for JSON lines execution logs.
pub struct ExecutionLog {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl ExecutionLog {
    /// Create a new execution log, writing to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Appends to an existing file.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file: {}", path.display()))?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Log an event.
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let entry = LogEntry {
            timestamp: now_iso8601(),
            event,
        };

        let json = serde_json::to_string(&entry).context("failed to serialize log entry")?;

        debug!(event = %json, "execution log");

        let mut writer = self.writer.lock().unwrap();
        writeln!(writer, "{json}").context("failed to write log entry")?;
        writer.flush().context("failed to flush log")?;

        Ok(())
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
