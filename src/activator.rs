//! Ordered task-trigger registry.
//!
//! Each registration binds a named task of an external build system to a
//! phase of the build lifecycle and a project path. Within a phase the
//! execution order is the registration order; duplicate registrations are
//! kept and each one fires.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Point in the build lifecycle at which registered tasks fire.
///
/// `BeforeCompile`/`AfterCompile` bracket a build; `BeforeRebuild`/
/// `AfterRebuild` bracket a rebuild. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    BeforeCompile,
    AfterCompile,
    BeforeRebuild,
    AfterRebuild,
}

impl Phase {
    /// Stable kebab-case label, matching the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            Phase::BeforeCompile => "before-compile",
            Phase::AfterCompile => "after-compile",
            Phase::BeforeRebuild => "before-rebuild",
            Phase::AfterRebuild => "after-rebuild",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// One registered trigger: a task of an external system bound to a phase
/// and a project path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskActivationEntry {
    pub system_id: String,
    pub phase: Phase,
    pub project_path: PathBuf,
    pub task_name: String,
}

/// Ordered registry of task activation entries.
///
/// Entries are appended in registration order and never reordered.
#[derive(Debug, Default, Clone)]
pub struct TaskActivator {
    entries: Vec<TaskActivationEntry>,
}

impl TaskActivator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from already-ordered entries (e.g. a persisted
    /// trigger store).
    pub fn from_entries(entries: Vec<TaskActivationEntry>) -> Self {
        Self { entries }
    }

    /// Append a registration. Identical entries are not deduplicated; a
    /// task registered twice executes twice.
    pub fn add_task(&mut self, entry: TaskActivationEntry) {
        self.entries.push(entry);
    }

    /// Append several registrations, preserving argument order.
    pub fn add_tasks(&mut self, entries: impl IntoIterator<Item = TaskActivationEntry>) {
        self.entries.extend(entries);
    }

    /// Remove the first registration equal to `entry`. Returns whether a
    /// registration was removed.
    pub fn remove_task(&mut self, entry: &TaskActivationEntry) -> bool {
        match self.entries.iter().position(|e| e == entry) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Task names registered for `phase` under `project_path`, in
    /// registration order.
    pub fn get_tasks(&self, phase: Phase, project_path: &Path) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.phase == phase && e.project_path == project_path)
            .map(|e| e.task_name.clone())
            .collect()
    }

    /// Full ordered registry snapshot.
    pub fn entries(&self) -> &[TaskActivationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
