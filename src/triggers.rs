//! Persisted trigger registrations.
//!
//! `.stagehand/triggers.toml` holds the registry across invocations as an
//! array of `[[trigger]]` tables. File order is registration order; add
//! and remove rewrite the file with the survivors in place.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::activator::{TaskActivationEntry, TaskActivator};
use crate::paths;

#[derive(Debug, Default, Serialize, Deserialize)]
struct TriggerFile {
    #[serde(default, rename = "trigger")]
    triggers: Vec<TaskActivationEntry>,
}

/// Load the registry for a project. A missing store yields an empty
/// activator.
pub fn load(project_root: &Path) -> Result<TaskActivator> {
    let path = paths::trigger_store_path(project_root);
    if !path.is_file() {
        return Ok(TaskActivator::new());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read trigger store: {}", path.display()))?;
    let file: TriggerFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse trigger store: {}", path.display()))?;

    Ok(TaskActivator::from_entries(file.triggers))
}

/// Write the registry back, preserving registration order.
pub fn save(project_root: &Path, activator: &TaskActivator) -> Result<()> {
    let path = paths::trigger_store_path(project_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("failed to create state directory: {}", parent.display())
        })?;
    }

    let file = TriggerFile {
        triggers: activator.entries().to_vec(),
    };
    let contents =
        toml::to_string_pretty(&file).context("failed to serialize trigger store")?;
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write trigger store: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activator::Phase;
    use std::path::PathBuf;

    fn entry(phase: Phase, task: &str) -> TaskActivationEntry {
        TaskActivationEntry {
            system_id: "shell".to_string(),
            phase,
            project_path: PathBuf::from("/project/path"),
            task_name: task.to_string(),
        }
    }

    #[test]
    fn missing_store_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let activator = load(tmp.path()).unwrap();
        assert!(activator.is_empty());
    }

    #[test]
    fn round_trip_preserves_order_and_duplicates() {
        let tmp = tempfile::tempdir().unwrap();

        let mut activator = TaskActivator::new();
        activator.add_task(entry(Phase::BeforeCompile, "lint"));
        activator.add_task(entry(Phase::AfterCompile, "package"));
        activator.add_task(entry(Phase::BeforeCompile, "lint"));

        save(tmp.path(), &activator).unwrap();
        let loaded = load(tmp.path()).unwrap();

        assert_eq!(loaded.entries(), activator.entries());
        assert_eq!(
            loaded.get_tasks(Phase::BeforeCompile, Path::new("/project/path")),
            vec!["lint", "lint"]
        );
    }

    #[test]
    fn save_creates_state_directory() {
        let tmp = tempfile::tempdir().unwrap();

        save(tmp.path(), &TaskActivator::new()).unwrap();
        assert!(paths::trigger_store_path(tmp.path()).is_file());
    }

    #[test]
    fn store_is_plain_toml_tables() {
        let tmp = tempfile::tempdir().unwrap();

        let mut activator = TaskActivator::new();
        activator.add_task(entry(Phase::BeforeRebuild, "clean-caches"));
        save(tmp.path(), &activator).unwrap();

        let contents =
            std::fs::read_to_string(paths::trigger_store_path(tmp.path())).unwrap();
        assert!(contents.contains("[[trigger]]"), "got:\n{contents}");
        assert!(contents.contains("phase = \"before-rebuild\""));
        assert!(contents.contains("task_name = \"clean-caches\""));
    }

    #[test]
    fn removal_then_save_keeps_survivors_in_order() {
        let tmp = tempfile::tempdir().unwrap();

        let mut activator = TaskActivator::new();
        activator.add_task(entry(Phase::BeforeCompile, "one"));
        activator.add_task(entry(Phase::BeforeCompile, "two"));
        activator.add_task(entry(Phase::BeforeCompile, "three"));
        save(tmp.path(), &activator).unwrap();

        let mut loaded = load(tmp.path()).unwrap();
        assert!(loaded.remove_task(&entry(Phase::BeforeCompile, "two")));
        save(tmp.path(), &loaded).unwrap();

        let reloaded = load(tmp.path()).unwrap();
        assert_eq!(
            reloaded.get_tasks(Phase::BeforeCompile, Path::new("/project/path")),
            vec!["one", "three"]
        );
    }
}
