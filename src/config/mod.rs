use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.toml";
const CONFIG_DIR: &str = ".stagehand";

fn default_system() -> String {
    "shell".to_string()
}

/// `[project]` section: identity of the project and the build system that
/// executes its tasks.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProjectSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_system")]
    pub system: String,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: None,
            system: default_system(),
        }
    }
}

/// One `[[module]]` entry. `path` is relative to the project root; absent
/// means the root itself.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModuleConfig {
    pub name: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// `[build]` / `[rebuild]` sections: the command an operation runs.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct OperationConfig {
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleConfig>,
    /// Task-name → shell command table for the shell system.
    #[serde(default)]
    pub tasks: BTreeMap<String, String>,
    #[serde(default)]
    pub build: OperationConfig,
    #[serde(default)]
    pub rebuild: OperationConfig,
}

impl ProjectConfig {
    /// Search upward from `start` for a `.stagehand/config.toml` file and
    /// load it. Returns the default config if no file is found.
    pub fn load(start: &Path) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = Self::find_config_file(start) {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: ProjectConfig = toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok((config, Some(path)))
        } else {
            Ok((ProjectConfig::default(), None))
        }
    }

    fn find_config_file(start: &Path) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}

/// Project root owning a loaded config file (the parent of `.stagehand`).
pub fn project_root_of(config_path: &Path) -> Option<PathBuf> {
    Some(config_path.parent()?.parent()?.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn default_config_values() {
        let config = ProjectConfig::default();
        assert_eq!(config.project.system, "shell");
        assert!(config.project.name.is_none());
        assert!(config.modules.is_empty());
        assert!(config.tasks.is_empty());
        assert!(config.build.command.is_none());
        assert!(config.rebuild.command.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "demo"
system = "shell"

[[module]]
name = "core"
path = "core"

[[module]]
name = "cli"
path = "cli"

[tasks]
lint = "cargo clippy"
fmt = "cargo fmt --check"

[build]
command = "make"

[rebuild]
command = "make clean && make"
"#;
        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.project.name.as_deref(), Some("demo"));
        assert_eq!(config.project.system, "shell");
        assert_eq!(config.modules.len(), 2);
        assert_eq!(config.modules[0].name, "core");
        assert_eq!(config.modules[1].path, Some(PathBuf::from("cli")));
        assert_eq!(config.tasks.get("lint").unwrap(), "cargo clippy");
        assert_eq!(config.build.command.as_deref(), Some("make"));
        assert_eq!(config.rebuild.command.as_deref(), Some("make clean && make"));
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[tasks]
lint = "cargo clippy"
"#;
        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.project.system, "shell");
        assert_eq!(config.tasks.len(), 1);
        assert!(config.modules.is_empty());
        assert!(config.build.command.is_none());
    }

    #[test]
    fn load_from_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let state_dir = tmp.path().join(".stagehand");
        fs::create_dir_all(&state_dir).unwrap();
        fs::write(
            state_dir.join("config.toml"),
            r#"
[project]
name = "demo"

[build]
command = "make"
"#,
        )
        .unwrap();

        let (config, path) = ProjectConfig::load(tmp.path()).unwrap();
        assert!(path.is_some());
        assert_eq!(config.project.name.as_deref(), Some("demo"));
        assert_eq!(config.build.command.as_deref(), Some("make"));
    }

    #[test]
    fn load_returns_default_when_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let (config, path) = ProjectConfig::load(tmp.path()).unwrap();
        assert!(path.is_none());
        assert_eq!(config.project.system, "shell");
    }

    #[test]
    fn load_walks_up_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let state_dir = tmp.path().join(".stagehand");
        fs::create_dir_all(&state_dir).unwrap();
        fs::write(
            state_dir.join("config.toml"),
            r#"
[project]
name = "above"
"#,
        )
        .unwrap();

        let nested = tmp.path().join("src").join("deep").join("nested");
        fs::create_dir_all(&nested).unwrap();

        let (config, path) = ProjectConfig::load(&nested).unwrap();
        assert!(path.is_some());
        assert_eq!(config.project.name.as_deref(), Some("above"));
    }

    #[test]
    fn project_root_is_parent_of_state_dir() {
        let config_path = Path::new("/work/demo/.stagehand/config.toml");
        assert_eq!(
            project_root_of(config_path),
            Some(PathBuf::from("/work/demo"))
        );
    }
}
