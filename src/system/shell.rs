//! Shell-command build system.
//!
//! Task names map to commands through the project config `[tasks]` table;
//! build/rebuild operations run the configured `[build]`/`[rebuild]`
//! commands in the module's project path. An operation with no configured
//! command is a no-op, which makes the tool usable as a pure hook runner.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ModuleConfig, ProjectConfig};
use crate::error::SystemError;
use crate::system::{
    ExternalSystem, Module, Operation, ProjectModel, ProjectResolver, RequestId, TaskExecutor,
};

pub const SHELL_SYSTEM_ID: &str = "shell";

/// Build the shell system from a project config.
pub fn shell_system(config: &ProjectConfig) -> ExternalSystem {
    ExternalSystem::new(
        SHELL_SYSTEM_ID,
        Arc::new(ShellResolver::from_config(config)),
        Arc::new(ShellTaskExecutor::from_config(config)),
    )
}

/// Resolves a project root into modules declared in the config.
///
/// With no `[[module]]` entries, a single root module named after the
/// project directory is synthesized.
pub struct ShellResolver {
    name_override: Option<String>,
    modules: Vec<ModuleConfig>,
}

impl ShellResolver {
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            name_override: config.project.name.clone(),
            modules: config.modules.clone(),
        }
    }

    fn project_name(&self, project_root: &Path) -> String {
        if let Some(name) = &self.name_override {
            return name.clone();
        }
        project_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string())
    }
}

impl ProjectResolver for ShellResolver {
    fn resolve(&self, project_root: &Path) -> Result<ProjectModel, SystemError> {
        let name = self.project_name(project_root);

        if self.modules.is_empty() {
            return Ok(ProjectModel {
                modules: vec![Module {
                    name: name.clone(),
                    project_path: project_root.to_path_buf(),
                }],
                name,
            });
        }

        let mut modules = Vec::with_capacity(self.modules.len());
        for declared in &self.modules {
            let project_path = match &declared.path {
                Some(rel) => project_root.join(rel),
                None => project_root.to_path_buf(),
            };
            if !project_path.is_dir() {
                return Err(SystemError::Resolve {
                    system: SHELL_SYSTEM_ID.to_string(),
                    path: project_path.display().to_string(),
                    reason: format!("module '{}' path is not a directory", declared.name),
                });
            }
            modules.push(Module {
                name: declared.name.clone(),
                project_path,
            });
        }

        Ok(ProjectModel { name, modules })
    }
}

/// Runs tasks and operations as `sh -c` commands.
pub struct ShellTaskExecutor {
    tasks: BTreeMap<String, String>,
    build_command: Option<String>,
    rebuild_command: Option<String>,
}

impl ShellTaskExecutor {
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            tasks: config.tasks.clone(),
            build_command: config.build.command.clone(),
            rebuild_command: config.rebuild.command.clone(),
        }
    }
}

impl TaskExecutor for ShellTaskExecutor {
    fn execute_tasks(
        &self,
        id: RequestId,
        task_names: &[String],
        project_path: &Path,
    ) -> Result<(), SystemError> {
        for name in task_names {
            let command = self.tasks.get(name).ok_or_else(|| SystemError::UnknownTask {
                system: SHELL_SYSTEM_ID.to_string(),
                task: name.clone(),
            })?;

            info!(request = %id, task = %name, "running task");
            run_command(command, project_path).map_err(|reason| SystemError::TaskExecution {
                system: SHELL_SYSTEM_ID.to_string(),
                tasks: vec![name.clone()],
                reason,
            })?;
        }
        Ok(())
    }

    fn run_operation(
        &self,
        id: RequestId,
        operation: Operation,
        module: &Module,
    ) -> Result<(), SystemError> {
        let command = match operation {
            Operation::Build => self.build_command.as_deref(),
            Operation::Rebuild => self.rebuild_command.as_deref(),
        };

        let Some(command) = command else {
            debug!(
                request = %id,
                operation = operation.label(),
                "no operation command configured; skipping"
            );
            return Ok(());
        };

        info!(
            request = %id,
            operation = operation.label(),
            module = %module.name,
            "running operation"
        );
        run_command(command, &module.project_path).map_err(|reason| SystemError::Operation {
            system: SHELL_SYSTEM_ID.to_string(),
            operation: operation.label().to_string(),
            module: module.name.clone(),
            reason,
        })
    }
}

fn run_command(command: &str, cwd: &Path) -> Result<(), String> {
    debug!(command = %command, cwd = %cwd.display(), "spawning shell command");
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .status()
        .map_err(|e| e.to_string())?;

    if status.success() {
        Ok(())
    } else {
        Err(format!("exit status {status}"))
    }
}
