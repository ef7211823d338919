//! External build system seam.
//!
//! The project-scoped runner drives a build system through a resolver /
//! task-executor pair injected at construction. Implementations know the
//! concrete system; the runner only sequences trigger phases around
//! operations.

pub mod shell;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::activator::Phase;
use crate::config::ProjectConfig;
use crate::error::SystemError;

/// Identifier of one build request, threaded through executor calls and
/// the execution log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The two operations trigger phases bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Build,
    Rebuild,
}

impl Operation {
    /// Phase that must complete before the operation starts.
    pub fn before_phase(self) -> Phase {
        match self {
            Operation::Build => Phase::BeforeCompile,
            Operation::Rebuild => Phase::BeforeRebuild,
        }
    }

    /// Phase that fires after the operation completes.
    pub fn after_phase(self) -> Phase {
        match self {
            Operation::Build => Phase::AfterCompile,
            Operation::Rebuild => Phase::AfterRebuild,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Operation::Build => "build",
            Operation::Rebuild => "rebuild",
        }
    }
}

/// A module of a resolved project. `project_path` is what trigger entries
/// match against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub project_path: std::path::PathBuf,
}

/// Resolved project: a name and its modules, in declaration order.
#[derive(Debug, Clone)]
pub struct ProjectModel {
    pub name: String,
    pub modules: Vec<Module>,
}

impl ProjectModel {
    pub fn find_module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// The module operations target when none is named. The first declared
    /// module wins.
    pub fn default_module(&self) -> Option<&Module> {
        self.modules.first()
    }
}

/// Maps a project root to its model of modules.
pub trait ProjectResolver: Send + Sync {
    fn resolve(&self, project_root: &Path) -> Result<ProjectModel, SystemError>;
}

/// Executes named tasks and the bracketed operations for one system.
pub trait TaskExecutor: Send + Sync {
    /// Execute `task_names` in order under `project_path`.
    fn execute_tasks(
        &self,
        id: RequestId,
        task_names: &[String],
        project_path: &Path,
    ) -> Result<(), SystemError>;

    /// Run the underlying build or rebuild operation for `module`.
    fn run_operation(
        &self,
        id: RequestId,
        operation: Operation,
        module: &Module,
    ) -> Result<(), SystemError>;
}

/// A build system bundle: identity plus its resolver/executor pair.
///
/// Systems are handed to the runner explicitly; there is no global
/// registry to look implementations up from.
#[derive(Clone)]
pub struct ExternalSystem {
    pub id: String,
    pub resolver: Arc<dyn ProjectResolver>,
    pub executor: Arc<dyn TaskExecutor>,
}

impl ExternalSystem {
    pub fn new(
        id: impl Into<String>,
        resolver: Arc<dyn ProjectResolver>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self {
            id: id.into(),
            resolver,
            executor,
        }
    }
}

/// Look up a system implementation by name.
///
/// Returns `None` if the system name is not recognized. New systems are
/// registered here as they're implemented.
pub fn system_from_name(name: &str, config: &ProjectConfig) -> Option<ExternalSystem> {
    match name {
        "shell" => Some(shell::shell_system(config)),
        _ => None,
    }
}
