//! Typed failures raised by external build systems.

use thiserror::Error;

/// Failure raised by an external system while resolving a project or
/// executing tasks. Propagated unchanged from the system implementation
/// to whoever requested the operation.
#[derive(Debug, Error)]
pub enum SystemError {
    /// A registered task failed to execute.
    #[error("system '{system}' failed to execute tasks [{}]: {reason}", .tasks.join(","))]
    TaskExecution {
        system: String,
        tasks: Vec<String>,
        reason: String,
    },

    /// The underlying build or rebuild operation failed.
    #[error("system '{system}' {operation} operation failed for module '{module}': {reason}")]
    Operation {
        system: String,
        operation: String,
        module: String,
        reason: String,
    },

    /// The project could not be resolved into a module model.
    #[error("system '{system}' could not resolve project at {path}: {reason}")]
    Resolve {
        system: String,
        path: String,
        reason: String,
    },

    /// A trigger references a task the system does not define.
    #[error("no task named '{task}' is defined for system '{system}'")]
    UnknownTask { system: String, task: String },
}
