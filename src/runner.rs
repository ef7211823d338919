//! Build/rebuild execution bracketed by trigger phases.
//!
//! A request runs on its own worker thread: the before-phase tasks, then
//! the underlying operation, then the after-phase tasks on success. The
//! caller gets a `BuildTicket` back immediately and may block on it;
//! completion is signaled exactly once.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::activator::{Phase, TaskActivationEntry, TaskActivator};
use crate::error::SystemError;
use crate::log::{ExecutionLog, LogEvent};
use crate::system::{ExternalSystem, Module, Operation, RequestId};

/// Terminal state of one build request.
#[derive(Debug)]
pub enum BuildOutcome {
    /// The operation and all bracketing tasks completed.
    Succeeded,
    /// A before task, the operation, or an after task failed.
    Failed { error: SystemError },
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Succeeded)
    }
}

/// Single-permit completion handle for one request.
///
/// The worker sends exactly one outcome; `wait` blocks until it arrives.
pub struct BuildTicket {
    id: RequestId,
    rx: mpsc::Receiver<BuildOutcome>,
}

impl BuildTicket {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Block until the worker signals completion.
    pub fn wait(self) -> Result<BuildOutcome> {
        self.rx
            .recv()
            .context("build worker exited without reporting an outcome")
    }
}

/// Project-scoped runner owning the trigger registry for its lifetime and
/// driving an injected external system.
pub struct ProjectTaskRunner {
    system: ExternalSystem,
    activator: Arc<Mutex<TaskActivator>>,
    execution_log: Option<Arc<ExecutionLog>>,
}

impl ProjectTaskRunner {
    pub fn new(system: ExternalSystem, activator: TaskActivator) -> Self {
        Self {
            system,
            activator: Arc::new(Mutex::new(activator)),
            execution_log: None,
        }
    }

    pub fn with_execution_log(mut self, log: Arc<ExecutionLog>) -> Self {
        self.execution_log = Some(log);
        self
    }

    /// Register a trigger on the owned registry.
    pub fn add_task(&self, entry: TaskActivationEntry) {
        self.activator.lock().unwrap().add_task(entry);
    }

    /// Task names that would fire for `phase` under `project_path`, in
    /// registration order.
    pub fn get_tasks(&self, phase: Phase, project_path: &std::path::Path) -> Vec<String> {
        self.activator.lock().unwrap().get_tasks(phase, project_path)
    }

    /// Request a build of `module`. Returns immediately; the ticket
    /// resolves when the request finishes.
    pub fn build(&self, module: &Module) -> BuildTicket {
        self.submit(Operation::Build, module)
    }

    /// Request a rebuild of `module`.
    pub fn rebuild(&self, module: &Module) -> BuildTicket {
        self.submit(Operation::Rebuild, module)
    }

    fn submit(&self, operation: Operation, module: &Module) -> BuildTicket {
        let id = RequestId::new();
        let (tx, rx) = mpsc::channel();

        let system = self.system.clone();
        let activator = Arc::clone(&self.activator);
        let log = self.execution_log.clone();
        let module = module.clone();

        info!(
            request = %id,
            operation = operation.label(),
            module = %module.name,
            "build request submitted"
        );
        record(
            log.as_deref(),
            LogEvent::BuildRequested {
                request: id.to_string(),
                operation: operation.label().to_string(),
                module: module.name.clone(),
            },
        );

        thread::spawn(move || {
            let outcome = run_request(&system, &activator, log.as_deref(), id, operation, &module);
            record(
                log.as_deref(),
                LogEvent::BuildFinished {
                    request: id.to_string(),
                    operation: operation.label().to_string(),
                    success: outcome.is_success(),
                },
            );
            if tx.send(outcome).is_err() {
                debug!(request = %id, "ticket dropped before completion");
            }
        });

        BuildTicket { id, rx }
    }
}

fn run_request(
    system: &ExternalSystem,
    activator: &Mutex<TaskActivator>,
    log: Option<&ExecutionLog>,
    id: RequestId,
    operation: Operation,
    module: &Module,
) -> BuildOutcome {
    let before = operation.before_phase();
    if let Err(error) = run_phase_tasks(system, activator, log, id, before, module) {
        warn!(
            request = %id,
            phase = %before,
            error = %error,
            "before tasks failed; aborting operation"
        );
        return BuildOutcome::Failed { error };
    }

    if let Err(error) = system.executor.run_operation(id, operation, module) {
        record(
            log,
            LogEvent::OperationFinished {
                request: id.to_string(),
                operation: operation.label().to_string(),
                success: false,
            },
        );
        return BuildOutcome::Failed { error };
    }
    record(
        log,
        LogEvent::OperationFinished {
            request: id.to_string(),
            operation: operation.label().to_string(),
            success: true,
        },
    );

    if let Err(error) = run_phase_tasks(system, activator, log, id, operation.after_phase(), module)
    {
        return BuildOutcome::Failed { error };
    }

    BuildOutcome::Succeeded
}

fn run_phase_tasks(
    system: &ExternalSystem,
    activator: &Mutex<TaskActivator>,
    log: Option<&ExecutionLog>,
    id: RequestId,
    phase: Phase,
    module: &Module,
) -> Result<(), SystemError> {
    let tasks = activator
        .lock()
        .unwrap()
        .get_tasks(phase, &module.project_path);
    if tasks.is_empty() {
        return Ok(());
    }

    debug!(request = %id, phase = %phase, tasks = ?tasks, "executing phase tasks");
    system
        .executor
        .execute_tasks(id, &tasks, &module.project_path)?;
    record(
        log,
        LogEvent::PhaseTasksExecuted {
            request: id.to_string(),
            phase: phase.label().to_string(),
            tasks,
        },
    );
    Ok(())
}

fn record(log: Option<&ExecutionLog>, event: LogEvent) {
    if let Some(log) = log {
        if let Err(error) = log.log(event) {
            warn!(error = %error, "failed to append execution log event");
        }
    }
}
