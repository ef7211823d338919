use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use stagehand::activator::{TaskActivationEntry, TaskActivator};
use stagehand::cli::{Cli, Command, TriggerAction};
use stagehand::config::{self, ProjectConfig};
use stagehand::log::{ExecutionLog, LogEvent};
use stagehand::runner::{BuildOutcome, ProjectTaskRunner};
use stagehand::system::{self, ExternalSystem, Module, Operation, ProjectModel};
use stagehand::{paths, shell_completion, triggers};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let is_config_command = matches!(&cli.command, Command::Config { .. });

    let filter = match cli.verbose {
        0 if is_config_command => "stagehand=warn",
        0 => "stagehand=info",
        1 => "stagehand=debug",
        _ => "stagehand=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cwd = std::env::current_dir().context("failed to get current directory (was it deleted?)")?;
    let (config, config_path) = ProjectConfig::load(&cwd)?;
    let project_root = config_path
        .as_deref()
        .and_then(config::project_root_of)
        .unwrap_or_else(|| cwd.clone());

    if !is_config_command || cli.verbose > 0 {
        match config_path {
            Some(ref p) => info!("loaded config from {}", p.display()),
            None => info!("no .stagehand/config.toml found, using defaults"),
        }
    }

    match cli.command {
        Command::Trigger { action } => handle_trigger(action, &config, &project_root)?,
        Command::Tasks { phase, module } => {
            let system = load_system(&config)?;
            let module = resolve_module(&system, &project_root, module.as_deref())?;
            let activator = triggers::load(&project_root)?;
            let tasks = activator.get_tasks(phase.into(), &module.project_path);
            if tasks.is_empty() {
                println!("(no tasks registered)");
            } else {
                for task in tasks {
                    println!("{task}");
                }
            }
        }
        Command::Build { module } => {
            run_operation(Operation::Build, &config, &project_root, module.as_deref())?;
        }
        Command::Rebuild { module } => {
            run_operation(Operation::Rebuild, &config, &project_root, module.as_deref())?;
        }
        Command::Config { json } => {
            if json {
                println!("{}", render_config_json(&config, config_path.as_deref())?);
            } else {
                print!("{}", render_config_human(&config, config_path.as_deref()));
            }
        }
        Command::Completions { shell } => shell_completion::print(shell)?,
    }

    Ok(())
}

fn load_system(config: &ProjectConfig) -> Result<ExternalSystem> {
    system::system_from_name(&config.project.system, config)
        .with_context(|| format!("unknown build system '{}'", config.project.system))
}

fn resolve_module(
    system: &ExternalSystem,
    project_root: &Path,
    name: Option<&str>,
) -> Result<Module> {
    let model = system.resolver.resolve(project_root)?;
    select_module(&model, name)
}

fn select_module(model: &ProjectModel, name: Option<&str>) -> Result<Module> {
    match name {
        Some(name) => model
            .find_module(name)
            .cloned()
            .with_context(|| format!("no module named '{}' in project '{}'", name, model.name)),
        None => model
            .default_module()
            .cloned()
            .with_context(|| format!("project '{}' has no modules", model.name)),
    }
}

fn handle_trigger(action: TriggerAction, config: &ProjectConfig, project_root: &Path) -> Result<()> {
    match action {
        TriggerAction::Add {
            task,
            phase,
            module,
        } => {
            let system = load_system(config)?;
            let module = resolve_module(&system, project_root, module.as_deref())?;
            let entry = TaskActivationEntry {
                system_id: system.id.clone(),
                phase: phase.into(),
                project_path: module.project_path.clone(),
                task_name: task,
            };

            let mut activator = triggers::load(project_root)?;
            activator.add_task(entry.clone());
            triggers::save(project_root, &activator)?;

            let log = ExecutionLog::new(&paths::execution_log_path(project_root))?;
            log.log(LogEvent::TriggerAdded {
                system: entry.system_id.clone(),
                phase: entry.phase.label().to_string(),
                project_path: entry.project_path.display().to_string(),
                task: entry.task_name.clone(),
            })?;

            println!(
                "[stagehand] registered {} at {} for module {}",
                entry.task_name, entry.phase, module.name
            );
        }
        TriggerAction::Remove {
            task,
            phase,
            module,
        } => {
            let system = load_system(config)?;
            let module = resolve_module(&system, project_root, module.as_deref())?;
            let entry = TaskActivationEntry {
                system_id: system.id.clone(),
                phase: phase.into(),
                project_path: module.project_path.clone(),
                task_name: task,
            };

            let mut activator = triggers::load(project_root)?;
            if !activator.remove_task(&entry) {
                anyhow::bail!(
                    "no trigger registered for task '{}' at {} on module {}",
                    entry.task_name,
                    entry.phase,
                    module.name
                );
            }
            triggers::save(project_root, &activator)?;

            let log = ExecutionLog::new(&paths::execution_log_path(project_root))?;
            log.log(LogEvent::TriggerRemoved {
                system: entry.system_id.clone(),
                phase: entry.phase.label().to_string(),
                project_path: entry.project_path.display().to_string(),
                task: entry.task_name.clone(),
            })?;

            println!(
                "[stagehand] removed {} at {} for module {}",
                entry.task_name, entry.phase, module.name
            );
        }
        TriggerAction::List { json } => {
            let activator = triggers::load(project_root)?;
            if json {
                println!("{}", render_triggers_json(&activator)?);
            } else {
                print!("{}", render_triggers_human(&activator));
            }
        }
    }

    Ok(())
}

fn run_operation(
    operation: Operation,
    config: &ProjectConfig,
    project_root: &Path,
    module_name: Option<&str>,
) -> Result<()> {
    let system = load_system(config)?;
    let module = resolve_module(&system, project_root, module_name)?;
    let activator = triggers::load(project_root)?;

    let execution_log = Arc::new(ExecutionLog::new(&paths::execution_log_path(project_root))?);
    debug!(log = %execution_log.path().display(), "execution log ready");

    let runner = ProjectTaskRunner::new(system, activator).with_execution_log(execution_log);
    let ticket = match operation {
        Operation::Build => runner.build(&module),
        Operation::Rebuild => runner.rebuild(&module),
    };

    match ticket.wait()? {
        BuildOutcome::Succeeded => {
            println!(
                "[stagehand] {} finished for module {}",
                operation.label(),
                module.name
            );
            Ok(())
        }
        BuildOutcome::Failed { error } => {
            anyhow::bail!("{} failed: {error}", operation.label())
        }
    }
}

fn push_kv(output: &mut String, key: &str, value: impl std::fmt::Display) {
    output.push_str(&format!("  {key:<16} {value}\n"));
}

fn config_source_label(config_path: Option<&Path>) -> String {
    config_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults — no .stagehand/config.toml found)".to_string())
}

fn render_config_human(config: &ProjectConfig, config_path: Option<&Path>) -> String {
    let mut output = String::new();

    output.push_str("Project\n");
    push_kv(
        &mut output,
        "name",
        config.project.name.as_deref().unwrap_or("(directory name)"),
    );
    push_kv(&mut output, "system", &config.project.system);
    output.push('\n');

    output.push_str("Modules\n");
    if config.modules.is_empty() {
        push_kv(&mut output, "entries", "(root module only)");
    } else {
        for module in &config.modules {
            let path = module
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ".".to_string());
            output.push_str(&format!("  - {} ({path})\n", module.name));
        }
    }
    output.push('\n');

    output.push_str("Tasks\n");
    if config.tasks.is_empty() {
        push_kv(&mut output, "entries", "(none)");
    } else {
        for (name, command) in &config.tasks {
            output.push_str(&format!("  - {name} => {command}\n"));
        }
    }
    output.push('\n');

    output.push_str("Operations\n");
    push_kv(
        &mut output,
        "build",
        config.build.command.as_deref().unwrap_or("(none)"),
    );
    push_kv(
        &mut output,
        "rebuild",
        config.rebuild.command.as_deref().unwrap_or("(none)"),
    );
    output.push('\n');

    output.push_str("Source Path\n");
    push_kv(&mut output, "path", config_source_label(config_path));

    output
}

fn render_config_json(config: &ProjectConfig, config_path: Option<&Path>) -> Result<String> {
    let modules: Vec<_> = config
        .modules
        .iter()
        .map(|m| {
            serde_json::json!({
                "name": m.name,
                "path": m.path.as_ref().map(|p| p.display().to_string()),
            })
        })
        .collect();

    let payload = serde_json::json!({
        "project": {
            "name": config.project.name.clone(),
            "system": &config.project.system
        },
        "modules": modules,
        "tasks": &config.tasks,
        "build": { "command": config.build.command.clone() },
        "rebuild": { "command": config.rebuild.command.clone() },
        "source_path": config_source_label(config_path)
    });

    serde_json::to_string_pretty(&payload).context("failed to serialize config to JSON")
}

fn render_triggers_human(activator: &TaskActivator) -> String {
    if activator.is_empty() {
        return "(no triggers registered)\n".to_string();
    }

    let mut output = String::new();
    for (idx, entry) in activator.entries().iter().enumerate() {
        output.push_str(&format!(
            "  {:>3}  {:<16} {:<24} {}\n",
            idx + 1,
            entry.phase,
            entry.task_name,
            entry.project_path.display()
        ));
    }
    output
}

fn render_triggers_json(activator: &TaskActivator) -> Result<String> {
    let entries: Vec<_> = activator
        .entries()
        .iter()
        .map(|entry| {
            serde_json::json!({
                "system": entry.system_id,
                "phase": entry.phase.label(),
                "project_path": entry.project_path.display().to_string(),
                "task": entry.task_name,
            })
        })
        .collect();

    serde_json::to_string_pretty(&entries).context("failed to serialize triggers to JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand::activator::Phase;
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
    fn select_module_defaults_to_first() {
        let model = ProjectModel {
            name: "demo".to_string(),
            modules: vec![
                Module {
                    name: "core".to_string(),
                    project_path: PathBuf::from("/demo/core"),
                },
                Module {
                    name: "cli".to_string(),
                    project_path: PathBuf::from("/demo/cli"),
                },
            ],
        };

        assert_eq!(select_module(&model, None).unwrap().name, "core");
        assert_eq!(select_module(&model, Some("cli")).unwrap().name, "cli");
        assert!(select_module(&model, Some("missing")).is_err());
    }

    #[test]
    fn render_triggers_human_lists_registration_order() {
        let mut activator = TaskActivator::new();
        activator.add_task(entry(Phase::BeforeCompile, "lint"));
        activator.add_task(entry(Phase::AfterCompile, "package"));

        let rendered = render_triggers_human(&activator);
        let lint = rendered.find("lint").unwrap();
        let package = rendered.find("package").unwrap();
        assert!(lint < package, "expected registration order:\n{rendered}");
        assert!(rendered.contains("before-compile"));
        assert!(rendered.contains("/project/path"));
    }

    #[test]
    fn render_triggers_human_handles_empty_registry() {
        let rendered = render_triggers_human(&TaskActivator::new());
        assert_eq!(rendered, "(no triggers registered)\n");
    }

    #[test]
    fn render_triggers_json_is_valid_and_ordered() {
        let mut activator = TaskActivator::new();
        activator.add_task(entry(Phase::BeforeRebuild, "clean-caches"));
        activator.add_task(entry(Phase::AfterRebuild, "warm-caches"));

        let json = render_triggers_json(&activator).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["task"], "clean-caches");
        assert_eq!(entries[0]["phase"], "before-rebuild");
        assert_eq!(entries[1]["task"], "warm-caches");
    }

    #[test]
    fn render_config_human_groups_sections() {
        let config = ProjectConfig::default();
        let rendered = render_config_human(&config, None);

        assert!(rendered.contains("Project"));
        assert!(rendered.contains("Modules"));
        assert!(rendered.contains("Tasks"));
        assert!(rendered.contains("Operations"));
        assert!(rendered.contains("Source Path"));
        assert!(rendered.contains("(defaults — no .stagehand/config.toml found)"));
    }

    #[test]
    fn render_config_json_is_valid_and_contains_expected_fields() {
        let config = ProjectConfig::default();
        let json = render_config_json(&config, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["project"]["system"], "shell");
        assert!(value["modules"].is_array());
        assert_eq!(
            value["source_path"],
            "(defaults — no .stagehand/config.toml found)"
        );
    }
}
