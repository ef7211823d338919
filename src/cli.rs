use clap::{Parser, Subcommand, ValueEnum};

use crate::activator::Phase;

#[derive(Parser, Debug)]
#[command(
    name = "stagehand",
    about = "Phase-ordered task triggers around external build operations",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage task triggers
    Trigger {
        #[command(subcommand)]
        action: TriggerAction,
    },

    /// Print the tasks that would fire for a phase, in registration order
    Tasks {
        /// Phase to inspect
        phase: PhaseArg,

        /// Module whose project path to match (defaults to the root module)
        #[arg(long)]
        module: Option<String>,
    },

    /// Run the build operation with its before/after triggers
    Build {
        /// Module to build (defaults to the root module)
        module: Option<String>,
    },

    /// Run the rebuild operation with its before/after triggers
    Rebuild {
        /// Module to rebuild (defaults to the root module)
        module: Option<String>,
    },

    /// Show project configuration
    Config {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
pub enum TriggerAction {
    /// Register a task trigger
    Add {
        /// Task name to run
        task: String,

        /// Phase the task fires in
        #[arg(long)]
        phase: PhaseArg,

        /// Module whose builds the trigger brackets (defaults to the root module)
        #[arg(long)]
        module: Option<String>,
    },

    /// Remove the first matching trigger registration
    Remove {
        /// Task name of the registration
        task: String,

        /// Phase of the registration
        #[arg(long)]
        phase: PhaseArg,

        /// Module of the registration (defaults to the root module)
        #[arg(long)]
        module: Option<String>,
    },

    /// List registered triggers in registration order
    List {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

/// CLI-facing phase names (`before-compile`, `after-compile`, ...).
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PhaseArg {
    BeforeCompile,
    AfterCompile,
    BeforeRebuild,
    AfterRebuild,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::BeforeCompile => Phase::BeforeCompile,
            PhaseArg::AfterCompile => Phase::AfterCompile,
            PhaseArg::BeforeRebuild => Phase::BeforeRebuild,
            PhaseArg::AfterRebuild => Phase::AfterRebuild,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
