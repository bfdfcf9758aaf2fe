use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "strap",
    version,
    about = "Self-updating environment bootstrapper"
)]
pub struct StrapCli {
    /// Emit a machine-readable JSON envelope on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress human-readable output.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (repeatable).
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Enable trace-level logging.
    #[arg(long, global = true)]
    pub trace: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Project root (defaults to discovery from the working directory).
    #[arg(long, global = true, value_name = "DIR")]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CommandCli>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum CommandCli {
    /// Ensure the environment, install dependencies, and self-update (default).
    Bootstrap(BootstrapArgs),
    /// Report whether a source update is available without applying it.
    Check,
    /// Discard local changes and reset to the remote branch (destructive).
    ForceUpdate(ForceUpdateArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct BootstrapArgs {
    /// Skip the self-update step.
    #[arg(long)]
    pub no_update: bool,
}

#[derive(Args, Clone, Debug, Default)]
pub struct ForceUpdateArgs {
    /// Skip the interactive confirmation.
    #[arg(short = 'y', long)]
    pub yes: bool,
}
