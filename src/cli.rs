//! Command-line parsing.
//!
//! Only the global flags are declared here. The command is a free-form
//! positional word looked up in the [`Registry`](crate::commands::Registry)
//! (so aliases and abbreviations work), and everything after it is handed to
//! the command, which parses its own options.
use clap::Parser;

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "embalm",
    about = "Configuration-driven front end for Duplicity backups",
    disable_version_flag = true
)]
pub struct Cli {
    /// Options shared across all commands.
    #[command(flatten)]
    pub global: GlobalOpts,

    /// Command to run (default: incremental)
    pub command: Option<String>,

    /// Arguments passed to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Options shared across all commands.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOpts {
    /// Configuration to use
    #[arg(short, long = "config", value_name = "NAME")]
    pub config: Option<String>,

    /// Make Duplicity more talkative
    #[arg(short, long)]
    pub verbose: bool,

    /// Narrate the steps being taken
    #[arg(short, long)]
    pub narrate: bool,

    /// Go through the motions without changing anything
    #[arg(short, long)]
    pub trial_run: bool,
}
