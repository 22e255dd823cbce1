//! The dispatch boundary.
//!
//! [`run`] turns a parsed command line into a finished command: it finds the
//! command, loads and validates the settings when the command needs them,
//! enters the execution context and runs the command inside it. Everything it
//! needs from the outside world (configuration location, process runner,
//! output) is passed in, so integration tests drive it directly.
use anyhow::Result;

use crate::cli::Cli;
use crate::commands::{Invocation, Registry};
use crate::config::validation;
use crate::config::{Environment, Loader, Settings};
use crate::context::ExecutionContext;
use crate::error::{EmbalmError, full_stop};
use crate::exec::Executor;
use crate::logging::{LogSink, Logger};
use crate::notify;

/// Text appended to `embalm --help`: the command summary and pointers to `help`.
#[must_use]
pub fn help_epilogue(registry: &Registry) -> String {
    format!(
        "Commands:\n{}\n\n\
         Use 'embalm help <command>' for information on a specific command.\n\
         Use 'embalm help' for a list of available help topics.",
        registry.summarize()
    )
}

/// Run the command named on the command line.
///
/// # Errors
///
/// Returns the first failure: an unknown command, a settings error (after
/// notifying), a busy lock, or the command's own error.
pub fn run(
    cli: &Cli,
    env: &Environment,
    executor: &dyn Executor,
    log: &Logger,
    sink: &LogSink,
) -> Result<()> {
    let registry = Registry::new();
    let (command, name) = registry.find(cli.command.as_deref())?;

    let context = if command.requires_settings() {
        let settings = load_settings(env, cli.global.config.as_deref(), executor)?;
        Some(ExecutionContext::enter(
            settings,
            command.requires_exclusivity(),
            sink,
        )?)
    } else {
        None
    };

    let inv = Invocation {
        name,
        args: &cli.args,
        options: &cli.global,
        registry: &registry,
        context: context.as_ref(),
        executor,
        log,
    };
    registry.execute(&inv)
}

/// Load and validate the settings for `explicit` (or the default
/// configuration).
///
/// Validation failures are also sent to the notification channels the
/// partial settings name.
///
/// # Errors
///
/// Returns any loading or validation error.
pub fn load_settings(
    env: &Environment,
    explicit: Option<&str>,
    executor: &dyn Executor,
) -> Result<Settings, EmbalmError> {
    let mut tree = Loader::new(&env.config_dir).load(explicit)?;
    tracing::debug!("config: {}", tree.config_name);
    for source in &tree.sources {
        tracing::debug!("read: {}", source.display());
    }

    if let Err(e) = validation::validate(&mut tree, env) {
        notify::report(
            &tree.settings,
            &env.identity,
            &full_stop(&e.to_string()),
            executor,
        );
        return Err(e.into());
    }
    for warning in validation::unknown_settings(&tree.settings) {
        tracing::debug!("{}: {}", warning.item, warning.message);
    }
    Ok(Settings::new(tree, env.identity.clone()))
}
