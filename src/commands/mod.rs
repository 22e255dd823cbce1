//! The command table.
//!
//! Every operation is a [`Command`] registered once in [`Registry::new`].
//! A command is found by any of its aliases; the first alias is its canonical
//! name. Commands parse their own trailing arguments with clap.
pub mod backup;
pub mod configs;
pub mod due;
pub mod help;
pub mod info;
pub mod manifest;
pub mod restore;
pub mod settings;
pub mod version;

use anyhow::Result;
use clap::Parser;

use crate::cli::GlobalOpts;
use crate::context::ExecutionContext;
use crate::error::{EmbalmError, full_stop};
use crate::exec::Executor;
use crate::logging::Logger;

/// Command run when none is named.
pub const DEFAULT_COMMAND: &str = "incremental";

/// Width of the alias column in summaries.
const SUMMARY_WIDTH: usize = 16;
/// Indentation of summary lines.
const SUMMARY_INDENT: &str = "    ";

/// A named operation.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Every name the command answers to; the first is canonical.
    fn names(&self) -> &'static [&'static str];

    /// One-line description.
    fn description(&self) -> &'static str;

    /// Usage text shown by `embalm help <command>`.
    fn usage(&self) -> &'static str;

    /// Whether the command must hold the working-directory lock.
    fn requires_exclusivity(&self) -> bool;

    /// Whether the command needs the settings (and so an execution context).
    fn requires_settings(&self) -> bool {
        true
    }

    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    fn run(&self, inv: &Invocation<'_>) -> Result<()>;

    /// Canonical name.
    fn name(&self) -> &'static str {
        self.names().first().copied().unwrap_or_default()
    }

    /// Full help text: description as a title, then the usage.
    fn help(&self) -> String {
        format!("{}\n\n{}", full_stop(self.description()), self.usage())
    }
}

/// Everything a command gets to work with.
#[derive(Debug)]
pub struct Invocation<'a> {
    /// Canonical name of the command being run.
    pub name: &'static str,
    /// Arguments following the command name.
    pub args: &'a [String],
    /// Global command-line options.
    pub options: &'a GlobalOpts,
    /// The command table (used by `help`).
    pub registry: &'a Registry,
    /// Execution context; present for commands that require settings.
    pub context: Option<&'a ExecutionContext>,
    /// Process runner.
    pub executor: &'a dyn Executor,
    /// Console output.
    pub log: &'a Logger,
}

impl Invocation<'_> {
    /// The execution context.
    ///
    /// # Errors
    ///
    /// Fails if the command was run without settings.
    pub fn context(&self) -> Result<&ExecutionContext> {
        self.context
            .ok_or_else(|| anyhow::anyhow!("{}: command run without settings", self.name))
    }

    /// Parse the trailing arguments into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EmbalmError::Usage`] if the arguments do not match.
    pub fn parse_args<T: Parser>(&self) -> Result<T, EmbalmError> {
        let argv = std::iter::once(self.name.to_string()).chain(self.args.iter().cloned());
        T::try_parse_from(argv).map_err(|e| {
            let rendered = e.render().to_string();
            let message = rendered.trim().trim_start_matches("error: ");
            EmbalmError::Usage(format!("{}: {message}", self.name))
        })
    }

    /// Reject trailing arguments, for commands that take none.
    ///
    /// # Errors
    ///
    /// Returns [`EmbalmError::Usage`] naming the first extra argument.
    pub fn no_args(&self) -> Result<(), EmbalmError> {
        match self.args.first() {
            Some(extra) => Err(EmbalmError::Usage(format!(
                "{}: unexpected argument '{extra}'",
                self.name
            ))),
            None => Ok(()),
        }
    }
}

/// The static table of commands.
#[derive(Debug)]
pub struct Registry {
    commands: Vec<Box<dyn Command>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Build the command table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: vec![
                Box::new(backup::Backup::full()),
                Box::new(backup::Backup::incremental()),
                Box::new(configs::Configs),
                Box::new(due::Due),
                Box::new(help::Help),
                Box::new(info::Info),
                Box::new(manifest::Manifest),
                Box::new(restore::Restore),
                Box::new(settings::ShowSettings),
                Box::new(version::Version),
            ],
        }
    }

    /// Find the command answering to `name`; empty or absent means the default command.
    ///
    /// Returns the command and its canonical name.
    ///
    /// # Errors
    ///
    /// Returns [`EmbalmError::UnknownCommand`] if no command has that alias.
    pub fn find(&self, name: Option<&str>) -> Result<(&dyn Command, &'static str), EmbalmError> {
        let name = name.filter(|n| !n.is_empty()).unwrap_or(DEFAULT_COMMAND);
        self.commands
            .iter()
            .find(|c| c.names().contains(&name))
            .map(|c| (c.as_ref(), c.name()))
            .ok_or_else(|| EmbalmError::UnknownCommand(name.to_string()))
    }

    /// Run the command named by `inv.name`.
    ///
    /// # Errors
    ///
    /// Returns the command's own error, or [`EmbalmError::UnknownCommand`].
    pub fn execute(&self, inv: &Invocation<'_>) -> Result<()> {
        let (command, name) = self.find(Some(inv.name))?;
        inv.log.narrate(&format!("{name}:"));
        command.run(inv)
    }

    /// Every command, sorted by canonical name.
    #[must_use]
    pub fn commands_sorted(&self) -> Vec<&dyn Command> {
        let mut commands: Vec<&dyn Command> = self.commands.iter().map(Box::as_ref).collect();
        commands.sort_by_key(|c| c.name());
        commands
    }

    /// One line per command: aliases, then the description.
    #[must_use]
    pub fn summarize(&self) -> String {
        self.commands_sorted()
            .iter()
            .map(|c| two_columns(&c.names().join(", "), c.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Format a summary line; a left column too wide for its slot pushes the
/// description onto the next line.
#[must_use]
pub fn two_columns(left: &str, right: &str) -> String {
    if left.chars().count() < SUMMARY_WIDTH {
        format!("{SUMMARY_INDENT}{left:<SUMMARY_WIDTH$} {right}")
    } else {
        format!("{SUMMARY_INDENT}{left}\n{SUMMARY_INDENT}{:<SUMMARY_WIDTH$} {right}", "")
    }
}

/// Fixture shared by the command unit tests.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use std::path::{Path, PathBuf};
    use std::sync::{MutexGuard, PoisonError};

    use super::{Command, Invocation, Registry};
    use crate::cli::GlobalOpts;
    use crate::config::{ConfigTree, Identity, Mapping, Settings, Value};
    use crate::context::{CWD_MUTEX, ExecutionContext};
    use crate::exec::Executor;
    use crate::logging::{LogSink, Logger};

    /// A temporary working directory plus settings pointing at it.
    ///
    /// Holds the working-directory mutex for its whole life.
    pub struct Fixture {
        pub tmp: tempfile::TempDir,
        pub options: GlobalOpts,
        values: Mapping,
        _cwd: MutexGuard<'static, ()>,
    }

    impl Fixture {
        /// Settings for configuration `home` on host `earth`, overridden by `extra`.
        pub fn new(extra: &[(&str, Value)]) -> Self {
            let cwd = CWD_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
            let tmp = tempfile::tempdir().unwrap();
            let mut values = Mapping::new();
            for (k, v) in [
                ("config_name", Value::from("home")),
                (
                    "working_dir",
                    Value::from(tmp.path().join("state").display().to_string()),
                ),
                ("src_dir", Value::from("/home/{user_name}")),
                ("dest_server", Value::from("backups.example.com")),
                ("dest_dir", Value::from("{host_name}")),
                ("ssh_backend_method", Value::from("option")),
                ("gpg_passphrase", Value::from("secret")),
            ] {
                values.insert(k.into(), v);
            }
            for (k, v) in extra {
                values.insert((*k).to_string(), v.clone());
            }
            Self {
                tmp,
                options: GlobalOpts::default(),
                values,
                _cwd: cwd,
            }
        }

        pub fn set(&mut self, key: &str, value: Value) {
            self.values.insert(key.to_string(), value);
        }

        pub fn working_dir(&self) -> PathBuf {
            self.tmp.path().join("state")
        }

        pub fn root(&self) -> &Path {
            self.tmp.path()
        }

        pub fn settings(&self) -> Settings {
            let tree = ConfigTree {
                config_name: "home".into(),
                settings: self.values.clone(),
                root_file: PathBuf::from("/cfg/settings.toml"),
                sources: Vec::new(),
            };
            Settings::new(tree, Identity::new("earth", "ken"))
        }

        /// Run `command` inside a fresh execution context; returns its output.
        pub fn run_with_output(
            &self,
            command: &dyn Command,
            args: &[String],
            executor: &dyn Executor,
        ) -> (anyhow::Result<()>, String) {
            let (log, captured) = Logger::capturing();
            let registry = Registry::new();
            let ctx = ExecutionContext::enter(
                self.settings(),
                command.requires_exclusivity(),
                &LogSink::new(),
            )
            .unwrap();
            let inv = Invocation {
                name: command.name(),
                args,
                options: &self.options,
                registry: &registry,
                context: Some(&ctx),
                executor,
                log: &log,
            };
            let result = command.run(&inv);
            drop(ctx);
            (result, captured.contents())
        }

        pub fn run(
            &self,
            command: &dyn Command,
            args: &[String],
            executor: &dyn Executor,
        ) -> anyhow::Result<()> {
            self.run_with_output(command, args, executor).0
        }
    }

    /// Run a command that needs no settings; returns its output.
    pub fn run_bare(command: &dyn Command, args: &[&str]) -> (anyhow::Result<()>, String) {
        let (log, captured) = Logger::capturing();
        let registry = Registry::new();
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        let options = GlobalOpts::default();
        let executor = crate::exec::test_helpers::RecordingExecutor::default();
        let inv = Invocation {
            name: command.name(),
            args: &args,
            options: &options,
            registry: &registry,
            context: None,
            executor: &executor,
            log: &log,
        };
        let result = command.run(&inv);
        (result, captured.contents())
    }
}
