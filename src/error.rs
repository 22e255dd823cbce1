//! Domain-specific error types for embalm.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`EmbalmError`]) while command handlers convert them to [`anyhow::Error`]
//! via the standard `?` operator. The dispatch boundary in `main` walks the
//! chain back to the typed error to pick an exit status.
//!
//! # Error hierarchy
//!
//! ```text
//! EmbalmError
//! ├── Config(ConfigError)    : missing, invalid or unresolvable settings
//! ├── NoConfiguration        : nothing to choose from in the root settings
//! ├── UnknownConfiguration   : bad --config value
//! ├── UnknownCommand         : bad command name
//! ├── UnknownTopic           : bad help topic
//! ├── Busy                   : lock file already present
//! ├── Io                     : filesystem failure, wrapped with its path
//! ├── Usage                  : bad command arguments
//! ├── ToolMissing            : external program not installed
//! ├── Tool                   : external program failed
//! └── Interrupted            : user pressed Ctrl-C
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Exit status codes, following the BSD `sysexits` convention.
pub mod exit_code {
    /// Successful termination.
    pub const OK: i32 = 0;
    /// Generic failure.
    pub const FAILURE: i32 = 1;
    /// The command was used incorrectly (bad command, option or configuration name).
    pub const USAGE: i32 = 64;
    /// A service is unavailable (required external program missing).
    pub const UNAVAILABLE: i32 = 69;
    /// An external program failed.
    pub const SOFTWARE: i32 = 70;
    /// An error occurred while doing I/O on some file.
    pub const IOERR: i32 = 74;
    /// Temporary failure; the user is invited to retry later.
    pub const TEMPFAIL: i32 = 75;
    /// Something was found in an unconfigured or misconfigured state.
    pub const CONFIG: i32 = 78;
}

/// Top-level error type for embalm.
#[derive(Error, Debug)]
pub enum EmbalmError {
    /// Missing, invalid or unresolvable settings.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The root settings file declares no usable configuration.
    #[error("{}: no known configurations", .path.display())]
    NoConfiguration {
        /// Root settings file.
        path: PathBuf,
    },

    /// The requested configuration is not listed in `configuration_files`.
    #[error("{name}: unknown configuration (see configuration_files in {})", .path.display())]
    UnknownConfiguration {
        /// The configuration name that was asked for.
        name: String,
        /// Root settings file.
        path: PathBuf,
    },

    /// No command has the given name as one of its aliases.
    #[error("{0}: unknown command")]
    UnknownCommand(String),

    /// Neither a command nor a help topic has the given name.
    #[error("{0}: topic not found")]
    UnknownTopic(String),

    /// Another invocation holds the lock on the working directory.
    #[error("currently running (see {} for details)", .lockfile.display())]
    Busy {
        /// Path of the existing lock file.
        lockfile: PathBuf,
    },

    /// A filesystem operation failed.
    #[error("{}: {source}", .path.display())]
    Io {
        /// Path of the file or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Command arguments could not be parsed.
    #[error("{0}")]
    Usage(String),

    /// A required external program is not installed.
    #[error("{0}: program not found on PATH")]
    ToolMissing(String),

    /// An external program exited unsuccessfully.
    #[error("{program}: {reason}")]
    Tool {
        /// Program name.
        program: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// The user interrupted the run.
    #[error("terminated by user")]
    Interrupted,
}

impl EmbalmError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit status for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::NoConfiguration { .. } => exit_code::CONFIG,
            Self::UnknownConfiguration { .. }
            | Self::UnknownCommand(_)
            | Self::UnknownTopic(_)
            | Self::Usage(_) => exit_code::USAGE,
            Self::Busy { .. } => exit_code::TEMPFAIL,
            Self::Io { .. } => exit_code::IOERR,
            Self::ToolMissing(_) => exit_code::UNAVAILABLE,
            Self::Tool { .. } => exit_code::SOFTWARE,
            Self::Interrupted => exit_code::OK,
        }
    }
}

/// Errors that arise from loading, resolving and validating settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more required settings are absent or empty.
    #[error("{}: no value given", conjoin(.0))]
    MissingSettings(Vec<String>),

    /// A setting holds a value outside its accepted set.
    #[error("{value}: invalid value given for {key} (choose from {expected})")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// Offending value.
        value: String,
        /// Accepted values, already joined for display.
        expected: String,
    },

    /// A template references a name that is neither a setting nor a fixed identifier.
    #[error("{{{0}}}: unknown setting")]
    UnknownSetting(String),

    /// A template resolves back to itself.
    #[error("{0}: setting refers to itself")]
    CyclicReference(String),

    /// Template resolution kept changing the value without settling.
    #[error("{0}: template resolution does not converge")]
    ResolutionLimit(String),

    /// A template contains a lone `{` or `}`.
    #[error("{0}: unbalanced braces in template")]
    MalformedTemplate(String),

    /// An include chain leads back to a file that is still being read.
    #[error("{}: include cycle detected", .path.display())]
    IncludeCycle {
        /// File that was included again while still being expanded.
        path: PathBuf,
    },

    /// A settings file is not valid TOML or holds an unsupported value.
    #[error("{}: {message}", .path.display())]
    Parse {
        /// Settings file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// No passphrase is available for GPG.
    #[error("you must specify gpg_passphrase in settings")]
    MissingPassphrase,

    /// A setting the caller requires is absent.
    #[error("{0}: no value given")]
    NotFound(String),
}

/// Join names the way a person would list them: `a`, `a and b`, `a, b and c`.
#[must_use]
pub fn conjoin(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

/// Capitalise the first letter of a message and make sure it ends with a full stop.
#[must_use]
pub fn full_stop(msg: &str) -> String {
    let msg = msg.trim();
    let mut chars = msg.chars();
    let mut out = chars
        .next()
        .map(|c| c.to_uppercase().collect::<String>())
        .unwrap_or_default();
    out.push_str(chars.as_str());
    if !out.is_empty() && !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    out
}

/// Find the typed error inside an [`anyhow::Error`] chain and return its exit status.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<EmbalmError>() {
            return e.exit_code();
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return exit_code::CONFIG;
        }
    }
    exit_code::FAILURE
}

/// Whether the error chain records a user interruption.
#[must_use]
pub fn is_interrupted(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|c| matches!(c.downcast_ref::<EmbalmError>(), Some(EmbalmError::Interrupted)))
}
