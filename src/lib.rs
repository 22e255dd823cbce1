//! Configuration-driven front end for Duplicity backups.
//!
//! All details of a backup relationship (source, destination, excludes,
//! hooks, passphrase) are described once in TOML settings files under the
//! user's configuration directory; day-to-day use is a short command such as
//! `embalm` or `embalm restore <path>`.
//!
//! The public API is organised into these layers:
//!
//! - **[`config`]**: load the settings tree, resolve `{name}` templates, validate
//! - **[`context`]** / **[`lock`]**: scoped working directory, lock file and log sink
//! - **[`commands`]**: the static command table and the individual commands
//! - **[`app`]**: the single dispatch boundary tying the layers together
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod duplicity;
pub mod error;
pub mod exec;
pub mod interrupt;
pub mod lock;
pub mod logging;
pub mod notify;

/// Name of the program, available to templates as `{prog_name}`.
pub const PROGRAM_NAME: &str = "embalm";

/// Version string reported by `embalm version`.
///
/// Prefers the `EMBALM_VERSION` value captured by the build script (release
/// builds and `git describe`), falling back to the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("EMBALM_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}
