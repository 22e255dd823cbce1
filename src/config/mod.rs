//! Settings: loading, template resolution and validation.
//!
//! Settings live in TOML files under the settings directory. The root file
//! `settings.toml` names the available configurations; each configuration's
//! own file, and any files it includes, are merged on top of it. String values
//! may refer to other settings with `{name}` placeholders.
pub mod loader;
pub mod locations;
pub mod settings;
pub mod template;
pub mod validation;
pub mod value;

pub use loader::{ConfigTree, Loader};
pub use locations::{Environment, Identity};
pub use settings::Settings;
pub use value::{Mapping, Value};

/// Active configuration name, set by the loader.
pub const CONFIG_NAME_SETTING: &str = "config_name";
/// Names of the available configurations (root file only).
pub const CONFIGS_SETTING: &str = "configuration_files";
/// Configuration used when none is named on the command line (root file only).
pub const DEFAULT_CONFIG_SETTING: &str = "default_configuration";
/// Further settings files to merge.
pub const INCLUDE_SETTING: &str = "include";
/// Paths passed to Duplicity as `--exclude`.
pub const EXCLUDES_SETTING: &str = "excludes";
/// Directory holding the lock, log, archive and date stamps.
pub const WORKING_DIR_SETTING: &str = "working_dir";
/// How Duplicity reaches the SFTP server.
pub const SSH_BACKEND_SETTING: &str = "ssh_backend_method";
