//! Settings validation.
//!
//! [`validate`] is the fail-fast check run before any command that needs
//! settings: every required key must be present and non-empty, enumerated
//! values must be in range, and the working directory is defaulted and added
//! to the exclusion list. [`unknown_settings`] is the soft check: it never
//! fails, it only reports names that no part of the program reads.
use super::locations::Environment;
use super::loader::ConfigTree;
use super::template::{self, Namespace};
use super::value::{Mapping, Value};
use super::{EXCLUDES_SETTING, SSH_BACKEND_SETTING, WORKING_DIR_SETTING};
use crate::error::ConfigError;

/// Settings that must be present and non-empty.
pub const REQUIRED_SETTINGS: &[&str] = &["dest_server", "dest_dir", "src_dir", SSH_BACKEND_SETTING];

/// Accepted values of `ssh_backend_method`.
pub const SSH_BACKEND_METHODS: &[&str] = &["option", "protocol"];

/// Every setting name the program reads.
pub const KNOWN_SETTINGS: &[&str] = &[
    "bw_limit",
    "config_name",
    "configuration_files",
    "default_configuration",
    "dest_dir",
    "dest_server",
    "excludes",
    "gpg_binary",
    "gpg_passphrase",
    "include",
    "must_exist",
    "notifier",
    "notify",
    "run_after_backup",
    "run_before_backup",
    "src_dir",
    "ssh_backend_method",
    "ssh_identity",
    "working_dir",
];

/// A validation warning detected while checking settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The setting that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning about `item`.
    #[must_use]
    pub fn new(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Validate and complete a loaded settings tree.
///
/// On success `working_dir` is set and its resolved value is the last entry
/// of `excludes`. The filesystem is not touched.
///
/// # Errors
///
/// - [`ConfigError::MissingSettings`] listing every absent required key
/// - [`ConfigError::InvalidValue`] if `ssh_backend_method` is out of range
/// - any template error raised while resolving the checked values
pub fn validate(tree: &mut ConfigTree, env: &Environment) -> Result<(), ConfigError> {
    let settings = &mut tree.settings;

    let missing: Vec<String> = REQUIRED_SETTINGS
        .iter()
        .filter(|key| settings.get(**key).is_none_or(Value::is_empty))
        .map(|key| (*key).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::MissingSettings(missing));
    }

    let namespace = Namespace::new(settings, &env.identity);
    let method = settings
        .get(SSH_BACKEND_SETTING)
        .map(|v| template::resolve(&v.to_string(), &namespace))
        .transpose()?
        .unwrap_or_default();
    if !SSH_BACKEND_METHODS.contains(&method.as_str()) {
        return Err(ConfigError::InvalidValue {
            key: SSH_BACKEND_SETTING.to_string(),
            value: method,
            expected: SSH_BACKEND_METHODS.join(", "),
        });
    }

    if settings.get(WORKING_DIR_SETTING).is_none_or(Value::is_empty) {
        let default = template::resolve(&env.default_working_dir_template(), &namespace)?;
        settings.insert(WORKING_DIR_SETTING.to_string(), Value::Str(default));
    }

    let namespace = Namespace::new(settings, &env.identity);
    let working_dir = settings
        .get(WORKING_DIR_SETTING)
        .map(|v| template::resolve(&v.to_string(), &namespace))
        .transpose()?
        .unwrap_or_default();

    let mut excludes = match settings.remove(EXCLUDES_SETTING) {
        None => Vec::new(),
        Some(Value::List(items)) => items,
        Some(v) if v.is_empty() => Vec::new(),
        Some(v) => vec![v.to_string()],
    };
    excludes.push(working_dir);
    settings.insert(EXCLUDES_SETTING.to_string(), Value::List(excludes));

    Ok(())
}

/// Report every setting name that is not read anywhere.
#[must_use]
pub fn unknown_settings(settings: &Mapping) -> Vec<ValidationWarning> {
    settings
        .keys()
        .filter(|key| !is_known(key))
        .map(|key| ValidationWarning::new(key, "unknown setting"))
        .collect()
}

/// Whether `name` is a setting the program reads.
#[must_use]
pub fn is_known(name: &str) -> bool {
    KNOWN_SETTINGS.contains(&name)
}
