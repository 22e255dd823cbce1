//! Where settings and state live, and who is running.
use std::path::{Path, PathBuf};

use crate::PROGRAM_NAME;

/// Environment variable overriding the settings directory.
pub const CONFIG_DIR_ENV: &str = "EMBALM_CONFIG_DIR";

/// Environment variable overriding the data directory (parent of default working directories).
pub const DATA_DIR_ENV: &str = "EMBALM_DATA_DIR";

/// Fixed identifiers available to every template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Name of this machine, `{host_name}`.
    pub host_name: String,
    /// Name of the invoking user, `{user_name}`.
    pub user_name: String,
}

impl Identity {
    /// Create an identity with explicit values.
    pub fn new(host_name: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            user_name: user_name.into(),
        }
    }

    /// Detect the host and user name of the current process.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            host_name: detect_host_name(),
            user_name: detect_user_name(),
        }
    }

    /// The fixed identifiers as `(name, value)` pairs, including `prog_name`.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, &str); 3] {
        [
            ("host_name", self.host_name.as_str()),
            ("user_name", self.user_name.as_str()),
            ("prog_name", PROGRAM_NAME),
        ]
    }
}

fn detect_host_name() -> String {
    if let Ok(name) = std::env::var("HOSTNAME").or_else(|_| std::env::var("COMPUTERNAME"))
        && !name.trim().is_empty()
    {
        return name.trim().to_string();
    }
    if let Ok(name) = std::fs::read_to_string("/etc/hostname")
        && !name.trim().is_empty()
    {
        return name.trim().to_string();
    }
    crate::exec::run("hostname", &[])
        .map(|r| r.stdout.trim().to_string())
        .unwrap_or_else(|_| "localhost".to_string())
}

fn detect_user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Directories and identity the settings are resolved against.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Directory holding `settings.toml` and the per-configuration files.
    pub config_dir: PathBuf,
    /// Directory under which default working directories are created.
    pub data_dir: PathBuf,
    /// Fixed template identifiers.
    pub identity: Identity,
}

impl Environment {
    /// Create an environment with explicit values.
    pub fn new(
        config_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        identity: Identity,
    ) -> Self {
        Self {
            config_dir: config_dir.into(),
            data_dir: data_dir.into(),
            identity,
        }
    }

    /// Detect directories from `EMBALM_CONFIG_DIR` / `EMBALM_DATA_DIR`,
    /// falling back to the platform's user config and data directories.
    #[must_use]
    pub fn detect() -> Self {
        let config_dir = dir_from_env(CONFIG_DIR_ENV)
            .or_else(|| dirs::config_dir().map(|d| d.join(PROGRAM_NAME)))
            .unwrap_or_else(|| Path::new(".config").join(PROGRAM_NAME));
        let data_dir = dir_from_env(DATA_DIR_ENV)
            .or_else(|| dirs::data_dir().map(|d| d.join(PROGRAM_NAME)))
            .unwrap_or_else(|| Path::new(".local/share").join(PROGRAM_NAME));
        Self {
            config_dir,
            data_dir,
            identity: Identity::detect(),
        }
    }

    /// Template for the working directory of a configuration that sets none.
    ///
    /// The data directory is taken as template text like any other setting,
    /// so braces in it are placeholders.
    #[must_use]
    pub fn default_working_dir_template(&self) -> String {
        format!("{}/{{config_name}}", self.data_dir.display())
    }
}

fn dir_from_env(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Expand `~` in `path` and anchor it at `base` unless it is already absolute.
#[must_use]
pub fn absolute(path: &str, base: &Path) -> PathBuf {
    base.join(expand_tilde(path))
}

/// Expand a leading `~` to the user's home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
