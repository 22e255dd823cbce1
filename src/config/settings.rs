//! The resolved, read-only settings of one invocation.
use std::path::{Path, PathBuf};

use super::loader::ConfigTree;
use super::locations::Identity;
use super::template::{self, Namespace};
use super::value::{Mapping, Value};
use crate::error::ConfigError;

/// Settings of the active configuration.
///
/// Raw values keep their placeholders; the `value`/`values` accessors resolve
/// them on read. Optional settings are read with [`Settings::get`] or
/// [`Settings::value`], required ones with [`Settings::require`] or
/// [`Settings::require_value`].
#[derive(Debug, Clone)]
pub struct Settings {
    config_name: String,
    values: Mapping,
    namespace: Namespace,
    identity: Identity,
    root_file: PathBuf,
    config_dir: PathBuf,
}

impl Settings {
    /// Wrap a loaded (and usually validated) settings tree.
    #[must_use]
    pub fn new(tree: ConfigTree, identity: Identity) -> Self {
        let namespace = Namespace::new(&tree.settings, &identity);
        let config_dir = tree
            .root_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            config_name: tree.config_name,
            values: tree.settings,
            namespace,
            identity,
            root_file: tree.root_file,
            config_dir,
        }
    }

    /// Name of the active configuration.
    #[must_use]
    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    /// Fixed identifiers used for resolution.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Root settings file.
    #[must_use]
    pub fn root_file(&self) -> &Path {
        &self.root_file
    }

    /// Directory holding the settings files.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// The raw mapping, placeholders unresolved.
    #[must_use]
    pub const fn mapping(&self) -> &Mapping {
        &self.values
    }

    /// Every setting in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Raw value of an optional setting.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Raw value of a required setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the setting is absent.
    pub fn require(&self, key: &str) -> Result<&Value, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))
    }

    /// Resolved value of an optional setting; `None` when absent or empty.
    ///
    /// # Errors
    ///
    /// Returns a template error if the value cannot be resolved.
    pub fn value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.get(key) {
            Some(v) if !v.is_empty() => self.resolve(&v.to_string()).map(Some),
            _ => Ok(None),
        }
    }

    /// Resolved value of a required setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the setting is absent or empty, or
    /// a template error if it cannot be resolved.
    pub fn require_value(&self, key: &str) -> Result<String, ConfigError> {
        self.value(key)?
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))
    }

    /// Resolved items of a list setting (a scalar counts as one item).
    ///
    /// # Errors
    ///
    /// Returns a template error if an item cannot be resolved.
    pub fn values(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        match self.get(key) {
            Some(v) if !v.is_empty() => v.items().iter().map(|i| self.resolve(i)).collect(),
            _ => Ok(Vec::new()),
        }
    }

    /// Resolve an arbitrary template against these settings.
    ///
    /// # Errors
    ///
    /// Returns a template error if `value` cannot be resolved.
    pub fn resolve(&self, value: &str) -> Result<String, ConfigError> {
        template::resolve(value, &self.namespace)
    }

    /// The resolution namespace, for callers that need a single pass.
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}
