//! Recursive loading of the settings tree.
//!
//! The root file `settings.toml` lists the available configurations. The
//! active configuration's file is merged on top of the root settings, followed
//! by every file named in the root's `include` list. Each loaded file may
//! itself `include` further files, resolved relative to its own directory and
//! merged depth first. Later files override earlier keys; there is no deep
//! merge.
use std::path::{Path, PathBuf};

use super::value::{Mapping, Value};
use super::{CONFIG_NAME_SETTING, CONFIGS_SETTING, DEFAULT_CONFIG_SETTING, INCLUDE_SETTING};
use crate::error::{ConfigError, EmbalmError};

/// File name of the root settings file inside the settings directory.
pub const SETTINGS_FILE: &str = "settings.toml";

/// The merged, not yet validated result of loading a settings tree.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    /// Name of the active configuration.
    pub config_name: String,
    /// All settings, merged in load order.
    pub settings: Mapping,
    /// Path of the root settings file.
    pub root_file: PathBuf,
    /// Every file read, in load order (a file included twice appears twice).
    pub sources: Vec<PathBuf>,
}

/// Loads settings trees from a settings directory.
#[derive(Debug, Clone)]
pub struct Loader {
    config_dir: PathBuf,
}

impl Loader {
    /// Create a loader rooted at `config_dir`.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Path of the root settings file.
    #[must_use]
    pub fn root_file(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Load the settings for `explicit` (or the default configuration).
    ///
    /// # Errors
    ///
    /// - [`EmbalmError::Io`] if a settings file cannot be read
    /// - [`EmbalmError::NoConfiguration`] if no configuration can be chosen
    /// - [`EmbalmError::UnknownConfiguration`] if the chosen name is not listed
    /// - [`ConfigError::Parse`] for invalid TOML or unsupported values
    /// - [`ConfigError::IncludeCycle`] if an include chain loops
    pub fn load(&self, explicit: Option<&str>) -> Result<ConfigTree, EmbalmError> {
        let root_file = self.root_file();
        let root = read_source(&root_file)?;

        let configs = root
            .get(CONFIGS_SETTING)
            .map(Value::words)
            .unwrap_or_default();
        let default = root.get(DEFAULT_CONFIG_SETTING).and_then(Value::as_str);
        let config_name = select_configuration(explicit, default, &configs, &root_file)?;
        tracing::debug!("configuration: {config_name}");

        let mut includes = vec![config_name.clone()];
        includes.extend(
            root.get(INCLUDE_SETTING)
                .map(Value::words)
                .unwrap_or_default(),
        );

        let mut expansion = Expansion {
            settings: root,
            active: vec![canonical(&root_file)?],
            sources: vec![root_file.clone()],
        };
        for include in &includes {
            expansion.include(&self.config_dir, include)?;
        }

        let mut settings = expansion.settings;
        settings.insert(
            CONFIG_NAME_SETTING.to_string(),
            Value::Str(config_name.clone()),
        );

        Ok(ConfigTree {
            config_name,
            settings,
            root_file,
            sources: expansion.sources,
        })
    }
}

/// Pick the active configuration: explicit > declared default > the only one.
fn select_configuration(
    explicit: Option<&str>,
    default: Option<&str>,
    configs: &[String],
    root_file: &Path,
) -> Result<String, EmbalmError> {
    let requested = explicit
        .filter(|n| !n.is_empty())
        .or_else(|| default.filter(|n| !n.is_empty()));

    match (requested, configs) {
        (Some(name), _) if configs.iter().any(|c| c == name) => Ok(name.to_string()),
        (Some(name), _) => Err(EmbalmError::UnknownConfiguration {
            name: name.to_string(),
            path: root_file.to_path_buf(),
        }),
        (None, [only]) => Ok(only.clone()),
        (None, _) => Err(EmbalmError::NoConfiguration {
            path: root_file.to_path_buf(),
        }),
    }
}

/// State of one recursive load.
struct Expansion {
    settings: Mapping,
    /// Canonical paths of the files currently being expanded.
    active: Vec<PathBuf>,
    sources: Vec<PathBuf>,
}

impl Expansion {
    fn include(&mut self, parent: &Path, target: &str) -> Result<(), EmbalmError> {
        let path = include_path(parent, target);
        let key = canonical(&path)?;
        if self.active.contains(&key) {
            return Err(ConfigError::IncludeCycle { path }.into());
        }

        tracing::debug!("reading settings: {}", path.display());
        let source = read_source(&path)?;
        let nested = source
            .get(INCLUDE_SETTING)
            .map(Value::words)
            .unwrap_or_default();
        self.settings.extend(source);
        self.sources.push(path.clone());

        self.active.push(key);
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        for each in &nested {
            self.include(&dir, each)?;
        }
        self.active.pop();
        Ok(())
    }
}

/// Resolve an include target relative to the including file's directory.
///
/// A bare name that does not exist is retried with a `.toml` extension.
fn include_path(parent: &Path, target: &str) -> PathBuf {
    let path = parent.join(target);
    if !path.exists() && path.extension().is_none() {
        let with_ext = path.with_extension("toml");
        if with_ext.exists() {
            return with_ext;
        }
    }
    path
}

fn canonical(path: &Path) -> Result<PathBuf, EmbalmError> {
    dunce::canonicalize(path).map_err(|e| EmbalmError::io(path, e))
}

/// Read one settings file into a flat mapping.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or holds a
/// value that is not a string, list of strings, boolean or integer.
pub fn read_source(path: &Path) -> Result<Mapping, EmbalmError> {
    let content = std::fs::read_to_string(path).map_err(|e| EmbalmError::io(path, e))?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;

    let mut mapping = Mapping::new();
    for (key, value) in table {
        let value = Value::from_toml(&key, value).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        mapping.insert(key, value);
    }
    Ok(mapping)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        if let Some(parent) = dir.join(name).parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(dir.join(name), content).unwrap();
    }

    fn str_of<'a>(tree: &'a ConfigTree, key: &str) -> &'a str {
        tree.settings
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_else(|| panic!("{key} not set"))
    }

    #[test]
    fn default_configuration_is_used() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "settings.toml",
            "configuration_files = ['a', 'b']\ndefault_configuration = 'a'\n",
        );
        write(tmp.path(), "a.toml", "src_dir = '/x'\n");
        write(tmp.path(), "b.toml", "src_dir = '/z'\n");

        let tree = Loader::new(tmp.path()).load(None).unwrap();
        assert_eq!(tree.config_name, "a");
        assert_eq!(str_of(&tree, "src_dir"), "/x");
        assert_eq!(str_of(&tree, "config_name"), "a");
    }

    #[test]
    fn explicit_name_beats_default() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "settings.toml",
            "configuration_files = 'a b'\ndefault_configuration = 'a'\n",
        );
        write(tmp.path(), "a.toml", "src_dir = '/x'\n");
        write(tmp.path(), "b.toml", "src_dir = '/z'\n");

        let tree = Loader::new(tmp.path()).load(Some("b")).unwrap();
        assert_eq!(tree.config_name, "b");
        assert_eq!(str_of(&tree, "src_dir"), "/z");
    }

    #[test]
    fn sole_configuration_is_implied() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "settings.toml", "configuration_files = ['only']\n");
        write(tmp.path(), "only.toml", "");
        let tree = Loader::new(tmp.path()).load(None).unwrap();
        assert_eq!(tree.config_name, "only");
    }

    #[test]
    fn no_configuration_to_choose() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "settings.toml", "configuration_files = ['a', 'b']\n");
        let err = Loader::new(tmp.path()).load(None).unwrap_err();
        assert!(matches!(err, EmbalmError::NoConfiguration { .. }));
    }

    #[test]
    fn unknown_configuration_is_named() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "settings.toml", "configuration_files = ['a']\n");
        let err = Loader::new(tmp.path()).load(Some("zz")).unwrap_err();
        assert!(matches!(err, EmbalmError::UnknownConfiguration { ref name, .. } if name == "zz"));
        assert!(err.to_string().starts_with("zz: unknown configuration"));
    }

    #[test]
    fn missing_root_file_names_path() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Loader::new(tmp.path()).load(None).unwrap_err();
        assert!(matches!(err, EmbalmError::Io { ref path, .. } if path.ends_with("settings.toml")));
    }

    #[test]
    fn later_include_overrides_earlier() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "settings.toml",
            "configuration_files = ['a']\nk = '1'\ninclude = ['shared']\n",
        );
        write(tmp.path(), "a.toml", "k = '2'\nonly_a = 'yes'\n");
        write(tmp.path(), "shared.toml", "k = '3'\n");

        let tree = Loader::new(tmp.path()).load(None).unwrap();
        assert_eq!(str_of(&tree, "k"), "3");
        assert_eq!(str_of(&tree, "only_a"), "yes");
    }

    #[test]
    fn configuration_overrides_root() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "settings.toml",
            "configuration_files = ['a']\nk = '1'\n",
        );
        write(tmp.path(), "a.toml", "k = '2'\n");
        let tree = Loader::new(tmp.path()).load(None).unwrap();
        assert_eq!(str_of(&tree, "k"), "2");
    }

    #[test]
    fn nested_include_is_relative_to_including_file() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "settings.toml", "configuration_files = ['a']\n");
        write(tmp.path(), "a.toml", "include = 'sub/common'\nk = 'a'\n");
        write(tmp.path(), "sub/common.toml", "include = ['deeper.toml']\nk = 'common'\n");
        write(tmp.path(), "sub/deeper.toml", "k = 'deeper'\n");

        let tree = Loader::new(tmp.path()).load(None).unwrap();
        assert_eq!(str_of(&tree, "k"), "deeper");
        assert_eq!(tree.sources.len(), 4);
    }

    #[test]
    fn repeated_include_is_reapplied() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "settings.toml",
            "configuration_files = ['a']\ninclude = ['common', 'b', 'common']\n",
        );
        write(tmp.path(), "a.toml", "");
        write(tmp.path(), "common.toml", "k = 'common'\n");
        write(tmp.path(), "b.toml", "k = 'b'\n");

        let tree = Loader::new(tmp.path()).load(None).unwrap();
        assert_eq!(str_of(&tree, "k"), "common");
    }

    #[test]
    fn include_cycle_is_detected() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "settings.toml", "configuration_files = ['a']\n");
        write(tmp.path(), "a.toml", "include = ['b']\n");
        write(tmp.path(), "b.toml", "include = ['a']\n");

        let err = Loader::new(tmp.path()).load(None).unwrap_err();
        assert!(matches!(
            err,
            EmbalmError::Config(ConfigError::IncludeCycle { .. })
        ));
    }

    #[test]
    fn root_cannot_be_included() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "settings.toml", "configuration_files = ['a']\n");
        write(tmp.path(), "a.toml", "include = ['settings']\n");
        let err = Loader::new(tmp.path()).load(None).unwrap_err();
        assert!(matches!(
            err,
            EmbalmError::Config(ConfigError::IncludeCycle { .. })
        ));
    }

    #[test]
    fn config_name_cannot_be_overridden() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "settings.toml", "configuration_files = ['a']\n");
        write(tmp.path(), "a.toml", "config_name = 'sneaky'\n");
        let tree = Loader::new(tmp.path()).load(None).unwrap();
        assert_eq!(str_of(&tree, "config_name"), "a");
    }

    #[test]
    fn invalid_value_type_is_reported_with_key() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "settings.toml", "configuration_files = ['a']\n");
        write(tmp.path(), "a.toml", "[nested]\nx = 1\n");
        let err = Loader::new(tmp.path()).load(None).unwrap_err();
        assert!(err.to_string().contains("nested: expected"));
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "settings.toml", "configuration_files = [\n");
        let err = Loader::new(tmp.path()).load(None).unwrap_err();
        assert!(matches!(err, EmbalmError::Config(ConfigError::Parse { .. })));
        assert!(err.to_string().contains("settings.toml"));
    }

    #[test]
    fn select_configuration_prefers_explicit() {
        let configs = vec!["a".to_string(), "b".to_string()];
        let root = Path::new("/s");
        assert_eq!(
            select_configuration(Some("b"), Some("a"), &configs, root).unwrap(),
            "b"
        );
        assert_eq!(
            select_configuration(Some(""), Some("a"), &configs, root).unwrap(),
            "a"
        );
        assert!(select_configuration(None, None, &configs, root).is_err());
    }
}
