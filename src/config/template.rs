//! `{name}` placeholder resolution for string settings.
//!
//! A settings value such as `"{home}/backups/{config_name}"` is expanded
//! against a [`Namespace`] made of every string-valued setting plus the fixed
//! identifiers `host_name`, `user_name` and `prog_name`. Expansion repeats
//! until a pass leaves the value unchanged, so placeholders may refer to
//! settings that themselves contain placeholders.
//!
//! `{{` and `}}` stand for literal braces within a single pass; a literal
//! brace that survives into a later pass is read as template syntax again.
use std::collections::HashMap;

use super::locations::Identity;
use super::value::{Mapping, Value};
use crate::error::ConfigError;

/// Upper bound on substitution passes before giving up.
pub const MAX_PASSES: usize = 32;

/// Names available to placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    names: HashMap<String, String>,
}

impl Namespace {
    /// Build the namespace for `settings`: all string-valued settings plus the
    /// fixed identifiers, which win over settings of the same name.
    #[must_use]
    pub fn new(settings: &Mapping, identity: &Identity) -> Self {
        let mut names: HashMap<String, String> = settings
            .iter()
            .filter_map(|(k, v)| match v {
                Value::Str(s) => Some((k.clone(), s.clone())),
                _ => None,
            })
            .collect();
        for (k, v) in identity.fields() {
            names.insert(k.to_string(), v.to_string());
        }
        Self { names }
    }

    /// Add or replace a name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.names.insert(name.into(), value.into());
    }

    /// Look up a name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Resolve every placeholder in `value`, iterating to a fixed point.
///
/// # Errors
///
/// - [`ConfigError::UnknownSetting`] if a placeholder names nothing in `namespace`
/// - [`ConfigError::MalformedTemplate`] on a lone `{` or `}`
/// - [`ConfigError::CyclicReference`] if the value expands back to itself
/// - [`ConfigError::ResolutionLimit`] if it has not settled after [`MAX_PASSES`]
pub fn resolve(value: &str, namespace: &Namespace) -> Result<String, ConfigError> {
    let mut current = value.to_string();
    for _ in 0..MAX_PASSES {
        let (next, substituted) = substitute(&current, namespace)?;
        if next == current {
            if substituted {
                return Err(ConfigError::CyclicReference(value.to_string()));
            }
            return Ok(next);
        }
        current = next;
    }
    Err(ConfigError::ResolutionLimit(value.to_string()))
}

/// Perform exactly one substitution pass.
///
/// Used for templates whose substituted values must be taken literally, such
/// as the notifier command line, where the message may contain braces.
///
/// # Errors
///
/// Same as [`resolve`], minus the iteration errors.
pub fn format_once(template: &str, namespace: &Namespace) -> Result<String, ConfigError> {
    substitute(template, namespace).map(|(out, _)| out)
}

/// One pass over `template`. Returns the output and whether any placeholder was replaced.
fn substitute(template: &str, namespace: &Namespace) -> Result<(String, bool), ConfigError> {
    let malformed = || ConfigError::MalformedTemplate(template.to_string());
    let mut out = String::with_capacity(template.len());
    let mut substituted = false;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut field = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    match inner {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(malformed()),
                        _ => field.push(inner),
                    }
                }
                if !closed {
                    return Err(malformed());
                }
                // `{name:spec}` and `{name!conv}` are accepted; only the name matters.
                let name = field.split([':', '!']).next().unwrap_or_default();
                let replacement = namespace
                    .get(name)
                    .ok_or_else(|| ConfigError::UnknownSetting(name.to_string()))?;
                out.push_str(replacement);
                substituted = true;
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(malformed()),
            _ => out.push(c),
        }
    }
    Ok((out, substituted))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ns(pairs: &[(&str, &str)]) -> Namespace {
        pairs.iter().copied().collect()
    }

    #[test]
    fn plain_value_is_unchanged() {
        assert_eq!(resolve("/home/ken", &ns(&[])).unwrap(), "/home/ken");
    }

    #[test]
    fn single_substitution() {
        let n = ns(&[("user_name", "ken")]);
        assert_eq!(resolve("/home/{user_name}", &n).unwrap(), "/home/ken");
    }

    #[test]
    fn chained_substitution() {
        let n = ns(&[("home", "/home/{user}"), ("user", "ken")]);
        assert_eq!(resolve("{home}/src", &n).unwrap(), "/home/ken/src");
    }

    #[test]
    fn unknown_placeholder_is_named() {
        let err = resolve("{home}/x", &ns(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSetting(ref name) if name == "home"));
    }

    #[test]
    fn unknown_placeholder_found_in_later_pass() {
        let n = ns(&[("a", "{b}")]);
        let err = resolve("{a}", &n).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSetting(ref name) if name == "b"));
    }

    #[test]
    fn self_reference_is_an_error() {
        let n = ns(&[("a", "{a}")]);
        assert!(matches!(
            resolve("{a}", &n).unwrap_err(),
            ConfigError::CyclicReference(_)
        ));
    }

    #[test]
    fn growing_reference_hits_the_limit() {
        let n = ns(&[("a", "{a}x")]);
        assert!(matches!(
            resolve("{a}", &n).unwrap_err(),
            ConfigError::ResolutionLimit(_)
        ));
    }

    #[test]
    fn mutual_reference_hits_the_limit() {
        let n = ns(&[("a", "{b}"), ("b", "{a}")]);
        assert!(resolve("{a}", &n).is_err());
    }

    #[test]
    fn escaped_braces_resolve_in_the_next_pass() {
        let n = ns(&[("x", "1")]);
        assert_eq!(resolve("{{x}}", &n).unwrap(), "1");
        assert_eq!(format_once("{{x}}", &n).unwrap(), "{x}");
    }

    #[test]
    fn lone_braces_are_malformed() {
        let n = ns(&[("x", "1")]);
        assert!(matches!(
            resolve("{x", &n).unwrap_err(),
            ConfigError::MalformedTemplate(_)
        ));
        assert!(matches!(
            resolve("x}", &n).unwrap_err(),
            ConfigError::MalformedTemplate(_)
        ));
    }

    #[test]
    fn format_spec_is_ignored() {
        let n = ns(&[("x", "1")]);
        assert_eq!(resolve("{x:>5}", &n).unwrap(), "1");
        assert_eq!(resolve("{x!r}", &n).unwrap(), "1");
    }

    #[test]
    fn resolution_is_idempotent() {
        let n = ns(&[
            ("home", "/home/{user}"),
            ("user", "ken"),
            ("dest", "{home}/backups/{host}"),
            ("host", "earth"),
        ]);
        for value in ["{dest}", "{home}", "plain", "{{user}}", "{user}-{host}"] {
            let once = resolve(value, &n).unwrap();
            assert_eq!(resolve(&once, &n).unwrap(), once, "value: {value}");
        }
    }

    #[test]
    fn identity_wins_over_settings() {
        let mut settings = Mapping::new();
        settings.insert("host_name".into(), Value::from("from-settings"));
        settings.insert("flag".into(), Value::Bool(true));
        let identity = Identity::new("earth", "ken");
        let n = Namespace::new(&settings, &identity);
        assert_eq!(n.get("host_name"), Some("earth"));
        assert_eq!(n.get("prog_name"), Some(crate::PROGRAM_NAME));
        assert_eq!(n.get("flag"), None);
    }
}
