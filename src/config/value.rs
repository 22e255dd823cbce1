//! Setting values as read from TOML settings files.
use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// Flat mapping from setting name to value, ordered by name.
pub type Mapping = BTreeMap<String, Value>;

/// A single setting value.
///
/// Settings files are flat: nested tables, floats and mixed arrays are
/// rejected when the file is read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// `true` / `false`.
    Bool(bool),
    /// Whole number, e.g. a bandwidth limit.
    Int(i64),
    /// String, possibly containing `{name}` placeholders.
    Str(String),
    /// Ordered list of strings, each possibly containing placeholders.
    List(Vec<String>),
}

impl Value {
    /// Convert a parsed TOML value, naming `key` in the error message.
    ///
    /// # Errors
    ///
    /// Returns a message when the value is not a string, list of strings,
    /// boolean or integer.
    pub fn from_toml(key: &str, value: toml::Value) -> Result<Self, String> {
        value.try_into().map_err(|_| {
            format!("{key}: expected a string, a list of strings, a boolean or an integer")
        })
    }

    /// The string, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the value counts as "no value given".
    ///
    /// Empty strings, empty lists and `false` are empty; integers never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bool(b) => !b,
            Self::Int(_) => false,
            Self::Str(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    /// The value as a list of items: list elements, or the scalar as one item.
    #[must_use]
    pub fn items(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.clone(),
            other => vec![other.to_string()],
        }
    }

    /// The value as a list of words: list elements, or a string split on whitespace.
    ///
    /// Used for name lists such as `configuration_files` and `include`,
    /// which may be written either way.
    #[must_use]
    pub fn words(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.clone(),
            Self::Str(s) => s.split_whitespace().map(String::from).collect(),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(src: &str) -> toml::Value {
        let table: toml::Table = toml::from_str(src).unwrap();
        table.get("v").cloned().unwrap()
    }

    #[test]
    fn converts_supported_types() {
        assert_eq!(
            Value::from_toml("v", parse("v = 'x'")).unwrap(),
            Value::Str("x".into())
        );
        assert_eq!(Value::from_toml("v", parse("v = 5")).unwrap(), Value::Int(5));
        assert_eq!(
            Value::from_toml("v", parse("v = true")).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            Value::from_toml("v", parse("v = ['a', 'b']")).unwrap(),
            Value::List(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn rejects_tables_and_floats() {
        let err = Value::from_toml("v", parse("v = { a = 1 }")).unwrap_err();
        assert!(err.starts_with("v: "));
        assert!(Value::from_toml("v", parse("v = 1.5")).is_err());
        assert!(Value::from_toml("v", parse("v = [1, 'a']")).is_err());
    }

    #[test]
    fn emptiness() {
        assert!(Value::from("").is_empty());
        assert!(Value::from("  ").is_empty());
        assert!(Value::List(vec![]).is_empty());
        assert!(Value::Bool(false).is_empty());
        assert!(!Value::Int(0).is_empty());
        assert!(!Value::from("x").is_empty());
    }

    #[test]
    fn words_split_strings() {
        assert_eq!(Value::from("home  work").words(), vec!["home", "work"]);
        assert_eq!(
            Value::List(vec!["a b".into()]).words(),
            vec!["a b".to_string()]
        );
    }

    #[test]
    fn items_keep_strings_whole() {
        assert_eq!(Value::from("rm -f x").items(), vec!["rm -f x"]);
        assert_eq!(Value::Int(100).items(), vec!["100"]);
    }
}
