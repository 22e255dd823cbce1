//! Command: show the settings of the active configuration.
use anyhow::Result;

use super::{Command, Invocation};
use crate::config::Value;
use crate::config::validation::is_known;

const KEY_WIDTH: usize = 22;
const SECRET_SETTINGS: &[&str] = &["gpg_passphrase"];

/// `settings` command.
#[derive(Debug, Clone, Copy)]
pub struct ShowSettings;

impl Command for ShowSettings {
    fn names(&self) -> &'static [&'static str] {
        &["settings", "s"]
    }

    fn description(&self) -> &'static str {
        "list settings of chosen configuration"
    }

    fn usage(&self) -> &'static str {
        "Usage:\n    embalm settings\n    embalm s"
    }

    fn requires_exclusivity(&self) -> bool {
        false
    }

    fn run(&self, inv: &Invocation<'_>) -> Result<()> {
        inv.no_args()?;
        for (key, value) in inv.context()?.settings().iter() {
            inv.log.output(&render(key, value));
        }
        Ok(())
    }
}

/// One settings line: the name right-aligned (cyan if known, yellow if not), then the raw value.
fn render(key: &str, value: &Value) -> String {
    let color = if is_known(key) { 36 } else { 33 };
    let shown = if SECRET_SETTINGS.contains(&key) && !value.is_empty() {
        "<set>".to_string()
    } else {
        value.to_string()
    };
    format!("\x1b[{color}m{key:>KEY_WIDTH$}\x1b[0m: {shown}")
}
