//! Command: print version information.
use anyhow::Result;

use super::{Command, Invocation};
use crate::{PROGRAM_NAME, version};

/// `version` command.
#[derive(Debug, Clone, Copy)]
pub struct Version;

impl Command for Version {
    fn names(&self) -> &'static [&'static str] {
        &["version"]
    }

    fn description(&self) -> &'static str {
        "display embalm version"
    }

    fn usage(&self) -> &'static str {
        "Usage:\n    embalm version"
    }

    fn requires_exclusivity(&self) -> bool {
        false
    }

    fn requires_settings(&self) -> bool {
        false
    }

    fn run(&self, inv: &Invocation<'_>) -> Result<()> {
        inv.no_args()?;
        inv.log.output(&format!("{PROGRAM_NAME} version: {}.", version()));
        Ok(())
    }
}
