//! Command: describe the active configuration.
use anyhow::Result;

use super::{Command, Invocation};

/// `info` command.
#[derive(Debug, Clone, Copy)]
pub struct Info;

impl Command for Info {
    fn names(&self) -> &'static [&'static str] {
        &["info"]
    }

    fn description(&self) -> &'static str {
        "print information about a backup"
    }

    fn usage(&self) -> &'static str {
        "Usage:\n    embalm info"
    }

    fn requires_exclusivity(&self) -> bool {
        false
    }

    fn run(&self, inv: &Invocation<'_>) -> Result<()> {
        inv.no_args()?;
        let ctx = inv.context()?;
        let settings = ctx.settings();
        let destination = format!(
            "{}:{}",
            settings.require_value("dest_server")?,
            ctx.dest_dir()
        );
        let rows = [
            ("config", settings.config_name().to_string()),
            ("source", ctx.src_dir().display().to_string()),
            ("destination", destination),
            ("settings directory", ctx.config_dir().display().to_string()),
            ("working directory", ctx.working_dir().display().to_string()),
            ("archive directory", ctx.archive_dir().display().to_string()),
            ("restore directory", ctx.restore_dir().display().to_string()),
            ("log file", ctx.log_file().display().to_string()),
        ];
        for (label, value) in rows {
            inv.log.output(&format!("{label:>20}: {value}"));
        }
        Ok(())
    }
}
