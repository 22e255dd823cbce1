//! Command: list the available configurations.
use anyhow::Result;

use super::{Command, Invocation};
use crate::config::{CONFIGS_SETTING, Value};

/// `configs` command.
#[derive(Debug, Clone, Copy)]
pub struct Configs;

impl Command for Configs {
    fn names(&self) -> &'static [&'static str] {
        &["configs", "c"]
    }

    fn description(&self) -> &'static str {
        "list available backup configurations"
    }

    fn usage(&self) -> &'static str {
        "Usage:\n    embalm configs\n    embalm c"
    }

    fn requires_exclusivity(&self) -> bool {
        false
    }

    fn run(&self, inv: &Invocation<'_>) -> Result<()> {
        inv.no_args()?;
        let settings = inv.context()?.settings();
        let configs = settings
            .get(CONFIGS_SETTING)
            .map(Value::words)
            .unwrap_or_default();
        if configs.is_empty() {
            inv.log.output("No configurations available.");
        } else {
            inv.log.output("Available Configurations:");
            for name in configs {
                inv.log.output(&format!("    {name}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::test_support::Fixture;
    use crate::exec::test_helpers::RecordingExecutor;

    #[test]
    fn lists_configurations_from_string() {
        let fixture = Fixture::new(&[("configuration_files", Value::from("home cache"))]);
        let (result, output) =
            fixture.run_with_output(&Configs, &[], &RecordingExecutor::default());
        result.unwrap();
        assert_eq!(output, "Available Configurations:\n    home\n    cache\n");
    }

    #[test]
    fn lists_configurations_from_list() {
        let fixture = Fixture::new(&[(
            "configuration_files",
            Value::List(vec!["home".into(), "root".into()]),
        )]);
        let (result, output) =
            fixture.run_with_output(&Configs, &[], &RecordingExecutor::default());
        result.unwrap();
        assert!(output.contains("    root\n"));
    }

    #[test]
    fn reports_when_none_are_configured() {
        let fixture = Fixture::new(&[]);
        let (result, output) =
            fixture.run_with_output(&Configs, &[], &RecordingExecutor::default());
        result.unwrap();
        assert_eq!(output, "No configurations available.\n");
    }
}
