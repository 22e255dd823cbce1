//! Command: help on commands and topics.
use anyhow::Result;
use clap::Parser;

use super::{Command, Invocation, two_columns};
use crate::error::EmbalmError;

const DESCRIPTION: &str = "\
Embalm is a simple command line utility to orchestrate backups. It is built on
Duplicity, which is a powerful and flexible utility for managing encrypted
backups, however it has a rather heavy user interface. With Embalm, you
specify all the details about your backups once in advance, and then use a
very simple command line interface for your day-to-day activities. The details
are contained in ~/.config/embalm. That directory contains a file
(settings.toml) that holds shared settings, and then another file for each
backup configuration you have.

Each backup configuration has a working directory. Those directories hold the
log files and the Duplicity archive directory. The archive directory contains
Duplicity housekeeping files for the backup.";

/// A help topic that is not a command.
#[derive(Debug, Clone, Copy)]
pub struct Topic {
    /// Name given to `embalm help`.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Full text.
    pub text: &'static str,
}

/// Every help topic.
pub const TOPICS: &[Topic] = &[
    Topic {
        name: "overview",
        description: "overview of embalm",
        text: "\
Embalm is a simple command line utility to orchestrate backups. It is built on
Duplicity, which is a powerful and flexible utility for managing encrypted
backups, however it has a rather heavy user interface. With embalm, you
specify all the details about your backups once in advance, and then use a
very simple command line interface for your day-to-day activities.

Embalm requires generic configuration information be specified in
~/.config/embalm/settings.toml. In this same directory you may have files that
hold specific backup configurations. These files should be listed in
configuration_files in the primary settings file. To use a configuration,
specify its name with the --config command line option.

Each backup configuration must have a persistent working directory (specified
with the working_dir setting). After reading the appropriate configuration,
embalm changes to the working directory before running. This directory
contains the Duplicity archive directory as well as the Duplicity and embalm
log files. It might also contain executables that are associated with the
configuration, such as a script to strip unwanted files before the backup is
performed.",
    },
    Topic {
        name: "precautions",
        description: "what everybody should know before using embalm",
        text: "\
You should assure you have a backup copy of the GPG passphrase in a safe
place. This is very important. If the only copy of the GPG passphrase is on
the disk being backed up and that disk were to fail you would not be able to
access your backups.

If you keep the GPG passphrase in a settings file, you should set its
permissions so that it is not readable by others:

    chmod 600 ~/.config/embalm/settings.toml

It is also best, if it can be arranged, to keep your backups at a remote site
so that your backups do not get destroyed in the same disaster, such as a fire
or flood, that claims your original files. If you do not have, or do not wish
to use, your own server, Duplicity offers a number of backends that allow you
to place your backups in the cloud. Remember, your data is fully encrypted, so
they cannot pry.",
    },
];

#[derive(Parser, Debug)]
#[command(disable_help_flag = true)]
struct HelpArgs {
    topic: Option<String>,
}

/// `help` command.
#[derive(Debug, Clone, Copy)]
pub struct Help;

impl Command for Help {
    fn names(&self) -> &'static [&'static str] {
        &["help", "h"]
    }

    fn description(&self) -> &'static str {
        "give information about commands or other topics"
    }

    fn usage(&self) -> &'static str {
        "Usage:\n    embalm help [<topic>]\n    embalm h    [<topic>]"
    }

    fn requires_exclusivity(&self) -> bool {
        false
    }

    fn requires_settings(&self) -> bool {
        false
    }

    fn run(&self, inv: &Invocation<'_>) -> Result<()> {
        let args: HelpArgs = inv.parse_args()?;
        let Some(name) = args.topic else {
            inv.log.output(&format!("{DESCRIPTION}\n"));
            inv.log.output("Available commands:");
            inv.log.output(&inv.registry.summarize());
            inv.log.output("\nAvailable topics:");
            inv.log.output(&summarize_topics());
            return Ok(());
        };

        if let Ok((command, _)) = inv.registry.find(Some(name.as_str())) {
            inv.log.output(&command.help());
        } else if let Some(topic) = TOPICS.iter().find(|t| t.name == name) {
            inv.log.output(topic.text);
        } else {
            return Err(EmbalmError::UnknownTopic(name).into());
        }
        Ok(())
    }
}

/// One line per topic, sorted by name.
#[must_use]
pub fn summarize_topics() -> String {
    let mut topics: Vec<&Topic> = TOPICS.iter().collect();
    topics.sort_by_key(|t| t.name);
    topics
        .iter()
        .map(|t| two_columns(t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n")
}
