//! Command: list the files held in the backups.
use anyhow::Result;
use clap::Parser;

use super::{Command, Invocation};
use crate::duplicity::Duplicity;

const USAGE: &str = "\
Usage:
    embalm manifest [options]
    embalm m [options]

Options:
    -d <date>, --date <date>   date of the desired version of paths

Once a backup has been performed, you can list the files available in your
archive using:

    embalm manifest

You can list the files that existed on a particular date using:

    embalm manifest --date 2015-04-01

Or, you can list the files that existed 3.5 days ago using:

    embalm manifest --date 3D12h

The interval string passed as the date is constructed using an integer
followed by one of the following characters s (seconds), m (minutes), h
(hours), D (days), W (weeks), M (months), or Y (years). You can combine
several to get more resolution.";

#[derive(Parser, Debug)]
#[command(disable_help_flag = true)]
struct ManifestArgs {
    #[arg(short, long)]
    date: Option<String>,
}

/// `--time <date>` when a date was given.
pub(super) fn time_option(date: Option<&str>) -> Vec<String> {
    date.map(|d| vec!["--time".to_string(), d.to_string()])
        .unwrap_or_default()
}

/// `manifest` command.
#[derive(Debug, Clone, Copy)]
pub struct Manifest;

impl Command for Manifest {
    fn names(&self) -> &'static [&'static str] {
        &["manifest", "m"]
    }

    fn description(&self) -> &'static str {
        "output the files that can be restored"
    }

    fn usage(&self) -> &'static str {
        USAGE
    }

    fn requires_exclusivity(&self) -> bool {
        true
    }

    fn run(&self, inv: &Invocation<'_>) -> Result<()> {
        let args: ManifestArgs = inv.parse_args()?;
        let ctx = inv.context()?;
        let duplicity = Duplicity::new(ctx, inv.options, inv.executor);

        let mut cmd = vec!["list-current-files".to_string()];
        cmd.extend(duplicity.common_options()?);
        cmd.extend(duplicity.archive_options());
        cmd.extend(duplicity.sftp_options()?);
        cmd.extend(time_option(args.date.as_deref()));
        cmd.push(duplicity.destination()?);
        duplicity.run(&cmd)
    }
}
