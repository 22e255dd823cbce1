//! Command: full and incremental backups.
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::Path;

use anyhow::Result;

use super::{Command, Invocation};
use crate::config::locations::absolute;
use crate::context::ExecutionContext;
use crate::duplicity::Duplicity;
use crate::error::EmbalmError;
use crate::interrupt;

const FULL_USAGE: &str = "\
Usage:
    embalm full
    embalm f

Once configured, you would perform your first backup as a full backup:

    embalm full

After that, you should normally prefer incremental backups, though you
should run a full backup every few months.";

const INCREMENTAL_USAGE: &str = "\
Usage:
    embalm incremental
    embalm incr
    embalm inc
    embalm i
    embalm

After you have run a full backup, you may run incremental backups, which
are considerably faster and consume much less space:

    embalm incremental

or simply:

    embalm

However, it is important to run a full backup every few months.";

/// Kind of backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    /// Everything under the source directory.
    Full,
    /// Changes since the previous backup.
    Incremental,
}

impl BackupKind {
    /// Duplicity action for this kind.
    #[must_use]
    pub const fn action(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incr",
        }
    }
}

/// Backup command; one entry per [`BackupKind`].
#[derive(Debug, Clone, Copy)]
pub struct Backup {
    kind: BackupKind,
}

impl Backup {
    /// The `full` command.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            kind: BackupKind::Full,
        }
    }

    /// The `incremental` command.
    #[must_use]
    pub const fn incremental() -> Self {
        Self {
            kind: BackupKind::Incremental,
        }
    }
}

impl Command for Backup {
    fn names(&self) -> &'static [&'static str] {
        match self.kind {
            BackupKind::Full => &["full", "f"],
            BackupKind::Incremental => &["incremental", "incr", "inc", "i"],
        }
    }

    fn description(&self) -> &'static str {
        match self.kind {
            BackupKind::Full => "run a full backup",
            BackupKind::Incremental => "run an incremental backup",
        }
    }

    fn usage(&self) -> &'static str {
        match self.kind {
            BackupKind::Full => FULL_USAGE,
            BackupKind::Incremental => INCREMENTAL_USAGE,
        }
    }

    fn requires_exclusivity(&self) -> bool {
        true
    }

    fn run(&self, inv: &Invocation<'_>) -> Result<()> {
        inv.no_args()?;
        let ctx = inv.context()?;
        let settings = ctx.settings();

        for each in settings.values("must_exist")? {
            if !absolute(&each, ctx.starting_dir()).exists() {
                return Err(EmbalmError::io(
                    each,
                    Error::new(ErrorKind::NotFound, "does not exist, perform setup and restart"),
                )
                .into());
            }
        }

        run_scripts(inv, &settings.values("run_before_backup")?)?;

        let duplicity = Duplicity::new(ctx, inv.options, inv.executor);
        let mut args = vec![self.kind.action().to_string()];
        args.extend(duplicity.common_options()?);
        args.extend(duplicity.archive_options());
        args.extend(duplicity.sftp_options()?);
        args.extend(duplicity.excludes()?);
        args.push(ctx.src_dir().display().to_string());
        args.push(duplicity.destination()?);
        duplicity.run(&args)?;

        if inv.options.trial_run {
            inv.log.narrate("trial run, date stamps left unchanged");
        } else {
            self.stamp(ctx)?;
        }

        run_scripts(inv, &settings.values("run_after_backup")?)
    }
}

impl Backup {
    /// Record the time of this backup; a full backup also counts as incremental.
    fn stamp(self, ctx: &ExecutionContext) -> Result<(), EmbalmError> {
        let now = chrono::Local::now().to_rfc3339();
        if self.kind == BackupKind::Full {
            write_stamp(ctx.lastbackup_full(), &now)?;
        }
        write_stamp(ctx.lastbackup_incr(), &now)
    }
}

fn write_stamp(path: &Path, now: &str) -> Result<(), EmbalmError> {
    fs::write(path, now).map_err(|e| EmbalmError::io(path, e))
}

fn run_scripts(inv: &Invocation<'_>, scripts: &[String]) -> Result<()> {
    for each in scripts {
        interrupt::check()?;
        inv.log.narrate(&format!("running: {each}"));
        inv.executor.run_shell(each)?;
    }
    Ok(())
}
