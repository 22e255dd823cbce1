//! Command: recover files from the backups.
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use super::manifest::time_option;
use super::{Command, Invocation};
use crate::duplicity::Duplicity;
use crate::error::EmbalmError;

const USAGE: &str = "\
Usage:
    embalm restore [options] <path>...
    embalm r [options] <path>...

Options:
    -d <date>, --date <date>   date of the desired version of paths

You restore a file or directory using:

    embalm restore src/verif/av/manpages/settings.py

Use manifest to determine what path you should specify to identify the
desired file or directory (they will be paths relative to the source
directory).

You can restore the version of a file or directory that existed on a
particular date using:

    embalm restore --date 2015-04-01 src/verif/av/manpages/settings.py

Or, you can restore the version that existed 6 months ago using:

    embalm restore --date 6M src/verif/av/manpages/settings.py

Your restored files will be found in the working directory in restored.";

#[derive(Parser, Debug)]
#[command(disable_help_flag = true)]
struct RestoreArgs {
    #[arg(short, long)]
    date: Option<String>,
    #[arg(required = true)]
    paths: Vec<String>,
}

/// `restore` command.
#[derive(Debug, Clone, Copy)]
pub struct Restore;

impl Command for Restore {
    fn names(&self) -> &'static [&'static str] {
        &["restore", "r"]
    }

    fn description(&self) -> &'static str {
        "recover file or files from backups"
    }

    fn usage(&self) -> &'static str {
        USAGE
    }

    fn requires_exclusivity(&self) -> bool {
        true
    }

    fn run(&self, inv: &Invocation<'_>) -> Result<()> {
        let args: RestoreArgs = inv.parse_args()?;
        let ctx = inv.context()?;
        let duplicity = Duplicity::new(ctx, inv.options, inv.executor);

        let restore_dir = ctx.restore_dir();
        fs::create_dir_all(restore_dir).map_err(|e| EmbalmError::io(restore_dir, e))?;

        for path in &args.paths {
            let desired = relative_to_source(ctx.starting_dir(), ctx.src_dir(), path)?;
            inv.log.narrate(&format!("restoring: {path}"));
            let name = desired
                .file_name()
                .or_else(|| ctx.src_dir().file_name())
                .unwrap_or_default();
            let dest = restore_dir.join(name);

            let mut cmd = vec!["restore".to_string()];
            if !desired.as_os_str().is_empty() {
                cmd.push("--file-to-restore".to_string());
                cmd.push(desired.display().to_string());
            }
            cmd.extend(duplicity.common_options()?);
            cmd.extend(duplicity.archive_options());
            cmd.extend(duplicity.sftp_options()?);
            cmd.extend(time_option(args.date.as_deref()));
            cmd.push(duplicity.destination()?);
            cmd.push(dest.display().to_string());
            duplicity.run(&cmd)?;
            inv.log.output(&format!("{path}: restored as: {}", dest.display()));
        }
        Ok(())
    }
}

/// `path` (relative to `starting_dir` unless absolute) as a path inside `src_dir`.
fn relative_to_source(
    starting_dir: &Path,
    src_dir: &Path,
    path: &str,
) -> Result<PathBuf, EmbalmError> {
    let full = normalize(&starting_dir.join(path));
    full.strip_prefix(normalize(src_dir))
        .map(Path::to_path_buf)
        .map_err(|_| {
            EmbalmError::Usage(format!(
                "{path}: not contained in the source directory ({})",
                src_dir.display()
            ))
        })
}

/// Remove `.` and resolve `..` without touching the filesystem; the file
/// being restored usually no longer exists.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
