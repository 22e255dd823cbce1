//! Command: report how long ago the last backups ran.
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use clap::Parser;

use super::{Command, Invocation};
use crate::config::template::{self, Namespace};
use crate::error::{ConfigError, EmbalmError};

const USAGE: &str = "\
Used with status bar programs, such as i3status, to make user aware that
backups are due.

Usage:
    embalm due [options]

Options:
    -d <num>, --inc-days <num>   emit message if this many days have passed
                                 since incremental backup
    -D <num>, --full-days <num>  emit message if this many days have passed
                                 since full backup
    -m <msg>, --message <msg>    the message to emit

If you specify either --inc-days or --full-days or both, the message is
printed if the corresponding backup is overdue, otherwise nothing is printed.
If both durations are specified and both are violated, then two messages are
printed.

If you specify the message, the following replacements are available:
    days: the number of days since the backup
    elapsed: the time that has elapsed since the backup
    kind: the type of backup, either 'incremental' or 'full'.

Otherwise, the time that has elapsed since each backup is printed.

Examples:
    > embalm due
    Full backup was performed 21 days ago.
    Incremental backup was performed 19 hours ago.

    > embalm due -d0.5 -m 'It has been {days} days since the last {kind} backup.'
    It has been 0.8 days since the last incremental backup.

    > embalm due -D90 -m 'It has been {elapsed} since the last {kind} backup.'
    It has been 4 months since the last full backup.";

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Parser, Debug, Default)]
#[command(disable_help_flag = true)]
struct DueArgs {
    #[arg(short = 'd', long = "inc-days")]
    inc_days: Option<f64>,
    #[arg(short = 'D', long = "full-days")]
    full_days: Option<f64>,
    #[arg(short, long)]
    message: Option<String>,
}

/// `due` command.
#[derive(Debug, Clone, Copy)]
pub struct Due;

impl Command for Due {
    fn names(&self) -> &'static [&'static str] {
        &["due", "d"]
    }

    fn description(&self) -> &'static str {
        "days since last backup"
    }

    fn usage(&self) -> &'static str {
        USAGE
    }

    fn requires_exclusivity(&self) -> bool {
        false
    }

    fn run(&self, inv: &Invocation<'_>) -> Result<()> {
        let args: DueArgs = inv.parse_args()?;
        let ctx = inv.context()?;
        let incremental = read_stamp(ctx.lastbackup_incr())?;
        let full = read_stamp(ctx.lastbackup_full())?;
        for line in messages(&args, Utc::now(), incremental, full)? {
            inv.log.output(&line);
        }
        Ok(())
    }
}

/// Stand-in date for a backup that never happened.
fn never() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1956, 1, 5)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or_default()
}

fn read_stamp(path: &Path) -> Result<DateTime<Utc>, EmbalmError> {
    match fs::read_to_string(path) {
        Ok(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|d| d.with_timezone(&Utc))
            .map_err(|_| {
                EmbalmError::io(
                    path,
                    Error::new(ErrorKind::InvalidData, "date not given in ISO format"),
                )
            }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(never()),
        Err(e) => Err(EmbalmError::io(path, e)),
    }
}

fn messages(
    args: &DueArgs,
    now: DateTime<Utc>,
    incremental: DateTime<Utc>,
    full: DateTime<Utc>,
) -> Result<Vec<String>, ConfigError> {
    let template = args.message.as_deref();
    if args.inc_days.is_none() && args.full_days.is_none() {
        return Ok(vec![
            message(template, "full", now - full)?,
            message(template, "incremental", now - incremental)?,
        ]);
    }

    let mut lines = Vec::new();
    for (kind, date, limit) in [
        ("incremental", incremental, args.inc_days),
        ("full", full, args.full_days),
    ] {
        let age = now - date;
        if limit.is_some_and(|limit| days(age) > limit) {
            lines.push(message(template, kind, age)?);
        }
    }
    Ok(lines)
}

fn message(template: Option<&str>, kind: &str, age: TimeDelta) -> Result<String, ConfigError> {
    let Some(template) = template else {
        let mut kind = kind.to_string();
        if let Some(first) = kind.get_mut(..1) {
            first.make_ascii_uppercase();
        }
        return Ok(format!("{kind} backup was performed {} ago.", humanize(age)));
    };
    let names: Namespace = [
        ("days", format!("{:.1}", days(age))),
        ("elapsed", humanize(age)),
        ("kind", kind.to_string()),
    ]
    .into_iter()
    .collect();
    template::format_once(template, &names)
}

fn days(age: TimeDelta) -> f64 {
    age.to_std().unwrap_or_default().as_secs_f64() / SECONDS_PER_DAY
}

/// Describe a duration the way people say it: "19 hours", "a month".
fn humanize(age: TimeDelta) -> String {
    let seconds = age.num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    match seconds {
        s if s < 45 => "seconds".to_string(),
        s if s < 90 => "a minute".to_string(),
        _ if minutes < 45 => format!("{minutes} minutes"),
        _ if minutes < 90 => "an hour".to_string(),
        _ if hours < 24 => format!("{hours} hours"),
        _ if hours < 48 => "a day".to_string(),
        _ if days < 30 => format!("{days} days"),
        _ if days < 60 => "a month".to_string(),
        _ if days < 365 => format!("{} months", days / 30),
        _ if days < 730 => "a year".to_string(),
        _ => format!("{} years", days / 365),
    }
}
