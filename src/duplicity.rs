//! Building and running Duplicity command lines.
//!
//! Every command that talks to the backup server shares the same option
//! blocks: common options, archive options, the SFTP command and the
//! destination URL. The GPG passphrase is handed over in the `PASSPHRASE`
//! environment variable, never on the command line.
use std::fs;
use std::io::ErrorKind;

use crate::cli::GlobalOpts;
use crate::config::SSH_BACKEND_SETTING;
use crate::config::locations::{absolute, expand_tilde};
use crate::config::validation::SSH_BACKEND_METHODS;
use crate::context::ExecutionContext;
use crate::error::{ConfigError, EmbalmError, full_stop};
use crate::exec::Executor;
use crate::notify;

/// Program name of Duplicity.
pub const DUPLICITY: &str = "duplicity";
/// Duplicity's own log, relative to the working directory.
pub const DUPLICITY_LOG_FILE: &str = "duplicity.log";
/// Environment variables whose absence suggests ssh-agent is not running.
const SSH_AGENT_VARS: &[&str] = &["SSH_AGENT_PID", "SSH_AUTH_SOCK"];

/// How Duplicity reaches the SFTP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshBackend {
    /// Plain `sftp://` URL, pexpect selected with `--ssh-backend`.
    Option,
    /// `pexpect+sftp://` URL.
    Protocol,
}

impl SshBackend {
    /// URL scheme for this backend.
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Option => "sftp",
            Self::Protocol => "pexpect+sftp",
        }
    }
}

impl std::str::FromStr for SshBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "option" => Ok(Self::Option),
            "protocol" => Ok(Self::Protocol),
            other => Err(ConfigError::InvalidValue {
                key: SSH_BACKEND_SETTING.to_string(),
                value: other.to_string(),
                expected: SSH_BACKEND_METHODS.join(", "),
            }),
        }
    }
}

/// Duplicity invocations for one execution context.
#[derive(Debug)]
pub struct Duplicity<'a> {
    ctx: &'a ExecutionContext,
    options: &'a GlobalOpts,
    executor: &'a dyn Executor,
}

impl<'a> Duplicity<'a> {
    /// Create a Duplicity runner.
    pub const fn new(
        ctx: &'a ExecutionContext,
        options: &'a GlobalOpts,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            ctx,
            options,
            executor,
        }
    }

    fn backend(&self) -> Result<SshBackend, ConfigError> {
        self.ctx
            .settings()
            .require_value(SSH_BACKEND_SETTING)?
            .parse()
    }

    /// Options shared by every Duplicity command.
    ///
    /// # Errors
    ///
    /// Returns a settings error if `gpg_binary` or `ssh_backend_method` cannot be resolved.
    pub fn common_options(&self) -> Result<Vec<String>, ConfigError> {
        let mut args = Vec::new();
        if let Some(gpg) = self.ctx.settings().value("gpg_binary")? {
            args.push("--gpg-binary".to_string());
            args.push(expand_tilde(&gpg).display().to_string());
        }
        args.push("--log-file".to_string());
        args.push(DUPLICITY_LOG_FILE.to_string());
        if self.backend()? == SshBackend::Option {
            args.push("--ssh-backend".to_string());
            args.push("pexpect".to_string());
        }
        args.push(if self.options.verbose { "-v9" } else { "-v8" }.to_string());
        if self.options.trial_run {
            args.push("--dry-run".to_string());
        }
        Ok(args)
    }

    /// `--archive-dir` and `--name` options.
    #[must_use]
    pub fn archive_options(&self) -> Vec<String> {
        vec![
            "--archive-dir".to_string(),
            self.ctx.archive_dir().display().to_string(),
            "--name".to_string(),
            self.ctx.settings().config_name().to_string(),
        ]
    }

    /// `--sftp-command` option carrying the identity file and bandwidth limit.
    ///
    /// # Errors
    ///
    /// Returns a settings error if `ssh_identity` or `bw_limit` cannot be resolved.
    pub fn sftp_options(&self) -> Result<Vec<String>, ConfigError> {
        // no -v here, it confuses pexpect
        let mut command = vec!["sftp".to_string()];
        if let Some(identity) = self.ctx.settings().value("ssh_identity")? {
            command.push("-i".to_string());
            command.push(expand_tilde(&identity).display().to_string());
        }
        if let Some(limit) = self.ctx.settings().value("bw_limit")? {
            command.push("-l".to_string());
            command.push(limit);
        }
        Ok(vec!["--sftp-command".to_string(), command.join(" ")])
    }

    /// One `--exclude` option per entry of `excludes`.
    ///
    /// Relative entries are taken from the starting directory, like
    /// `working_dir` and `src_dir`; Duplicity itself runs in the working
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns a settings error if an entry cannot be resolved.
    pub fn excludes(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self
            .ctx
            .settings()
            .values("excludes")?
            .iter()
            .flat_map(|each| {
                [
                    "--exclude".to_string(),
                    absolute(each, self.ctx.starting_dir())
                        .display()
                        .to_string(),
                ]
            })
            .collect())
    }

    /// Destination URL, `<scheme>://<dest_server>/<dest_dir>`.
    ///
    /// # Errors
    ///
    /// Returns a settings error if `dest_server` or `ssh_backend_method` is unusable.
    pub fn destination(&self) -> Result<String, ConfigError> {
        let server = self.ctx.settings().require_value("dest_server")?;
        Ok(format!(
            "{}://{server}/{}",
            self.backend()?.scheme(),
            self.ctx.dest_dir()
        ))
    }

    /// The GPG passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingPassphrase`] if `gpg_passphrase` is not set.
    pub fn passphrase(&self) -> Result<String, ConfigError> {
        self.ctx
            .settings()
            .value("gpg_passphrase")?
            .ok_or(ConfigError::MissingPassphrase)
    }

    /// Run `duplicity <args>` with the passphrase in its environment.
    ///
    /// A missing passphrase is also sent to the configured notification
    /// channels. Missing ssh-agent variables only produce a warning.
    ///
    /// # Errors
    ///
    /// - [`EmbalmError::ToolMissing`] if Duplicity is not installed
    /// - [`ConfigError::MissingPassphrase`] if no passphrase is configured
    /// - [`EmbalmError::Tool`] or [`EmbalmError::Interrupted`] from the run itself
    pub fn run(&self, args: &[String]) -> anyhow::Result<()> {
        if !self.executor.which(DUPLICITY) {
            return Err(EmbalmError::ToolMissing(DUPLICITY.to_string()).into());
        }

        let passphrase = match self.passphrase() {
            Ok(p) => p,
            Err(e) => {
                let settings = self.ctx.settings();
                notify::report(
                    settings.mapping(),
                    settings.identity(),
                    &full_stop(&e.to_string()),
                    self.executor,
                );
                return Err(e.into());
            }
        };
        tracing::debug!("gpg passphrase is set");

        for var in SSH_AGENT_VARS {
            if std::env::var_os(var).is_none() {
                tracing::warn!("{var}: environment variable not found, is ssh-agent running?");
            }
        }

        self.remove_log()?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        tracing::debug!("running:\n    {DUPLICITY} {}", args.join(" "));
        self.executor
            .run_with_env(DUPLICITY, &args, &[("PASSPHRASE", passphrase.as_str())])?;
        Ok(())
    }

    /// Remove Duplicity's log from the previous run.
    fn remove_log(&self) -> Result<(), EmbalmError> {
        let path = self.ctx.working_dir().join(DUPLICITY_LOG_FILE);
        match fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(EmbalmError::io(path, e)),
            _ => Ok(()),
        }
    }
}
