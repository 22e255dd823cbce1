// Shared helpers for integration tests.
//
// Provides a temporary settings directory and data directory, a recording
// executor standing in for Duplicity and friends, and a runner that drives
// the whole dispatch path the way `main` does.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use clap::Parser;
use embalm::app;
use embalm::cli::Cli;
use embalm::config::{Environment, Identity};
use embalm::error::EmbalmError;
use embalm::exec::{ExecResult, Executor};
use embalm::logging::{LogSink, Logger};

/// `app::run` changes the working directory; tests in one binary take turns.
static CWD: Mutex<()> = Mutex::new(());

/// Root settings for a single configuration named `home`.
pub const SOLE_CONFIG: &str = r#"
configuration_files = "home"
dest_server = "backups.example.com"
dest_dir = "{host_name}/{config_name}"
ssh_backend_method = "option"
gpg_passphrase = "secret"
"#;

/// One recorded process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Call {
    /// Program name (`sh` for shell commands).
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
}

/// Executor that records calls and can be told to fail or report an interrupt.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<Call>>,
    fail: bool,
    interrupt: bool,
}

impl RecordingExecutor {
    /// Every call fails with a tool error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every call reports that the user pressed Ctrl-C.
    pub fn interrupting() -> Self {
        Self {
            interrupt: true,
            ..Self::default()
        }
    }

    /// Everything recorded so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Calls to one program.
    pub fn calls_to(&self, program: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.program == program).collect()
    }

    fn record(&self, program: &str, args: &[&str], env: &[(&str, &str)]) -> anyhow::Result<ExecResult> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Call {
                program: program.to_string(),
                args: args.iter().map(ToString::to_string).collect(),
                env: env
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            });
        if self.interrupt {
            return Err(EmbalmError::Interrupted.into());
        }
        if self.fail {
            return Err(EmbalmError::Tool {
                program: program.to_string(),
                reason: "exited with status 1".to_string(),
            }
            .into());
        }
        Ok(ExecResult {
            success: true,
            code: Some(0),
            ..ExecResult::default()
        })
    }
}

impl Executor for RecordingExecutor {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.record(program, args, &[])
    }

    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> anyhow::Result<ExecResult> {
        self.record(program, args, env)
    }

    fn run_with_input(&self, program: &str, args: &[&str], _input: &str) -> anyhow::Result<ExecResult> {
        self.record(program, args, &[])
    }

    fn run_shell(&self, command: &str) -> anyhow::Result<ExecResult> {
        self.record("sh", &["-c", command], &[])
    }

    fn which(&self, _program: &str) -> bool {
        true
    }
}

/// An isolated settings directory and data directory backed by a
/// [`tempfile::TempDir`].
pub struct TestEnv {
    /// Temporary directory holding `config/` and `data/`.
    pub root: tempfile::TempDir,
    /// Environment pointing at the temporary directories.
    pub env: Environment,
    _cwd: MutexGuard<'static, ()>,
}

impl TestEnv {
    /// Create empty settings and data directories.
    pub fn new() -> Self {
        let cwd = CWD.lock().unwrap_or_else(PoisonError::into_inner);
        let root = tempfile::tempdir().expect("create temp dir");
        let config_dir = root.path().join("config");
        let data_dir = root.path().join("data");
        std::fs::create_dir_all(&config_dir).expect("create config dir");
        let env = Environment::new(config_dir, data_dir, Identity::new("earth", "ken"));
        Self {
            root,
            env,
            _cwd: cwd,
        }
    }

    /// Environment with the sole configuration `home` backing up `src/`.
    pub fn with_sole_config() -> Self {
        let test_env = Self::new();
        test_env.write_settings(SOLE_CONFIG);
        let src = test_env.src_dir();
        std::fs::create_dir_all(&src).expect("create src dir");
        test_env.write_config("home", &format!("src_dir = {:?}\n", src.display().to_string()));
        test_env
    }

    /// Write the root `settings.toml`.
    pub fn write_settings(&self, content: &str) {
        self.write_config("settings", content);
    }

    /// Write `<name>.toml` into the settings directory.
    pub fn write_config(&self, name: &str, content: &str) {
        let path = self.env.config_dir.join(format!("{name}.toml"));
        std::fs::write(path, content).expect("write settings file");
    }

    /// Directory being backed up.
    pub fn src_dir(&self) -> PathBuf {
        self.root.path().join("src")
    }

    /// Default working directory of configuration `name`.
    pub fn working_dir(&self, name: &str) -> PathBuf {
        self.env.data_dir.join(name)
    }

    /// Path of the settings directory.
    pub fn config_dir(&self) -> &Path {
        &self.env.config_dir
    }

    /// Run `embalm <argv>` and return the result plus the command output.
    pub fn run(&self, argv: &[&str], executor: &RecordingExecutor) -> (anyhow::Result<()>, String) {
        let cli = Cli::try_parse_from(std::iter::once("embalm").chain(argv.iter().copied()))
            .expect("parse command line");
        let (log, captured) = Logger::capturing();
        let result = app::run(&cli, &self.env, executor, &log, &LogSink::new());
        (result, captured.contents())
    }
}
