//! Running external programs.
//!
//! Commands never spawn processes directly; they go through an [`Executor`]
//! so tests can substitute a recording stub. [`SystemExecutor`] is the real
//! implementation.
use anyhow::Result;
use std::io::Write as _;
use std::process::{Command, Output, Stdio};

use crate::error::EmbalmError;
use crate::interrupt;

/// Result of a command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Captured standard output (empty when output was passed through).
    pub stdout: String,
    /// Captured standard error (empty when output was passed through).
    pub stderr: String,
    /// Whether the program exited successfully.
    pub success: bool,
    /// Exit code, if the program exited normally.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Abstraction over process execution.
///
/// Every `run*` method fails with [`EmbalmError::Tool`] when the program
/// exits non-zero, and with [`EmbalmError::Interrupted`] when the user
/// pressed Ctrl-C while it was running.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a program and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started, fails or is interrupted.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a program with extra environment variables, passing its output
    /// through to the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started, fails or is interrupted.
    fn run_with_env(&self, program: &str, args: &[&str], env: &[(&str, &str)])
    -> Result<ExecResult>;

    /// Run a program feeding `input` on its standard input.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started, fails or is interrupted.
    fn run_with_input(&self, program: &str, args: &[&str], input: &str) -> Result<ExecResult>;

    /// Run a command line through `sh -c`, passing output through.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell cannot be started, the command fails or
    /// is interrupted.
    fn run_shell(&self, command: &str) -> Result<ExecResult>;

    /// Check whether a program is available on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// [`Executor`] that runs real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        execute_checked(cmd, program)
    }

    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        tracing::debug!("running: {program} {}", args.join(" "));
        let mut cmd = Command::new(program);
        cmd.args(args);
        for (k, v) in env {
            cmd.env(k, v);
        }
        let status = cmd.status().map_err(|e| spawn_error(program, &e))?;
        check(
            program,
            ExecResult {
                success: status.success(),
                code: status.code(),
                ..ExecResult::default()
            },
        )
    }

    fn run_with_input(&self, program: &str, args: &[&str], input: &str) -> Result<ExecResult> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(program, &e))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .map_err(|e| spawn_error(program, &e))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| spawn_error(program, &e))?;
        check(program, ExecResult::from(output))
    }

    fn run_shell(&self, command: &str) -> Result<ExecResult> {
        tracing::debug!("running: {command}");
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .map_err(|e| spawn_error("sh", &e))?;
        check(
            command,
            ExecResult {
                success: status.success(),
                code: status.code(),
                ..ExecResult::default()
            },
        )
    }

    fn which(&self, program: &str) -> bool {
        which(program)
    }
}

/// Execute a command and return the result, bailing on non-zero exit.
fn execute_checked(mut cmd: Command, label: &str) -> Result<ExecResult> {
    let output = cmd.output().map_err(|e| spawn_error(label, &e))?;
    check(label, ExecResult::from(output))
}

/// Turn an exit status into an error; interruption takes precedence.
fn check(label: &str, result: ExecResult) -> Result<ExecResult> {
    if interrupt::is_interrupted() {
        return Err(EmbalmError::Interrupted.into());
    }
    if !result.success {
        let reason = match (result.code, result.stderr.trim()) {
            (Some(code), "") => format!("exited with status {code}"),
            (Some(code), stderr) => format!("exited with status {code}: {stderr}"),
            (None, _) => "terminated by signal".to_string(),
        };
        return Err(EmbalmError::Tool {
            program: label.to_string(),
            reason,
        }
        .into());
    }
    Ok(result)
}

fn spawn_error(program: &str, e: &std::io::Error) -> anyhow::Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        EmbalmError::ToolMissing(program.to_string()).into()
    } else {
        EmbalmError::Tool {
            program: program.to_string(),
            reason: e.to_string(),
        }
        .into()
    }
}

/// Run a command and return its output. Fails if the command exits non-zero.
///
/// # Errors
///
/// Returns an error if the program cannot be started or exits non-zero.
pub fn run(program: &str, args: &[&str]) -> Result<ExecResult> {
    SystemExecutor.run(program, args)
}

/// Check if a program is available on PATH.
#[must_use]
pub fn which(program: &str) -> bool {
    ::which::which(program).is_ok()
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::exit_code_for;

    #[test]
    fn run_echo() {
        let result = run("echo", &["hello"]).unwrap();
        assert!(result.success, "echo command should succeed");
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn run_failure_is_a_tool_error() {
        let err = run("false", &[]).unwrap_err();
        assert_eq!(exit_code_for(&err), crate::error::exit_code::SOFTWARE);
    }

    #[test]
    fn missing_program_is_reported() {
        let err = run("this-program-does-not-exist-12345", &[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EmbalmError>(),
            Some(EmbalmError::ToolMissing(_))
        ));
    }

    #[test]
    fn input_is_fed_to_stdin() {
        let result = SystemExecutor.run_with_input("cat", &[], "body").unwrap();
        assert_eq!(result.stdout, "body");
    }

    #[test]
    fn shell_status_is_checked() {
        assert!(SystemExecutor.run_shell("true").is_ok());
        assert!(SystemExecutor.run_shell("exit 3").is_err());
    }

    #[test]
    fn env_is_passed_to_child() {
        let result = SystemExecutor.run_with_env("sh", &["-c", "test \"$X\" = y"], &[("X", "y")]);
        assert!(result.is_ok());
    }

    #[test]
    fn which_finds_known_program() {
        assert!(which("sh"), "sh should be found on Unix");
    }

    #[test]
    fn which_missing_program() {
        assert!(
            !which("this-program-does-not-exist-12345"),
            "non-existent program should not be found"
        );
    }
}
