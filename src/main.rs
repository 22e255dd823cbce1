//! `embalm` command-line entry point.
use clap::{CommandFactory, FromArgMatches};

use embalm::cli::Cli;
use embalm::commands::Registry;
use embalm::config::Environment;
use embalm::error::{exit_code, exit_code_for, full_stop, is_interrupted};
use embalm::exec::SystemExecutor;
use embalm::logging::{LogSink, Logger, init_subscriber};
use embalm::{app, interrupt};

fn main() {
    let _ = enable_ansi_support::enable_ansi_support();

    let matches = Cli::command()
        .after_help(app::help_epilogue(&Registry::new()))
        .get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let sink = LogSink::new();
    init_subscriber(cli.global.narrate, &sink);
    if let Err(e) = interrupt::install_handler() {
        tracing::warn!("cannot catch interrupts: {e}");
    }

    let log = Logger::new();
    let env = Environment::detect();
    let code = match app::run(&cli, &env, &SystemExecutor, &log, &sink) {
        Ok(()) => exit_code::OK,
        Err(e) if is_interrupted(&e) => {
            log.output("Terminated by user.");
            exit_code::OK
        }
        Err(e) => {
            log.error(&full_stop(&format!("{e:#}")));
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
