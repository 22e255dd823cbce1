//! Logging infrastructure for console output and the per-run log file.

mod logger;
mod sink;
mod subscriber;
mod utils;

pub use logger::{Captured, Logger};
pub use sink::LogSink;
pub use subscriber::init_subscriber;
