//! Ctrl-C handling.
//!
//! The handler only records that an interrupt happened. The foreground child
//! process receives the same signal from the terminal; once it returns, the
//! executor reports [`EmbalmError::Interrupted`] and the error unwinds through
//! the execution context, which releases the lock on the way out.
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::EmbalmError;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the process-wide Ctrl-C handler.
///
/// # Errors
///
/// Returns an error if a handler is already installed.
pub fn install_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(mark)
}

/// Record an interruption.
pub fn mark() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Whether the user has pressed Ctrl-C.
#[must_use]
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Fail with [`EmbalmError::Interrupted`] if the user has pressed Ctrl-C.
///
/// Called between steps of multi-step commands.
///
/// # Errors
///
/// Returns [`EmbalmError::Interrupted`] after an interruption.
pub fn check() -> Result<(), EmbalmError> {
    if is_interrupted() {
        Err(EmbalmError::Interrupted)
    } else {
        Ok(())
    }
}
