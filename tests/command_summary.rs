#![allow(clippy::unwrap_used)]
//! Snapshot of the command summary shown by `embalm help` and `embalm --help`.

use embalm::commands::Registry;
use embalm::commands::help::summarize_topics;

/// Any added, removed or renamed command or alias changes this snapshot.
#[test]
fn command_summary() {
    insta::assert_snapshot!("summary", Registry::new().summarize());
}

#[test]
fn topic_summary() {
    insta::assert_snapshot!("topics", summarize_topics());
}
