//! Operator-facing progress messages.
//!
//! Progress goes to stderr one line at a time so that it interleaves
//! sensibly with the build toolchain's own output. Diagnostics belong in
//! `log`; this module is for the short status lines an operator watches.

use crate::build::BuildDuration;
use camino::Utf8Path;
use std::fmt::Display;
use std::io::Write;

/// Write `message` and a newline to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Announce that the local build is current.
#[must_use]
pub fn up_to_date_message(version: u64) -> String {
    format!("Already at latest version ({version})!")
}

/// Announce the version about to be built.
///
/// # Examples
///
/// ```
/// use relbuild_agent::output::updating_message;
///
/// assert_eq!(updating_message(42, None), "Updating to 42...");
/// assert_eq!(updating_message(42, Some(40)), "Updating to 42 from 40...");
/// ```
#[must_use]
pub fn updating_message(version: u64, previous: Option<u64>) -> String {
    match previous {
        Some(previous) => format!("Updating to {version} from {previous}..."),
        None => format!("Updating to {version}..."),
    }
}

/// Report a successful build and how long it took.
#[must_use]
pub fn build_success_message(elapsed: BuildDuration) -> String {
    format!("Build successful! It took a solid {elapsed}")
}

/// Final line of a committed run.
#[must_use]
pub fn finished_message(output_dir: &Utf8Path) -> String {
    format!("Build finished, see {output_dir} for the binaries!")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut sink = Vec::new();
        write_stderr_line(&mut sink, "Extracting...");
        assert_eq!(sink, b"Extracting...\n");
    }

    #[test]
    fn build_success_message_includes_duration() {
        let msg = build_success_message(BuildDuration::from(Duration::from_secs(3_661)));
        assert_eq!(msg, "Build successful! It took a solid 1H:1M:1S");
    }

    #[test]
    fn finished_message_names_output_dir() {
        let msg = finished_message(Utf8Path::new("/srv/agent/build"));
        assert!(msg.contains("/srv/agent/build"));
    }

    #[test]
    fn up_to_date_message_names_version() {
        assert_eq!(up_to_date_message(10), "Already at latest version (10)!");
    }
}
