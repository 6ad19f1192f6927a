//! Blocking external command execution
//!
//! The wrapper drives short-lived administrative commands, so this primitive
//! is deliberately minimal: spawn, wait for exit, capture stdout. No retry,
//! no timeout, no streaming. A hung tool hangs the caller; interactive hosts
//! are expected to run these calls on a worker thread.

use std::process::Command;
use tracing::debug;

/// Platform executable locator used by the presence probe
#[cfg(windows)]
pub const LOCATOR: &str = "where";
#[cfg(not(windows))]
pub const LOCATOR: &str = "which";

/// Seam for issuing external commands
///
/// The production implementation is [`SystemRunner`]; tests substitute
/// scripted runners to exercise the wrapper without the real tool.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and return its captured stdout
    ///
    /// Blocks until the process exits. Stderr is captured and discarded.
    /// Any failure to start or await the process yields `None`; a non-zero
    /// exit status does not (the caller verifies outcomes by re-querying
    /// state, not by trusting exit codes).
    fn output(&self, program: &str, args: &[&str]) -> Option<String>;
}

/// [`CommandRunner`] backed by [`std::process::Command`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn output(&self, program: &str, args: &[&str]) -> Option<String> {
        match Command::new(program).args(args).output() {
            Ok(out) => Some(String::from_utf8_lossy(&out.stdout).into_owned()),
            Err(e) => {
                debug!("failed to run {} {}: {}", program, args.join(" "), e);
                None
            }
        }
    }
}

/// Probe for `program` via the platform executable locator
///
/// Blank locator output means the program is absent. Absence is treated as
/// permanent for the lifetime of whatever wrapper is being constructed.
pub fn locate(runner: &dyn CommandRunner, program: &str) -> bool {
    runner
        .output(LOCATOR, &[program])
        .is_some_and(|out| !out.trim().is_empty())
}
