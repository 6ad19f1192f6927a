//! Wrapper error types

use thiserror::Error;

/// Errors surfaced by the usbipd wrapper
///
/// Transition verification failures are deliberately not represented here:
/// the command-then-verify protocol reports a plain boolean, matching the
/// all-or-nothing contract of the tool itself.
#[derive(Debug, Error)]
pub enum Error {
    /// The usbipd executable could not be located on this system
    #[error("usbipd is not available on this system")]
    ToolUnavailable,

    /// The tool could not be started, or produced no output
    #[error("usbipd {subcommand} produced no output")]
    CommandFailed { subcommand: String },

    /// The state dump was not valid JSON or lacked a required key
    #[error("invalid state output: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A bus id did not parse as a dotted decimal during snapshot ordering
    ///
    /// This indicates malformed tool output and is never swallowed.
    #[error("malformed bus id in state output: {bus_id:?}")]
    InvalidBusId { bus_id: String },
}

/// Type alias for wrapper results
pub type Result<T> = std::result::Result<T, Error>;
