//! Wrapper around the usbipd-win command-line tool
//!
//! Tracks the lifecycle of USB devices shared from a Windows host into WSL
//! by driving the external `usbipd` tool and reconciling its reported state
//! after every mutating operation:
//! - Snapshot builder: parses `usbipd state` JSON into an ordered list of
//!   immutable device records with a derived connection state
//! - Transition controller: bind/unbind/attach/detach, each verified by
//!   re-querying state rather than trusting the tool's exit status
//!
//! All calls are blocking and stateless; interactive callers offload them
//! to a worker thread and serialize transitions themselves.

pub mod device;
pub mod error;
pub mod exec;
pub mod instance_id;
pub mod snapshot;
pub mod tool;

pub use device::{ConnectionState, DeviceIdentity, UsbDevice, derive_state};
pub use error::{Error, Result};
pub use exec::{CommandRunner, SystemRunner};
pub use instance_id::{UNKNOWN_ID, extract_usb_ids};
pub use tool::{PROGRAM, Usbipd};
