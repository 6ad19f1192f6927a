//! usbipd-win wrapper and transition controller
//!
//! [`Usbipd`] is a handle on a detected usbipd-win installation. It offers
//! the snapshot query plus the four state transitions (bind, unbind,
//! attach, detach), each following the same command-then-verify protocol:
//! issue the mutating command, then re-query the full state dump and check
//! the target device's bits instead of trusting the tool's exit status.
//!
//! The wrapper holds no mutable state; every query and transition stands
//! alone. Concurrent transitions against the same device race on bus id
//! matching (the tool offers no transactional identifier) and must be
//! serialized by the caller.

use crate::device::{ConnectionState, UsbDevice};
use crate::error::{Error, Result};
use crate::exec::{self, CommandRunner, SystemRunner};
use crate::snapshot;
use tracing::{debug, warn};

/// Fixed name of the external tool
pub const PROGRAM: &str = "usbipd";

/// Handle on a detected usbipd-win installation
pub struct Usbipd {
    program: String,
    version: String,
    runner: Box<dyn CommandRunner>,
}

impl std::fmt::Debug for Usbipd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Usbipd")
            .field("program", &self.program)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Usbipd {
    /// Detect the tool on this system
    ///
    /// Returns `None` when the executable cannot be located or the version
    /// query produces no output. Absence is permanent for the lifetime of
    /// the process; callers should not re-probe in a loop.
    pub fn detect() -> Option<Self> {
        Self::detect_with(PROGRAM.to_string(), Box::new(SystemRunner))
    }

    /// Detect a specific program name through a specific runner
    ///
    /// Used by the CLI to honor a configured executable override and by
    /// tests to substitute scripted runners.
    pub fn detect_with(program: String, runner: Box<dyn CommandRunner>) -> Option<Self> {
        if !exec::locate(runner.as_ref(), &program) {
            debug!("{program} not found by {}", exec::LOCATOR);
            return None;
        }
        let version = runner.output(&program, &["--version"])?;
        let version = version.trim().to_string();
        if version.is_empty() {
            return None;
        }
        Some(Self {
            program,
            version,
            runner,
        })
    }

    /// Version string reported by `usbipd --version` at detection time
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Query the current device list, distinguishing failures from an
    /// empty list
    ///
    /// [`Error::CommandFailed`] means the tool could not be run or printed
    /// nothing; [`Error::InvalidJson`] means it printed something that is
    /// not a valid state dump.
    pub fn snapshot(&self) -> Result<Vec<UsbDevice>> {
        let output = self
            .runner
            .output(&self.program, &["state"])
            .ok_or_else(|| Error::CommandFailed {
                subcommand: "state".to_string(),
            })?;
        if output.trim().is_empty() {
            return Err(Error::CommandFailed {
                subcommand: "state".to_string(),
            });
        }
        snapshot::parse_state(&output)
    }

    /// Fail-soft device list
    ///
    /// Command and parse failures collapse to an empty list, so "query
    /// failed" and "no devices" look alike here; use [`Usbipd::snapshot`]
    /// to tell them apart. The one exception is a malformed bus id, which
    /// indicates corrupt tool output and propagates as
    /// [`Error::InvalidBusId`].
    pub fn devices(&self) -> Result<Vec<UsbDevice>> {
        match self.snapshot() {
            Ok(devices) => Ok(devices),
            Err(err @ Error::InvalidBusId { .. }) => Err(err),
            Err(err) => {
                debug!("state query failed, treating as empty: {err}");
                Ok(Vec::new())
            }
        }
    }

    /// Share a device (forced bind), verifying `SHARED` becomes set
    pub fn bind(&self, device: &UsbDevice) -> bool {
        let bus_id = device.bus_id().unwrap_or("");
        self.transition(&["bind", "-f", "-b", bus_id], device, |state| {
            state.contains(ConnectionState::SHARED)
        })
    }

    /// Stop sharing a device, verifying `SHARED` becomes cleared
    pub fn unbind(&self, device: &UsbDevice) -> bool {
        let bus_id = device.bus_id().unwrap_or("");
        self.transition(&["unbind", "-b", bus_id], device, |state| {
            !state.contains(ConnectionState::SHARED)
        })
    }

    /// Attach a shared device into WSL, verifying `ATTACHED` becomes set
    pub fn attach(&self, device: &UsbDevice) -> bool {
        let bus_id = device.bus_id().unwrap_or("");
        self.transition(&["attach", "--wsl", "-b", bus_id], device, |state| {
            state.contains(ConnectionState::ATTACHED)
        })
    }

    /// Detach a device from WSL
    ///
    /// Detach ends the guest session but leaves the host share in place,
    /// so success is verified by `SHARED` remaining set, not by `ATTACHED`
    /// clearing.
    pub fn detach(&self, device: &UsbDevice) -> bool {
        let bus_id = device.bus_id().unwrap_or("");
        self.transition(&["detach", "-b", bus_id], device, |state| {
            state.contains(ConnectionState::SHARED)
        })
    }

    /// Command-then-verify protocol shared by the four transitions
    ///
    /// A single attempt, no retry: command failure, a failed re-query, an
    /// absent target bus id, or an unsatisfied post-condition all report
    /// plain failure. If the bus id was re-enumerated by a different device
    /// between the command and the re-query, the check matches the wrong
    /// record; accepted limitation, see the module docs.
    fn transition(
        &self,
        args: &[&str],
        device: &UsbDevice,
        post_condition: fn(ConnectionState) -> bool,
    ) -> bool {
        debug!("{} {}", self.program, args.join(" "));
        if self.runner.output(&self.program, args).is_none() {
            warn!("{} {} failed to run", self.program, args[0]);
            return false;
        }

        let updated = match self.devices() {
            Ok(devices) => devices,
            Err(err) => {
                warn!("post-transition state query failed: {err}");
                return false;
            }
        };
        if updated.is_empty() {
            return false;
        }

        updated
            .iter()
            .any(|dev| dev.bus_id() == device.bus_id() && post_condition(dev.state()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Runner that answers a fixed set of command lines and records calls
    #[derive(Default)]
    struct FixedRunner {
        responses: Vec<(String, Option<String>)>,
        calls: Mutex<Vec<String>>,
    }

    impl FixedRunner {
        fn with(mut self, command_line: &str, response: Option<&str>) -> Self {
            self.responses
                .push((command_line.to_string(), response.map(String::from)));
            self
        }
    }

    impl CommandRunner for FixedRunner {
        fn output(&self, program: &str, args: &[&str]) -> Option<String> {
            let line = format!("{program} {}", args.join(" "));
            self.calls.lock().unwrap().push(line.clone());
            self.responses
                .iter()
                .find(|(cmd, _)| *cmd == line)
                .and_then(|(_, resp)| resp.clone())
        }
    }

    fn probe_line() -> String {
        format!("{} usbipd", exec::LOCATOR)
    }

    #[test]
    fn test_detect_captures_version() {
        let runner = FixedRunner::default()
            .with(&probe_line(), Some("C:\\usbipd\\usbipd.exe\n"))
            .with("usbipd --version", Some("4.3.0\n"));

        let tool = Usbipd::detect_with("usbipd".into(), Box::new(runner)).unwrap();
        assert_eq!(tool.version(), "4.3.0");
    }

    #[test]
    fn test_detect_fails_when_probe_is_blank() {
        let runner = FixedRunner::default().with(&probe_line(), Some(""));
        assert!(Usbipd::detect_with("usbipd".into(), Box::new(runner)).is_none());
    }

    #[test]
    fn test_detect_fails_when_version_query_fails() {
        let runner = FixedRunner::default()
            .with(&probe_line(), Some("C:\\usbipd\\usbipd.exe\n"))
            .with("usbipd --version", None);
        assert!(Usbipd::detect_with("usbipd".into(), Box::new(runner)).is_none());
    }

    #[test]
    fn test_detect_fails_when_version_is_blank() {
        let runner = FixedRunner::default()
            .with(&probe_line(), Some("C:\\usbipd\\usbipd.exe\n"))
            .with("usbipd --version", Some("\n"));
        assert!(Usbipd::detect_with("usbipd".into(), Box::new(runner)).is_none());
    }

    #[test]
    fn test_snapshot_distinguishes_failure_from_empty() {
        let runner = FixedRunner::default()
            .with(&probe_line(), Some("/usr/bin/usbipd\n"))
            .with("usbipd --version", Some("4.3.0"))
            .with("usbipd state", Some(r#"{ "Devices": [] }"#));

        let tool = Usbipd::detect_with("usbipd".into(), Box::new(runner)).unwrap();
        assert!(tool.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_devices_swallows_malformed_json() {
        let runner = FixedRunner::default()
            .with(&probe_line(), Some("/usr/bin/usbipd\n"))
            .with("usbipd --version", Some("4.3.0"))
            .with("usbipd state", Some("not json"));

        let tool = Usbipd::detect_with("usbipd".into(), Box::new(runner)).unwrap();
        assert!(matches!(tool.snapshot(), Err(Error::InvalidJson(_))));
        assert!(tool.devices().unwrap().is_empty());
    }

    #[test]
    fn test_devices_propagates_malformed_bus_id() {
        let json = r#"{
            "Devices": [{
                "InstanceId": null,
                "BusId": "bogus",
                "ClientIPAddress": null,
                "Description": null,
                "IsForced": false,
                "PersistedGuid": null,
                "StubInstanceId": null
            }]
        }"#;
        let runner = FixedRunner::default()
            .with(&probe_line(), Some("/usr/bin/usbipd\n"))
            .with("usbipd --version", Some("4.3.0"))
            .with("usbipd state", Some(json));

        let tool = Usbipd::detect_with("usbipd".into(), Box::new(runner)).unwrap();
        assert!(matches!(
            tool.devices(),
            Err(Error::InvalidBusId { .. })
        ));
    }
}
