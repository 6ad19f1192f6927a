//! Shared test support: a scripted command runner and state dump builders

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use usbipd::CommandRunner;

/// Scripted [`CommandRunner`] for driving the wrapper without a real tool
///
/// Responses are queued per command line so repeated invocations (for
/// example the state re-query after each transition) can answer
/// differently. Every invocation is recorded for assertions.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    responses: Mutex<HashMap<String, VecDeque<Option<String>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the exact command line `"program arg1 arg2"`
    pub fn enqueue(&self, command_line: &str, response: Option<&str>) {
        self.inner
            .responses
            .lock()
            .unwrap()
            .entry(command_line.to_string())
            .or_default()
            .push_back(response.map(String::from));
    }

    /// Command lines issued so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn output(&self, program: &str, args: &[&str]) -> Option<String> {
        let line = format!("{program} {}", args.join(" "));
        self.inner.calls.lock().unwrap().push(line.clone());
        self.inner
            .responses
            .lock()
            .unwrap()
            .get_mut(&line)
            .and_then(|queue| queue.pop_front())
            .flatten()
    }
}

/// Command line of the platform presence probe for `usbipd`
pub fn probe_line() -> String {
    format!("{} usbipd", usbipd::exec::LOCATOR)
}

/// Queue the probe and version answers that make detection succeed
pub fn script_detection(runner: &ScriptedRunner) {
    runner.enqueue(&probe_line(), Some("/usr/local/bin/usbipd\n"));
    runner.enqueue("usbipd --version", Some("4.3.0\n"));
}

/// One `Devices` entry for a state dump
pub fn device_entry(
    bus_id: Option<&str>,
    persisted_guid: Option<&str>,
    client_ip: Option<&str>,
) -> String {
    fn json_opt(value: Option<&str>) -> String {
        match value {
            Some(v) => format!("\"{v}\""),
            None => "null".to_string(),
        }
    }
    format!(
        r#"{{
            "InstanceId": "USB\\VID_8087&PID_0025\\7&2E104BF0&0&2",
            "BusId": {},
            "ClientIPAddress": {},
            "Description": "Test Device",
            "IsForced": false,
            "PersistedGuid": {},
            "StubInstanceId": null
        }}"#,
        json_opt(bus_id),
        json_opt(client_ip),
        json_opt(persisted_guid),
    )
}

/// A full state dump document from the given entries
pub fn state_dump(entries: &[String]) -> String {
    format!(r#"{{ "Devices": [{}] }}"#, entries.join(","))
}
