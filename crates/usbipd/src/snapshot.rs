//! State dump parsing and snapshot ordering
//!
//! `usbipd state` emits a JSON document with a top-level `Devices` array.
//! Each entry is turned into one [`UsbDevice`] and the result is ordered by
//! physical bus position rather than lexical bus id.

use crate::device::UsbDevice;
use crate::error::{Error, Result};
use crate::instance_id::extract_usb_ids;
use serde::{Deserialize, Deserializer};

/// Raw state dump document
///
/// All keys are case-sensitive and required; string values other than
/// `InstanceId` and `Description` may be null. A missing key fails the
/// whole parse rather than yielding a partial device.
#[derive(Debug, Deserialize)]
struct StateDump {
    #[serde(rename = "Devices")]
    devices: Vec<RawDevice>,
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    #[serde(rename = "InstanceId", deserialize_with = "required_nullable")]
    instance_id: Option<String>,
    #[serde(rename = "BusId", deserialize_with = "required_nullable")]
    bus_id: Option<String>,
    #[serde(rename = "ClientIPAddress", deserialize_with = "required_nullable")]
    client_ip_address: Option<String>,
    #[serde(rename = "Description", deserialize_with = "required_nullable")]
    description: Option<String>,
    #[serde(rename = "IsForced")]
    is_forced: bool,
    #[serde(rename = "PersistedGuid", deserialize_with = "required_nullable")]
    persisted_guid: Option<String>,
    #[serde(rename = "StubInstanceId", deserialize_with = "required_nullable")]
    stub_instance_id: Option<String>,
}

// Serde defaults absent Option fields to None; routing them through an
// explicit deserializer makes the key itself mandatory while keeping the
// value nullable.
fn required_nullable<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

/// Parse a `usbipd state` dump into an ordered device list
///
/// Devices are sorted ascending by bus id read as a dotted decimal (the
/// `-` separator stands in for a decimal point, so `2-1` orders as 2.1 and
/// `10-2` after it). A blank or missing bus id orders as 0. A bus id that
/// is not numeric after substitution is malformed tool output and surfaces
/// as [`Error::InvalidBusId`].
pub fn parse_state(json: &str) -> Result<Vec<UsbDevice>> {
    let dump: StateDump = serde_json::from_str(json)?;

    let mut keyed = dump
        .devices
        .into_iter()
        .map(|raw| {
            let (vid, pid) = extract_usb_ids(raw.instance_id.as_deref());
            let device = UsbDevice::new(
                raw.bus_id,
                raw.client_ip_address,
                raw.description,
                vid,
                pid,
                raw.is_forced,
                raw.persisted_guid,
                raw.stub_instance_id,
            );
            Ok((bus_sort_key(device.bus_id())?, device))
        })
        .collect::<Result<Vec<_>>>()?;

    // Stable sort keeps dump order for equal keys (e.g. "2-1" vs "2-10",
    // which both read as 2.1 in single precision).
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    Ok(keyed.into_iter().map(|(_, device)| device).collect())
}

fn bus_sort_key(bus_id: Option<&str>) -> Result<f32> {
    let raw = bus_id.unwrap_or("").trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.replace('-', ".")
        .parse::<f32>()
        .map_err(|_| Error::InvalidBusId {
            bus_id: raw.to_string(),
        })
}
