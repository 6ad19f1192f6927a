//! VID/PID extraction from Windows device instance identifiers

use regex::Regex;
use std::sync::OnceLock;

/// Sentinel for a vendor or product id that could not be extracted
pub const UNKNOWN_ID: &str = "-";

// Matching identifiers look like:
// - "USB\VID_8087&PID_0025\7&2E104BF0&0&2"
// - "USB\VID_0403&PID_6001\A901O7VP"
fn instance_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"USB\\VID_(\w{4})&PID_(\w{4})").expect("instance id pattern is valid")
    })
}

/// Extract the `(vid, pid)` pair from a raw instance identifier
///
/// Falls back to [`UNKNOWN_ID`] for both ids when the input is absent,
/// blank, or does not contain the `VID_xxxx&PID_xxxx` markers.
pub fn extract_usb_ids(instance_id: Option<&str>) -> (String, String) {
    let unknown = || (UNKNOWN_ID.to_string(), UNKNOWN_ID.to_string());

    let Some(raw) = instance_id else {
        return unknown();
    };
    if raw.trim().is_empty() {
        return unknown();
    }
    match instance_id_regex().captures(raw) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_vid_and_pid() {
        let (vid, pid) = extract_usb_ids(Some(r"USB\VID_8087&PID_0025\7&2E104BF0&0&2"));
        assert_eq!(vid, "8087");
        assert_eq!(pid, "0025");
    }

    #[test]
    fn test_extracts_from_serial_style_suffix() {
        let (vid, pid) = extract_usb_ids(Some(r"USB\VID_0403&PID_6001\A901O7VP"));
        assert_eq!(vid, "0403");
        assert_eq!(pid, "6001");
    }

    #[test]
    fn test_no_match_yields_sentinels() {
        assert_eq!(
            extract_usb_ids(Some("SWD\\PRINTENUM\\{b4bdd828}")),
            ("-".to_string(), "-".to_string())
        );
    }

    #[test]
    fn test_blank_input_yields_sentinels() {
        assert_eq!(extract_usb_ids(None), ("-".to_string(), "-".to_string()));
        assert_eq!(
            extract_usb_ids(Some("")),
            ("-".to_string(), "-".to_string())
        );
        assert_eq!(
            extract_usb_ids(Some("   ")),
            ("-".to_string(), "-".to_string())
        );
    }

    #[test]
    fn test_tokens_must_be_exactly_four_chars() {
        // Five-character tokens still match on their first four characters,
        // but a truncated vendor token does not match at all.
        assert_eq!(
            extract_usb_ids(Some(r"USB\VID_808&PID_0025\x")),
            ("-".to_string(), "-".to_string())
        );
    }
}
