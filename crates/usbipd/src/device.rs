//! USB device records and connection state
//!
//! A [`UsbDevice`] is an immutable value object describing one device as
//! reported by a single `usbipd state` dump. Its [`ConnectionState`] is
//! derived from field presence at construction time and is never assigned
//! from anywhere else.

use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    /// Connection state of a shared USB device
    ///
    /// The three base flags combine freely; `UNKNOWN` (all bits set) is
    /// reserved for states that could not be determined.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConnectionState: u8 {
        /// Physically present on the host bus
        const CONNECTED = 0b0001;
        /// Bound to the usbipd stub driver, available for attachment
        const SHARED = 0b0010;
        /// Actively consumed by a guest client
        const ATTACHED = 0b0100;
        /// Reserved sentinel for an undeterminable state
        const UNKNOWN = 0b1111;
    }
}

impl ConnectionState {
    /// Device is not present and has never been shared
    pub const DISCONNECTED: Self = Self::empty();
    /// Device is unplugged but its share configuration is persisted
    pub const DISCONNECTED_PERSISTED: Self = Self::SHARED;
    /// Device is plugged in but not shared
    pub const CONNECTED_NOT_SHARED: Self = Self::CONNECTED;
    /// Device is plugged in and shared, with no active client
    pub const CONNECTED_SHARED: Self = Self::CONNECTED.union(Self::SHARED);
    /// Device is plugged in, shared, and attached to a guest
    pub const CONNECTED_ATTACHED: Self = Self::CONNECTED
        .union(Self::SHARED)
        .union(Self::ATTACHED);

    /// Human-readable word for the named composite states
    pub fn describe(self) -> &'static str {
        if self == Self::DISCONNECTED {
            "disconnected"
        } else if self == Self::DISCONNECTED_PERSISTED {
            "persisted"
        } else if self == Self::CONNECTED_NOT_SHARED {
            "connected"
        } else if self == Self::CONNECTED_SHARED {
            "shared"
        } else if self == Self::CONNECTED_ATTACHED {
            "attached"
        } else {
            "unknown"
        }
    }
}

// Machine output renders the state as its composite-state word rather than
// raw bits, matching the human-readable list output.
impl Serialize for ConnectionState {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.describe())
    }
}

fn non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|s| !s.trim().is_empty())
}

/// Derive a device's connection state from its optional fields
///
/// This is the only place state is computed: `CONNECTED` iff the bus id is
/// non-blank, `SHARED` iff the persisted share guid is non-blank, `ATTACHED`
/// iff a client address is non-blank.
pub fn derive_state(
    bus_id: Option<&str>,
    persisted_guid: Option<&str>,
    client_ip_addr: Option<&str>,
) -> ConnectionState {
    let mut state = ConnectionState::empty();
    if non_blank(bus_id) {
        state |= ConnectionState::CONNECTED;
    }
    if non_blank(persisted_guid) {
        state |= ConnectionState::SHARED;
    }
    if non_blank(client_ip_addr) {
        state |= ConnectionState::ATTACHED;
    }
    state
}

/// Identity key for matching devices across connect/disconnect cycles
///
/// Bus ids are only valid while a device is plugged in, so devices are
/// grouped by their `(vid, pid)` pair instead. Two devices whose ids both
/// failed extraction (both `"-"`) compare equal; known looseness, do not
/// rely on it for correctness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceIdentity {
    pub vid: String,
    pub pid: String,
}

/// One USB device as reported by a single state dump
///
/// Constructed fresh on every snapshot query and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct UsbDevice {
    bus_id: Option<String>,
    client_ip_addr: Option<String>,
    description: Option<String>,
    vid: String,
    pid: String,
    is_forced: bool,
    persisted_guid: Option<String>,
    stub_instance_id: Option<String>,
    state: ConnectionState,
}

impl UsbDevice {
    /// Build a record, deriving its state from the given fields
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus_id: Option<String>,
        client_ip_addr: Option<String>,
        description: Option<String>,
        vid: String,
        pid: String,
        is_forced: bool,
        persisted_guid: Option<String>,
        stub_instance_id: Option<String>,
    ) -> Self {
        let state = derive_state(
            bus_id.as_deref(),
            persisted_guid.as_deref(),
            client_ip_addr.as_deref(),
        );
        Self {
            bus_id,
            client_ip_addr,
            description,
            vid,
            pid,
            is_forced,
            persisted_guid,
            stub_instance_id,
            state,
        }
    }

    /// Build a record for a device known only by identity (never connected)
    pub fn disconnected(description: Option<String>, vid: String, pid: String) -> Self {
        Self::new(None, None, description, vid, pid, false, None, None)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn bus_id(&self) -> Option<&str> {
        self.bus_id.as_deref()
    }

    pub fn client_ip_addr(&self) -> Option<&str> {
        self.client_ip_addr.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn vid(&self) -> &str {
        &self.vid
    }

    pub fn pid(&self) -> &str {
        &self.pid
    }

    pub fn is_forced(&self) -> bool {
        self.is_forced
    }

    pub fn persisted_guid(&self) -> Option<&str> {
        self.persisted_guid.as_deref()
    }

    pub fn stub_instance_id(&self) -> Option<&str> {
        self.stub_instance_id.as_deref()
    }

    /// Identity key used to match this device across snapshots
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            vid: self.vid.clone(),
            pid: self.pid.clone(),
        }
    }
}
