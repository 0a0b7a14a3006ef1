//! Device domain types shared by discovery, reconciliation and presentation

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Ordered `id → state` listing produced by one bus query
pub type BusListing = IndexMap<String, BusState>;

/// Ordered `ip → ports` listing produced by one discovery browse
///
/// Ports are kept as announced; the first announcement of an ip fixes its
/// position in the listing.
pub type NetworkListing = IndexMap<String, IndexSet<String>>;

/// Bus-reported device state
///
/// Only the three states the bus tool reports for attached devices are
/// modelled; any other state string is not a [`BusState`] at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BusState {
    /// Attached and authorized, ready for use
    Device,
    Offline,
    Unauthorized,
}

impl BusState {
    /// Parse a state column value; unknown states yield `None`
    pub fn parse(state: &str) -> Option<Self> {
        match state {
            "device" => Some(BusState::Device),
            "offline" => Some(BusState::Offline),
            "unauthorized" => Some(BusState::Unauthorized),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BusState::Device => "device",
            BusState::Offline => "offline",
            BusState::Unauthorized => "unauthorized",
        }
    }

    /// Whether a device in this state can be mirrored right away
    pub fn is_ready(&self) -> bool {
        matches!(self, BusState::Device)
    }
}

impl std::fmt::Display for BusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device as presented to the user
///
/// `id` is either a bus serial or an `ip:port` address. `display_name` is
/// only ever resolved for ready devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: String,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Device {
    pub fn new(id: impl Into<String>, ready: bool) -> Self {
        Self {
            id: id.into(),
            ready,
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Text shown for this device: its resolved name, or its id
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// Short status text for the device's action
    pub fn status_label(&self) -> &'static str {
        if self.ready {
            "Ready"
        } else {
            "Connect"
        }
    }

    /// The action activating this device should run
    pub fn action(&self) -> DeviceAction {
        DeviceAction::for_device(self)
    }
}

/// What activating a device does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAction {
    /// Device is ready: start mirroring immediately
    Launch(String),
    /// Device is not ready: connect first, then mirror
    BeginConnect(String),
}

impl DeviceAction {
    /// Resolve the single action for a device from its readiness
    pub fn for_device(device: &Device) -> Self {
        if device.ready {
            DeviceAction::Launch(device.id.clone())
        } else {
            DeviceAction::BeginConnect(device.id.clone())
        }
    }

    pub fn target_id(&self) -> &str {
        match self {
            DeviceAction::Launch(id) | DeviceAction::BeginConnect(id) => id,
        }
    }
}

/// Ordered, duplicate-free device list produced by one refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceList {
    devices: IndexMap<String, Device>,
}

impl DeviceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a device; a device whose id is already listed is ignored
    ///
    /// Returns `true` if the device was added.
    pub fn insert(&mut self, device: Device) -> bool {
        if self.devices.contains_key(&device.id) {
            return false;
        }
        self.devices.insert(device.id.clone(), device);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Device> {
        self.devices.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.contains_key(id)
    }

    /// Whether any listed id belongs to `ip`, i.e. has the form `ip:<anything>`
    pub fn owns_address(&self, ip: &str) -> bool {
        self.devices.keys().any(|id| {
            id.strip_prefix(ip)
                .is_some_and(|rest| rest.starts_with(':'))
        })
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }
}

impl IntoIterator for DeviceList {
    type Item = Device;
    type IntoIter = indexmap::map::IntoValues<String, Device>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.into_values()
    }
}

impl FromIterator<Device> for DeviceList {
    fn from_iter<I: IntoIterator<Item = Device>>(iter: I) -> Self {
        let mut list = DeviceList::new();
        for device in iter {
            list.insert(device);
        }
        list
    }
}

impl Serialize for DeviceList {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.devices.values())
    }
}
