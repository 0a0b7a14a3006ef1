//! Reconciliation of the bus and network directories
//!
//! The bus directory is authoritative: every bus entry is listed, in
//! enumeration order, and any network candidate whose ip is already owned by a
//! bus id is dropped. Remaining candidates follow in discovery order, each
//! collapsed to a single `ip:port` entry using its highest announced port.

use crate::types::{BusListing, Device, DeviceList, NetworkListing};
use tracing::trace;

/// Merge one bus listing and one network listing into a device list
///
/// Never fails; empty inputs give an empty list.
pub fn merge(bus: &BusListing, candidates: &NetworkListing) -> DeviceList {
    let mut list = DeviceList::new();

    for (id, state) in bus {
        list.insert(Device::new(id.clone(), state.is_ready()));
    }

    for (ip, ports) in candidates {
        if list.owns_address(ip) {
            trace!("Skipping network candidate {}: already known on the bus", ip);
            continue;
        }

        let Some(port) = highest_port(ports) else {
            trace!("Skipping network candidate {}: no usable port in {:?}", ip, ports);
            continue;
        };

        list.insert(Device::new(format!("{}:{}", ip, port), false));
    }

    list
}

/// Numerically highest port, ignoring values that are not port numbers
fn highest_port<'a>(ports: impl IntoIterator<Item = &'a String>) -> Option<u16> {
    ports
        .into_iter()
        .filter_map(|p| p.trim().parse::<u16>().ok())
        .max()
}
