//! Network directory: wireless-debugging devices announced over mDNS
//!
//! Uses `avahi-browse` in parseable, resolving, terminate-after-dump mode.
//! Each resolved record is a `;`-separated line starting with `=`:
//!
//! ```text
//! =;wlan0;IPv4;adb-R58M123ABC-x1y2z3;_adb-tls-connect._tcp;local;pixel.local;10.0.0.5;37123;""
//! ```
//!
//! Field 7 is the address and field 8 the port. Discovery is best effort: the
//! same device may be announced on several interfaces or with several ports.

use std::sync::Arc;

use crate::process::{command_line, ProcessRunner};
use adbm_core::prelude::*;
use adbm_core::NetworkListing;

/// mDNS service type advertised by Android wireless debugging
pub const DEFAULT_SERVICE_TYPE: &str = "_adb-tls-connect._tcp";

const RECORD_MARKER: char = '=';
const IP_FIELD: usize = 7;
const PORT_FIELD: usize = 8;

/// Browses the local network for devices announcing wireless debugging
pub struct NetworkDirectory<R> {
    runner: Arc<R>,
    avahi_browse: Option<String>,
    service_type: String,
}

impl<R: ProcessRunner + Sync> NetworkDirectory<R> {
    /// Create a directory; `avahi_browse` is `None` when the tool is unavailable
    pub fn new(runner: Arc<R>, avahi_browse: Option<String>, service_type: impl Into<String>) -> Self {
        Self {
            runner,
            avahi_browse,
            service_type: service_type.into(),
        }
    }

    /// Browse once and return `ip → ports` in discovery order
    ///
    /// Returns an empty listing when the browse tool is unavailable.
    pub async fn discover(&self) -> NetworkListing {
        let Some(avahi_browse) = self.avahi_browse.as_deref() else {
            debug!("avahi-browse unavailable, skipping network discovery");
            return NetworkListing::new();
        };

        let output = self
            .runner
            .output(&command_line(
                avahi_browse,
                &["-t", "-p", "-r", &self.service_type],
            ))
            .await;

        let candidates = parse_browse_output(&output);
        debug!(
            "mDNS browse for {} found {} address(es)",
            self.service_type,
            candidates.len()
        );
        candidates
    }
}

/// Parse `avahi-browse -p -r` output into `ip → ports`
///
/// Records for an already-seen ip add to its port set.
pub fn parse_browse_output(output: &str) -> NetworkListing {
    let mut candidates = NetworkListing::new();

    for line in output.lines() {
        if !line.starts_with(RECORD_MARKER) {
            continue;
        }

        let fields: Vec<&str> = line.split(';').collect();
        let ip = fields.get(IP_FIELD).copied().unwrap_or_default();
        let port = fields.get(PORT_FIELD).copied().unwrap_or_default();

        if ip.is_empty() || port.is_empty() {
            trace!("Dropping incomplete mDNS record: {:?}", line);
            continue;
        }

        candidates
            .entry(ip.to_string())
            .or_default()
            .insert(port.to_string());
    }

    candidates
}
