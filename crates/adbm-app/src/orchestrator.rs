//! Orchestrator: refresh the device list and act on devices
//!
//! Owns one of each directory, the connection state machine and the launcher.
//! A refresh runs `adb start-server`, then the bus listing and the network
//! browse, reconciles both, and resolves the model name of ready devices.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use adbm_core::prelude::*;
use adbm_core::{merge, Device, DeviceAction, DeviceList};
use adbm_daemon::tool_availability::ADB;
use adbm_daemon::{BusDirectory, Launcher, NetworkDirectory, ProcessRunner, ToolAvailability};

use crate::config::Settings;
use crate::connection::{ConnectionConfig, ConnectionPhase, ConnectionStateMachine};

/// Result of one refresh request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The bus tool is missing; nothing was run
    ToolNotFound { tool: &'static str },

    /// Reconciled device list, possibly empty
    Devices(DeviceList),

    /// Another refresh was already running; this request was dropped
    InFlight,
}

/// A mirroring session that starts once a connection attempt succeeds
pub struct PendingLaunch {
    target_id: String,
    session: oneshot::Receiver<JoinHandle<()>>,
}

impl PendingLaunch {
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Wait for the attempt to settle
    ///
    /// Returns the session handle when the device became ready, `None` when
    /// the attempt timed out or was cancelled.
    pub async fn wait(self) -> Option<JoinHandle<()>> {
        self.session.await.ok()
    }
}

/// What an activation started
pub enum Activation {
    /// The device was ready and mirroring started
    Mirroring(JoinHandle<()>),

    /// The device is being connected; mirroring starts when it is ready
    Connecting(PendingLaunch),
}

pub struct Orchestrator<R> {
    tools: ToolAvailability,
    bus: Arc<BusDirectory<R>>,
    network: NetworkDirectory<R>,
    connection: Mutex<ConnectionStateMachine<R>>,
    launcher: Launcher<R>,
    refresh_guard: tokio::sync::Mutex<()>,
}

impl<R: ProcessRunner + Sync + 'static> Orchestrator<R> {
    pub fn new(runner: Arc<R>, tools: ToolAvailability, settings: &Settings) -> Self {
        let adb = tools.adb_path().unwrap_or_else(|| ADB.to_string());
        let bus = Arc::new(BusDirectory::new(Arc::clone(&runner), adb));

        let avahi_browse = if settings.discovery.enabled {
            tools.avahi_browse_path()
        } else {
            debug!("Network discovery disabled by configuration");
            None
        };
        let network = NetworkDirectory::new(
            Arc::clone(&runner),
            avahi_browse,
            settings.discovery.service_type.clone(),
        );

        let connection = ConnectionStateMachine::new(
            Arc::clone(&bus),
            ConnectionConfig::from(&settings.connection),
        );
        let launcher = Launcher::new(runner, tools.scrcpy_command(), settings.mirror.args.clone());

        Self {
            tools,
            bus,
            network,
            connection: Mutex::new(connection),
            launcher,
            refresh_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn tools(&self) -> &ToolAvailability {
        &self.tools
    }

    pub fn launcher(&self) -> &Launcher<R> {
        &self.launcher
    }

    /// Build a fresh device list
    ///
    /// Bus devices come first in enumeration order, followed by network
    /// candidates whose address no bus entry owns. Ready devices carry their
    /// model name.
    #[instrument(skip(self), level = "debug")]
    pub async fn refresh(&self) -> RefreshOutcome {
        let Ok(_guard) = self.refresh_guard.try_lock() else {
            debug!("Refresh already in flight, dropping request");
            return RefreshOutcome::InFlight;
        };

        if self.tools.adb.is_none() {
            warn!("Cannot refresh devices: adb not found");
            return RefreshOutcome::ToolNotFound { tool: ADB };
        }

        self.bus.start_server().await;
        let (bus, candidates) = tokio::join!(self.bus.list_devices(), self.network.discover());

        let mut devices = DeviceList::new();
        for device in merge(&bus, &candidates) {
            let device = if device.ready {
                let name = self.bus.resolve_display_name(&device.id).await;
                device.with_display_name(name)
            } else {
                device
            };
            devices.insert(device);
        }

        info!(
            "Refresh found {} device(s), {} ready",
            devices.len(),
            devices.iter().filter(|d| d.ready).count()
        );
        RefreshOutcome::Devices(devices)
    }

    /// Run the action a device resolves to
    pub fn activate(&self, device: &Device) -> Result<Activation> {
        match device.action() {
            DeviceAction::Launch(id) => Ok(Activation::Mirroring(self.launch(&id))),
            DeviceAction::BeginConnect(id) => Ok(Activation::Connecting(self.begin_connect(&id)?)),
        }
    }

    /// Start mirroring a ready device
    pub fn launch(&self, target_id: &str) -> JoinHandle<()> {
        self.launcher.launch(target_id)
    }

    /// Connect to a network device and start mirroring once it is ready
    ///
    /// Replaces any connection attempt in progress.
    #[instrument(skip(self), level = "debug")]
    pub fn begin_connect(&self, target_id: &str) -> Result<PendingLaunch> {
        if self.tools.adb.is_none() {
            return Err(Error::tool_not_found(ADB));
        }

        let (session_tx, session_rx) = oneshot::channel();
        let launcher = self.launcher.clone();
        self.connection().start(target_id, move |id| {
            let _ = session_tx.send(launcher.launch(&id));
        });

        Ok(PendingLaunch {
            target_id: target_id.to_string(),
            session: session_rx,
        })
    }

    /// Stop the connection attempt in progress, if any
    pub fn cancel_connect(&self) {
        self.connection().cancel();
    }

    pub fn connection_phase(&self) -> ConnectionPhase {
        self.connection().phase()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionPhase> {
        self.connection().subscribe()
    }

    /// Find `id` in a fresh device list
    pub async fn find_device(&self, id: &str) -> Result<Device> {
        match self.refresh().await {
            RefreshOutcome::Devices(devices) => devices
                .get(id)
                .cloned()
                .ok_or_else(|| Error::device_not_found(id)),
            RefreshOutcome::ToolNotFound { tool } => Err(Error::tool_not_found(tool)),
            RefreshOutcome::InFlight => Err(Error::process("a refresh is already running")),
        }
    }

    fn connection(&self) -> MutexGuard<'_, ConnectionStateMachine<R>> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adbm_daemon::test_utils::FakeProcessRunner;
    use std::path::PathBuf;
    use std::time::Duration;

    const DEVICES: &str = "adb devices";
    const BROWSE: &str = "avahi-browse -t -p -r _adb-tls-connect._tcp";

    fn all_tools() -> ToolAvailability {
        ToolAvailability {
            adb: Some(PathBuf::from("adb")),
            avahi_browse: Some(PathBuf::from("avahi-browse")),
            scrcpy: Some(PathBuf::from("scrcpy")),
        }
    }

    fn orchestrator(runner: &Arc<FakeProcessRunner>) -> Orchestrator<FakeProcessRunner> {
        Orchestrator::new(Arc::clone(runner), all_tools(), &Settings::default())
    }

    fn browse_record(ip: &str, port: u16) -> String {
        format!(
            "=;wlan0;IPv4;adb-R58M123-abc;_adb-tls-connect._tcp;local;Pixel.local;{};{};\"\"",
            ip, port
        )
    }

    fn devices(outcome: RefreshOutcome) -> DeviceList {
        match outcome {
            RefreshOutcome::Devices(devices) => devices,
            other => panic!("expected a device list, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_without_adb() {
        let runner = Arc::new(FakeProcessRunner::new());
        let tools = ToolAvailability {
            adb: None,
            ..all_tools()
        };
        let orchestrator = Orchestrator::new(Arc::clone(&runner), tools, &Settings::default());

        assert_eq!(
            orchestrator.refresh().await,
            RefreshOutcome::ToolNotFound { tool: "adb" }
        );
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_empty() {
        let runner = Arc::new(FakeProcessRunner::new());
        let orchestrator = orchestrator(&runner);

        let list = devices(orchestrator.refresh().await);

        assert!(list.is_empty());
        assert_eq!(runner.command_lines()[0], "adb start-server");
    }

    #[tokio::test]
    async fn test_refresh_reconciles_and_names_ready_devices() {
        let browse = [
            browse_record("10.0.0.5", 41234),
            browse_record("10.0.0.9", 5555),
            browse_record("10.0.0.9", 38555),
        ]
        .join("\n");
        let runner = Arc::new(
            FakeProcessRunner::new()
                .with_output(
                    DEVICES,
                    "List of devices attached\nR58M123\tdevice\n10.0.0.5:41234\toffline\n\n",
                )
                .with_output(BROWSE, &browse)
                .with_output("adb -s R58M123 shell getprop ro.product.model", "Pixel 8\n"),
        );
        let orchestrator = orchestrator(&runner);

        let list = devices(orchestrator.refresh().await);

        assert_eq!(
            list.ids().collect::<Vec<_>>(),
            vec!["R58M123", "10.0.0.5:41234", "10.0.0.9:38555"]
        );
        let phone = list.get("R58M123").unwrap();
        assert!(phone.ready);
        assert_eq!(phone.label(), "Pixel 8");
        assert_eq!(list.get("10.0.0.5:41234").unwrap().display_name, None);
        assert_eq!(
            runner.call_count("adb -s 10.0.0.5:41234 shell getprop ro.product.model"),
            0
        );
    }

    #[tokio::test]
    async fn test_refresh_with_discovery_disabled() {
        let runner = Arc::new(FakeProcessRunner::new());
        let mut settings = Settings::default();
        settings.discovery.enabled = false;
        let orchestrator = Orchestrator::new(Arc::clone(&runner), all_tools(), &settings);

        orchestrator.refresh().await;

        assert!(runner
            .command_lines()
            .iter()
            .all(|c| !c.starts_with("avahi-browse")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_refresh_is_dropped() {
        let runner =
            Arc::new(FakeProcessRunner::new().with_delay(DEVICES, Duration::from_secs(1)));
        let orchestrator = orchestrator(&runner);

        let (first, second) = tokio::join!(orchestrator.refresh(), orchestrator.refresh());

        assert!(matches!(first, RefreshOutcome::Devices(_)));
        assert_eq!(second, RefreshOutcome::InFlight);
        assert_eq!(runner.call_count("adb start-server"), 1);

        assert!(matches!(
            orchestrator.refresh().await,
            RefreshOutcome::Devices(_)
        ));
    }

    #[tokio::test]
    async fn test_activate_ready_device_launches() {
        let runner = Arc::new(FakeProcessRunner::new());
        let orchestrator = orchestrator(&runner);

        let activation = orchestrator
            .activate(&Device::new("R58M123", true))
            .unwrap();
        let Activation::Mirroring(session) = activation else {
            panic!("ready device should launch");
        };
        session.await.unwrap();

        assert_eq!(runner.call_count("scrcpy -s R58M123 --always-on-top"), 1);
        assert_eq!(runner.call_count("adb connect R58M123"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_network_device_connects_then_launches() {
        let ready = "List of devices attached\n10.0.0.5:37000\tdevice\n";
        let runner = Arc::new(
            FakeProcessRunner::new()
                .with_output(BROWSE, &browse_record("10.0.0.5", 37000))
                .with_output_sequence(DEVICES, &["", "", ready]),
        );
        let orchestrator = orchestrator(&runner);

        let list = devices(orchestrator.refresh().await);
        let device = list.get("10.0.0.5:37000").unwrap();
        assert!(!device.ready);

        let Activation::Connecting(pending) = orchestrator.activate(device).unwrap() else {
            panic!("network device should connect first");
        };
        assert_eq!(pending.target_id(), "10.0.0.5:37000");

        let session = pending.wait().await.expect("device becomes ready");
        session.await.unwrap();

        assert_eq!(runner.call_count("adb connect 10.0.0.5:37000"), 1);
        assert_eq!(runner.call_count("scrcpy -s 10.0.0.5:37000 --always-on-top"), 1);
        assert_eq!(
            orchestrator.connection_phase(),
            ConnectionPhase::Ready {
                target_id: "10.0.0.5:37000".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_launch_resolves_none_on_timeout() {
        let runner = Arc::new(FakeProcessRunner::new());
        let orchestrator = orchestrator(&runner);

        let pending = orchestrator.begin_connect("10.0.0.5:37000").unwrap();

        assert!(pending.wait().await.is_none());
        assert_eq!(runner.call_count(DEVICES), 10);
        assert_eq!(runner.call_count("scrcpy -s 10.0.0.5:37000 --always-on-top"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_connect_resolves_none() {
        let runner = Arc::new(FakeProcessRunner::new());
        let orchestrator = orchestrator(&runner);

        let pending = orchestrator.begin_connect("10.0.0.5:37000").unwrap();
        orchestrator.cancel_connect();

        assert!(pending.wait().await.is_none());
        assert_eq!(orchestrator.connection_phase(), ConnectionPhase::Idle);
    }

    #[tokio::test]
    async fn test_begin_connect_without_adb() {
        let runner = Arc::new(FakeProcessRunner::new());
        let tools = ToolAvailability {
            adb: None,
            ..all_tools()
        };
        let orchestrator = Orchestrator::new(runner, tools, &Settings::default());

        let err = orchestrator.begin_connect("10.0.0.5:37000").err().unwrap();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_device_missing() {
        let runner = Arc::new(FakeProcessRunner::new());
        let orchestrator = orchestrator(&runner);

        let err = orchestrator.find_device("R58M123").await.unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound { .. }));
    }
}
