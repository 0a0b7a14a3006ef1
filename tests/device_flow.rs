//! End-to-end command flows against a scripted process runner

use std::path::PathBuf;
use std::sync::Arc;

use adb_mirror::commands;
use adbm_app::{load_settings, Orchestrator, Settings, ToolAvailability};
use adbm_core::Error;
use adbm_daemon::test_utils::FakeProcessRunner;

const DEVICES: &str = "adb devices";
const BROWSE: &str = "avahi-browse -t -p -r _adb-tls-connect._tcp";
const USB_AND_WIFI: &str =
    "List of devices attached\nR58M123\tdevice\n10.0.0.5:41234\toffline\n\n";
const MODEL: &str = "adb -s R58M123 shell getprop ro.product.model";

fn all_tools() -> ToolAvailability {
    ToolAvailability {
        adb: Some(PathBuf::from("adb")),
        avahi_browse: Some(PathBuf::from("avahi-browse")),
        scrcpy: Some(PathBuf::from("scrcpy")),
    }
}

fn browse_record(ip: &str, port: u16) -> String {
    format!(
        "=;wlan0;IPv4;adb-phone;_adb-tls-connect._tcp;local;phone.local;{};{};\"\"",
        ip, port
    )
}

fn orchestrator(runner: &Arc<FakeProcessRunner>) -> Orchestrator<FakeProcessRunner> {
    Orchestrator::new(Arc::clone(runner), all_tools(), &Settings::default())
}

fn text(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_list_usb_and_network_phones() {
    let runner = Arc::new(
        FakeProcessRunner::new()
            .with_output(DEVICES, USB_AND_WIFI)
            .with_output(
                BROWSE,
                &[
                    browse_record("10.0.0.5", 41234),
                    browse_record("10.0.0.9", 5555),
                    browse_record("10.0.0.9", 37000),
                ]
                .join("\n"),
            )
            .with_output(MODEL, "Pixel 8\n"),
    );
    let mut out = Vec::new();

    commands::list(&orchestrator(&runner), false, &mut out)
        .await
        .unwrap();

    assert_eq!(
        text(out),
        "Pixel 8         Ready    R58M123\n\
         10.0.0.5:41234  Connect\n\
         10.0.0.9:37000  Connect\n"
    );
}

#[tokio::test]
async fn test_list_json() {
    let runner = Arc::new(
        FakeProcessRunner::new()
            .with_output(DEVICES, USB_AND_WIFI)
            .with_output(MODEL, "Pixel 8"),
    );
    let mut out = Vec::new();

    commands::list(&orchestrator(&runner), true, &mut out)
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["R58M123", "10.0.0.5:41234"]);
}

#[tokio::test]
async fn test_list_reports_missing_adb() {
    let runner = Arc::new(FakeProcessRunner::new());
    let tools = ToolAvailability {
        adb: None,
        ..all_tools()
    };
    let orchestrator = Orchestrator::new(Arc::clone(&runner), tools, &Settings::default());
    let mut out = Vec::new();

    commands::list(&orchestrator, false, &mut out).await.unwrap();

    assert_eq!(text(out), "adb not found\n");
    assert!(runner.calls().is_empty());

    let err = commands::list(&orchestrator, true, &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ToolNotFound { .. }));
}

#[tokio::test]
async fn test_list_no_phones() {
    let runner =
        Arc::new(FakeProcessRunner::new().with_output(DEVICES, "List of devices attached\n\n"));
    let mut out = Vec::new();

    commands::list(&orchestrator(&runner), false, &mut out)
        .await
        .unwrap();

    assert_eq!(text(out), "No phones found\n");
}

#[tokio::test]
async fn test_activate_ready_phone_mirrors() {
    let runner = Arc::new(
        FakeProcessRunner::new()
            .with_output(DEVICES, USB_AND_WIFI)
            .with_output(MODEL, "Pixel 8"),
    );
    let mut out = Vec::new();

    commands::activate(&orchestrator(&runner), "R58M123", &mut out)
        .await
        .unwrap();

    assert_eq!(text(out), "Mirroring Pixel 8\n");
    assert_eq!(runner.call_count("scrcpy -s R58M123 --always-on-top"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_activate_network_phone_connects_first() {
    let connected = "List of devices attached\n10.0.0.9:37000\tdevice\n";
    let runner = Arc::new(
        FakeProcessRunner::new()
            .with_output(BROWSE, &browse_record("10.0.0.9", 37000))
            .with_output_sequence(DEVICES, &["", "", "", connected]),
    );
    let mut out = Vec::new();

    commands::activate(&orchestrator(&runner), "10.0.0.9:37000", &mut out)
        .await
        .unwrap();

    assert_eq!(
        text(out),
        "Connecting to 10.0.0.9:37000\nMirroring 10.0.0.9:37000\n"
    );
    let lines = runner.command_lines();
    let connect = lines
        .iter()
        .position(|c| c == "adb connect 10.0.0.9:37000")
        .unwrap();
    let mirror = lines
        .iter()
        .position(|c| c == "scrcpy -s 10.0.0.9:37000 --always-on-top")
        .unwrap();
    assert!(connect < mirror);
    assert_eq!(runner.call_count(DEVICES), 4);
}

#[tokio::test]
async fn test_activate_unknown_phone() {
    let runner = Arc::new(FakeProcessRunner::new().with_output(DEVICES, USB_AND_WIFI));

    let err = commands::activate(&orchestrator(&runner), "R99XYZ", &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DeviceNotFound { ref id } if id == "R99XYZ"));
    assert_eq!(runner.call_count("adb connect R99XYZ"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout_is_quiet() {
    let runner = Arc::new(FakeProcessRunner::new());
    let mut out = Vec::new();

    commands::connect(&orchestrator(&runner), "10.0.0.9:37000", &mut out)
        .await
        .unwrap();

    assert_eq!(text(out), "Connecting to 10.0.0.9:37000\n");
    assert_eq!(runner.call_count(DEVICES), 10);
    assert_eq!(runner.call_count("scrcpy -s 10.0.0.9:37000 --always-on-top"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_connect_uses_configured_polling() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        "[connection]\npoll_interval_ms = 100\nmax_attempts = 3\n\n[mirror]\nargs = []\n",
    )
    .unwrap();
    let settings = load_settings(&config);
    let runner = Arc::new(FakeProcessRunner::new());
    let orchestrator = Orchestrator::new(Arc::clone(&runner), all_tools(), &settings);
    let start = tokio::time::Instant::now();

    commands::connect(&orchestrator, "10.0.0.9:37000", &mut Vec::new())
        .await
        .unwrap();

    let checks = runner.calls_to(DEVICES);
    assert_eq!(checks.len(), 3);
    assert_eq!(checks[2].at - start, std::time::Duration::from_millis(300));
}

#[tokio::test]
async fn test_mirror_without_scrcpy() {
    let runner = Arc::new(
        FakeProcessRunner::new().with_spawn_failure("scrcpy -s R58M123 --always-on-top"),
    );
    let tools = ToolAvailability {
        scrcpy: None,
        ..all_tools()
    };
    let orchestrator = Orchestrator::new(Arc::clone(&runner), tools, &Settings::default());
    let mut out = Vec::new();

    commands::mirror(&orchestrator, "R58M123", &mut out)
        .await
        .unwrap();

    assert_eq!(text(out), "scrcpy not found\nMirroring R58M123\n");
    assert!(!orchestrator.launcher().is_busy());
}
