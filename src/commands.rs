//! Command implementations behind the `adbm` subcommands
//!
//! Each command writes its user-facing output to `out`; diagnostics go to the
//! log file.

use std::io::Write;

use tokio::task::JoinHandle;

use adbm_app::{Activation, Orchestrator, PendingLaunch, ProcessRunner, RefreshOutcome};
use adbm_core::prelude::*;

use crate::output::{devices_json, render_outcome};

/// Refresh and print the device list
pub async fn list<R, W>(orchestrator: &Orchestrator<R>, json: bool, out: &mut W) -> Result<()>
where
    R: ProcessRunner + Sync + 'static,
    W: Write,
{
    let outcome = orchestrator.refresh().await;
    match (&outcome, json) {
        (RefreshOutcome::Devices(devices), true) => writeln!(out, "{}", devices_json(devices)?)?,
        (RefreshOutcome::ToolNotFound { tool }, true) => return Err(Error::tool_not_found(*tool)),
        _ => write!(out, "{}", render_outcome(&outcome))?,
    }
    Ok(())
}

/// Refresh, find `id` and run its action until mirroring ends
pub async fn activate<R, W>(orchestrator: &Orchestrator<R>, id: &str, out: &mut W) -> Result<()>
where
    R: ProcessRunner + Sync + 'static,
    W: Write,
{
    let device = orchestrator.find_device(id).await?;
    info!("Activating {} ({})", device.label(), device.status_label());

    match orchestrator.activate(&device)? {
        Activation::Mirroring(session) => {
            warn_if_no_mirror_tool(orchestrator, out)?;
            writeln!(out, "Mirroring {}", device.label())?;
            wait_session(session).await
        }
        Activation::Connecting(pending) => follow_connection(orchestrator, pending, out).await,
    }
}

/// Connect to a network address and mirror it once ready
pub async fn connect<R, W>(orchestrator: &Orchestrator<R>, address: &str, out: &mut W) -> Result<()>
where
    R: ProcessRunner + Sync + 'static,
    W: Write,
{
    let pending = orchestrator.begin_connect(address)?;
    follow_connection(orchestrator, pending, out).await
}

/// Mirror a device without checking its state first
pub async fn mirror<R, W>(orchestrator: &Orchestrator<R>, id: &str, out: &mut W) -> Result<()>
where
    R: ProcessRunner + Sync + 'static,
    W: Write,
{
    warn_if_no_mirror_tool(orchestrator, out)?;
    writeln!(out, "Mirroring {}", id)?;
    wait_session(orchestrator.launch(id)).await
}

async fn follow_connection<R, W>(
    orchestrator: &Orchestrator<R>,
    pending: PendingLaunch,
    out: &mut W,
) -> Result<()>
where
    R: ProcessRunner + Sync + 'static,
    W: Write,
{
    let target_id = pending.target_id().to_string();
    writeln!(out, "Connecting to {}", target_id)?;

    // A timed-out attempt ends quietly; the reason is in the log.
    let Some(session) = pending.wait().await else {
        debug!(
            "Connection to {} ended as {:?}",
            target_id,
            orchestrator.connection_phase()
        );
        return Ok(());
    };

    warn_if_no_mirror_tool(orchestrator, out)?;
    writeln!(out, "Mirroring {}", target_id)?;
    wait_session(session).await
}

fn warn_if_no_mirror_tool<R, W: Write>(orchestrator: &Orchestrator<R>, out: &mut W) -> Result<()>
where
    R: ProcessRunner + Sync + 'static,
{
    if orchestrator.tools().scrcpy.is_none() {
        writeln!(out, "scrcpy not found")?;
    }
    Ok(())
}

async fn wait_session(session: JoinHandle<()>) -> Result<()> {
    session
        .await
        .map_err(|e| Error::process(format!("Mirroring task failed: {}", e)))
}
