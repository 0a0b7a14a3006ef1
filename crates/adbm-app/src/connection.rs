//! Connection state machine for network devices
//!
//! Starting a connection issues `adb connect <target>` without waiting for it,
//! then polls the bus every `poll_interval` until the target shows up as
//! `device` or `max_attempts` checks have been made. At most one attempt is
//! live: starting another one cancels the previous attempt first.
//!
//! The polling task is stopped through a `watch::channel(false)` shutdown
//! signal and aborted. The signal is raised while holding the phase lock and
//! checked under the same lock before any transition is published, so after
//! [`ConnectionStateMachine::cancel`] returns a cancelled attempt can no
//! longer change the phase or trigger its ready callback.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use adbm_core::prelude::*;
use adbm_core::BusState;
use adbm_daemon::{BusDirectory, ProcessRunner};

use crate::config::ConnectionSettings;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Polling parameters for one connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl ConnectionConfig {
    /// Both values are clamped to at least 1 (ms / attempt)
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_ATTEMPTS)
    }
}

impl From<&ConnectionSettings> for ConnectionConfig {
    fn from(settings: &ConnectionSettings) -> Self {
        Self::new(
            Duration::from_millis(settings.poll_interval_ms),
            settings.max_attempts,
        )
    }
}

/// Observable state of the current (or last) connection attempt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No attempt has run, or the last one was cancelled
    #[default]
    Idle,

    /// Waiting for the target; `attempt` checks have been made so far
    Connecting { target_id: String, attempt: u32 },

    /// The target reported `device`; the ready callback has been invoked
    Ready { target_id: String },

    /// The target never became ready within the attempt budget
    TimedOut { target_id: String, attempts: u32 },
}

impl ConnectionPhase {
    /// Whether the attempt has reached a final state
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready { .. } | Self::TimedOut { .. })
    }

    pub fn target_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Connecting { target_id, .. }
            | Self::Ready { target_id }
            | Self::TimedOut { target_id, .. } => Some(target_id),
        }
    }
}

struct ConnectionAttempt {
    target_id: String,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Drives `adb connect` followed by bounded readiness polling
pub struct ConnectionStateMachine<R> {
    bus: Arc<BusDirectory<R>>,
    config: ConnectionConfig,
    phase: Arc<watch::Sender<ConnectionPhase>>,
    current: Option<ConnectionAttempt>,
}

impl<R> ConnectionStateMachine<R> {
    pub fn config(&self) -> ConnectionConfig {
        self.config
    }

    /// Current phase
    pub fn phase(&self) -> ConnectionPhase {
        self.phase.borrow().clone()
    }

    /// Subscribe to phase changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionPhase> {
        self.phase.subscribe()
    }

    /// Target of the attempt that is still polling, if any
    pub fn active_target(&self) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|attempt| !attempt.task.is_finished())
            .map(|attempt| attempt.target_id.as_str())
    }

    /// Stop the live attempt, if any
    ///
    /// No further checks run for it and its ready callback is never invoked
    /// afterwards. Calling this with no live attempt does nothing.
    pub fn cancel(&mut self) {
        let Some(attempt) = self.current.take() else {
            return;
        };

        self.phase.send_if_modified(|phase| {
            let _ = attempt.shutdown_tx.send(true);
            match phase {
                ConnectionPhase::Connecting { target_id, .. }
                    if *target_id == attempt.target_id =>
                {
                    *phase = ConnectionPhase::Idle;
                    true
                }
                _ => false,
            }
        });
        attempt.task.abort();

        debug!("Cancelled connection attempt for {}", attempt.target_id);
    }
}

impl<R: ProcessRunner + Sync + 'static> ConnectionStateMachine<R> {
    pub fn new(bus: Arc<BusDirectory<R>>, config: ConnectionConfig) -> Self {
        let (phase, _) = watch::channel(ConnectionPhase::Idle);
        Self {
            bus,
            config,
            phase: Arc::new(phase),
            current: None,
        }
    }

    /// Begin connecting to `target_id`, cancelling any live attempt
    ///
    /// `on_ready` is invoked with the target id, at most once, when the bus
    /// reports the target as `device`.
    pub fn start<F>(&mut self, target_id: &str, on_ready: F)
    where
        F: FnOnce(String) + Send + 'static,
    {
        self.cancel();

        info!("Connecting to {}", target_id);

        let bus = Arc::clone(&self.bus);
        let address = target_id.to_string();
        tokio::spawn(async move {
            bus.connect(&address).await;
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.phase.send_replace(ConnectionPhase::Connecting {
            target_id: target_id.to_string(),
            attempt: 0,
        });

        let task = tokio::spawn(poll_until_ready(
            Arc::clone(&self.bus),
            target_id.to_string(),
            self.config,
            shutdown_rx,
            Arc::clone(&self.phase),
            on_ready,
        ));

        self.current = Some(ConnectionAttempt {
            target_id: target_id.to_string(),
            shutdown_tx,
            task,
        });
    }
}

impl<R> Drop for ConnectionStateMachine<R> {
    fn drop(&mut self) {
        if let Some(attempt) = self.current.take() {
            let _ = attempt.shutdown_tx.send(true);
            attempt.task.abort();
        }
    }
}

async fn poll_until_ready<R, F>(
    bus: Arc<BusDirectory<R>>,
    target_id: String,
    config: ConnectionConfig,
    mut shutdown_rx: watch::Receiver<bool>,
    phase: Arc<watch::Sender<ConnectionPhase>>,
    on_ready: F,
) where
    R: ProcessRunner + Sync + 'static,
    F: FnOnce(String) + Send + 'static,
{
    let mut poll_tick = interval_at(Instant::now() + config.poll_interval, config.poll_interval);
    poll_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for attempt in 1..=config.max_attempts {
        tokio::select! {
            _ = poll_tick.tick() => {}
            _ = shutdown_rx.changed() => {
                debug!("Connection polling for {} stopped", target_id);
                return;
            }
        }

        let ready = bus.list_devices().await.get(&target_id) == Some(&BusState::Device);
        let next = if ready {
            ConnectionPhase::Ready {
                target_id: target_id.clone(),
            }
        } else if attempt == config.max_attempts {
            ConnectionPhase::TimedOut {
                target_id: target_id.clone(),
                attempts: attempt,
            }
        } else {
            ConnectionPhase::Connecting {
                target_id: target_id.clone(),
                attempt,
            }
        };

        let mut committed = false;
        phase.send_if_modified(|current| {
            if *shutdown_rx.borrow() {
                return false;
            }
            *current = next.clone();
            committed = true;
            true
        });
        if !committed {
            return;
        }

        match next {
            ConnectionPhase::Ready { .. } => {
                info!("{} is ready after {} check(s)", target_id, attempt);
                on_ready(target_id);
                return;
            }
            ConnectionPhase::TimedOut { .. } => {
                warn!(
                    "Giving up on {} after {} check(s); it never reported ready",
                    target_id, attempt
                );
                return;
            }
            _ => trace!("{} not ready yet (check {})", target_id, attempt),
        }
    }
}
