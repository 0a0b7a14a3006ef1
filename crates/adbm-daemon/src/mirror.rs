//! Screen mirroring sessions via `scrcpy`

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::process::ProcessRunner;
use adbm_core::prelude::*;

/// Options passed to the mirroring tool when none are configured
pub const DEFAULT_MIRROR_ARGS: &[&str] = &["--always-on-top"];

/// Spawns mirroring sessions and tracks whether any are running
///
/// The busy signal is raised right before a session is spawned and lowered
/// when its process exits, whatever the exit code, or fails to spawn.
pub struct Launcher<R> {
    runner: Arc<R>,
    scrcpy: String,
    args: Vec<String>,
    /// Number of sessions currently running
    sessions: Arc<watch::Sender<usize>>,
}

impl<R> Clone for Launcher<R> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            scrcpy: self.scrcpy.clone(),
            args: self.args.clone(),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl<R: ProcessRunner + Sync + 'static> Launcher<R> {
    pub fn new(runner: Arc<R>, scrcpy: impl Into<String>, args: Vec<String>) -> Self {
        let (sessions, _) = watch::channel(0);
        Self {
            runner,
            scrcpy: scrcpy.into(),
            args,
            sessions: Arc::new(sessions),
        }
    }

    /// Full command line used to mirror `target_id`
    pub fn command(&self, target_id: &str) -> Vec<String> {
        let mut argv = vec![
            self.scrcpy.clone(),
            "-s".to_string(),
            target_id.to_string(),
        ];
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Start mirroring `target_id`
    ///
    /// Returns immediately; the returned handle completes once the mirroring
    /// process has exited and the busy signal has been updated.
    pub fn launch(&self, target_id: &str) -> JoinHandle<()> {
        let argv = self.command(target_id);
        let target_id = target_id.to_string();
        let runner = Arc::clone(&self.runner);
        let sessions = Arc::clone(&self.sessions);

        sessions.send_modify(|n| *n += 1);
        info!("Starting mirroring session for {}", target_id);

        tokio::spawn(async move {
            match runner.wait(&argv).await {
                Ok(code) => info!(
                    "Mirroring session for {} ended with exit code {:?}",
                    target_id, code
                ),
                Err(e) => warn!("Mirroring session for {} failed: {}", target_id, e),
            }
            sessions.send_modify(|n| *n = n.saturating_sub(1));
        })
    }

    /// Whether a mirroring session is running
    pub fn is_busy(&self) -> bool {
        *self.sessions.borrow() > 0
    }

    /// Subscribe to the number of running sessions
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.sessions.subscribe()
    }

    /// Wait until no mirroring session is running
    pub async fn wait_idle(&self) {
        let mut rx = self.sessions.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}
