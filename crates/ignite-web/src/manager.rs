//! Server lifecycle manager (C9): `Stopped` → `Starting` → `Running` →
//! `Stopping` → `Stopped`, plus OS signal handling for graceful shutdown.
//! The signal-waiting half is grounded on the bot runtime's
//! `wait_for_shutdown` (Ctrl+C raced against SIGTERM via `tokio::select!`).

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::GracefulShutdownConfig;
use crate::error::{WebError, WebResult};
use crate::facade::framework::WebFramework;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Owns at most one running [`WebFramework`] and mediates Start/Stop so two
/// callers can never race each other into an inconsistent state (§3 the
/// manager's `running` flag is mutex-guarded).
pub struct ServerManager {
    framework: Mutex<Option<Box<dyn WebFramework>>>,
    state: Mutex<ManagerState>,
}

impl ServerManager {
    pub fn new() -> Self {
        Self {
            framework: Mutex::new(None),
            state: Mutex::new(ManagerState::Stopped),
        }
    }

    pub async fn state(&self) -> ManagerState {
        *self.state.lock().await
    }

    /// Takes ownership of an already-built framework and starts it.
    ///
    /// Validates `framework.config()` first (§4.9: a distinct `Start()` step,
    /// separate from the validation `FrameworkRegistry::create_server` already
    /// ran at construction time) — a `WebFramework` built straight from an
    /// adapter constructor, bypassing the registry, would otherwise reach
    /// `start()` with no validation at all.
    pub async fn start(&self, mut framework: Box<dyn WebFramework>) -> WebResult<()> {
        {
            let mut state = self.state.lock().await;
            if *state != ManagerState::Stopped {
                return Err(WebError::ServerAlreadyRunning);
            }
            *state = ManagerState::Starting;
        }

        if let Err(err) = framework.config().validate() {
            *self.state.lock().await = ManagerState::Stopped;
            return Err(err);
        }

        let start_result = framework.start().await;

        let mut state = self.state.lock().await;
        match start_result {
            Ok(()) => {
                *self.framework.lock().await = Some(framework);
                *state = ManagerState::Running;
                info!("server started");
                Ok(())
            }
            Err(err) => {
                *state = ManagerState::Stopped;
                Err(err)
            }
        }
    }

    pub async fn stop(&self) -> WebResult<()> {
        {
            let mut state = self.state.lock().await;
            if *state != ManagerState::Running {
                return Err(WebError::ServerNotRunning);
            }
            *state = ManagerState::Stopping;
        }

        let taken = self.framework.lock().await.take();
        let result = match taken {
            Some(mut framework) => framework.stop().await,
            None => Ok(()),
        };

        *self.state.lock().await = ManagerState::Stopped;
        result
    }

    /// Starts `framework`, blocks until Ctrl+C/SIGTERM, then stops within
    /// `shutdown`'s timeout. Returns the process exit code (§6: 0 clean, 1
    /// on a start/stop failure or a shutdown that overran its timeout).
    pub async fn run_until_signal(
        &self,
        framework: Box<dyn WebFramework>,
        shutdown: &GracefulShutdownConfig,
    ) -> i32 {
        if let Err(err) = self.start(framework).await {
            error!(error = %err, "server failed to start");
            return 1;
        }

        wait_for_shutdown_signal().await;
        info!("shutdown signal received");

        self.graceful_stop(shutdown).await
    }

    /// The post-signal half of [`run_until_signal`], split out so it is
    /// directly testable without raising a real OS signal: waits
    /// `pre_stop_wait`, then stops bounded by `timeout`, forcing the state
    /// back to `Stopped` if that bound elapses first.
    async fn graceful_stop(&self, shutdown: &GracefulShutdownConfig) -> i32 {
        if shutdown.pre_stop_wait > Duration::ZERO {
            tokio::time::sleep(shutdown.pre_stop_wait).await;
        }

        if shutdown.enabled && shutdown.timeout > Duration::ZERO {
            match tokio::time::timeout(shutdown.timeout, self.stop()).await {
                Ok(Ok(())) => 0,
                Ok(Err(err)) => {
                    error!(error = %err, "server failed to stop cleanly");
                    1
                }
                Err(_) => {
                    // `self.stop()` was dropped mid-flight by the timeout, so
                    // it never reached its own `state = Stopped` write (§8:
                    // "Stop with a context whose deadline has already passed
                    // -> immediate forced termination; manager ends in
                    // Stopped"). Force the flip here instead of leaving the
                    // manager wedged in `Stopping` forever.
                    *self.state.lock().await = ManagerState::Stopped;
                    self.framework.lock().await.take();
                    error!(timeout = ?shutdown.timeout, "graceful shutdown timed out, forcing termination");
                    1
                }
            }
        } else {
            match self.stop().await {
                Ok(()) => 0,
                Err(err) => {
                    error!(error = %err, "server failed to stop cleanly");
                    1
                }
            }
        }
    }
}

impl Default for ServerManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C");
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received Ctrl+C");
    }
}
