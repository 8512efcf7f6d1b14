//! Backend startup and readiness polling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::locator::BackendLocator;
use crate::gateway::GatewayError;
use crate::host::{HostBridge, HostMode, START_BACKEND};

/// Why the backend never became usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapFailure {
    /// The host could not launch the backend process.
    Start(String),
    /// The backend never answered a health probe.
    Timeout { attempts: u32 },
}

impl std::fmt::Display for BootstrapFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapFailure::Start(detail) => write!(f, "failed to start backend: {detail}"),
            BootstrapFailure::Timeout { attempts } => {
                write!(f, "backend did not become ready after {attempts} attempts")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapState {
    NotStarted,
    StartingProcess,
    PollingReadiness,
    Ready,
    Failed(BootstrapFailure),
}

impl BootstrapState {
    pub fn is_ready(&self) -> bool {
        matches!(self, BootstrapState::Ready)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BootstrapState::Ready | BootstrapState::Failed(_))
    }
}

impl std::fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapState::NotStarted => write!(f, "not started"),
            BootstrapState::StartingProcess => write!(f, "starting backend"),
            BootstrapState::PollingReadiness => write!(f, "waiting for backend"),
            BootstrapState::Ready => write!(f, "ready"),
            BootstrapState::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// A cheap request that succeeds once the backend can serve traffic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> Result<(), GatewayError>;
}

/// How readiness is polled.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPolicy {
    pub interval: Duration,
    /// `None` polls forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: Some(120),
        }
    }
}

/// Drives the backend from "not started" to ready or failed.
///
/// In standalone mode there is nothing to start and the state goes straight
/// to [`BootstrapState::Ready`]. In hosted mode the host is asked to start the
/// backend exactly once, then the health probe runs on a fixed interval.
pub struct Bootstrapper {
    mode: HostMode,
    host: Arc<dyn HostBridge>,
    locator: Arc<BackendLocator>,
    probe: Arc<dyn HealthProbe>,
    policy: ReadinessPolicy,
    state: watch::Sender<BootstrapState>,
    process_started: AtomicBool,
    in_flight: AtomicBool,
}

impl Bootstrapper {
    pub fn new(
        mode: HostMode,
        host: Arc<dyn HostBridge>,
        locator: Arc<BackendLocator>,
        probe: Arc<dyn HealthProbe>,
    ) -> Self {
        let (state, _) = watch::channel(BootstrapState::NotStarted);
        Self {
            mode,
            host,
            locator,
            probe,
            policy: ReadinessPolicy::default(),
            state,
            process_started: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> BootstrapState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BootstrapState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: BootstrapState) {
        info!(state = %next, "bootstrap state changed");
        self.state.send_replace(next);
    }

    /// Run the bootstrap sequence to completion.
    ///
    /// Returns the current state without doing anything when it is already
    /// terminal or another run is in flight.
    pub async fn run(&self) -> BootstrapState {
        let current = self.state();
        if current.is_terminal() {
            return current;
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("bootstrap already in flight");
            return current;
        }
        let _guard = InFlight(&self.in_flight);

        let outcome = match self.mode {
            HostMode::Standalone => BootstrapState::Ready,
            HostMode::Hosted => self.bootstrap_hosted().await,
        };
        self.set_state(outcome.clone());
        outcome
    }

    /// Run in a background task owned by the returned handle.
    pub fn spawn(self: &Arc<Self>) -> BootstrapHandle {
        let this = Arc::clone(self);
        let task = tokio::spawn(async move { this.run().await });
        BootstrapHandle {
            bootstrapper: Arc::clone(self),
            task: Some(task),
        }
    }

    async fn bootstrap_hosted(&self) -> BootstrapState {
        self.set_state(BootstrapState::StartingProcess);

        // A (re)started backend may listen somewhere else.
        self.locator.invalidate_port().await;

        if !self.process_started.swap(true, Ordering::SeqCst) {
            info!("asking host to start backend");
            // Cancelled before the host answered: the next run asks again.
            let attempt = StartAttempt::new(&self.process_started);
            let result = self.host.invoke(START_BACKEND, None).await;
            attempt.settle();

            if let Err(e) = result {
                error!(error = %e, "host failed to start backend");
                return BootstrapState::Failed(BootstrapFailure::Start(e.to_string()));
            }
        }

        self.set_state(BootstrapState::PollingReadiness);
        self.poll_readiness().await
    }

    async fn poll_readiness(&self) -> BootstrapState {
        let period = self.policy.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempts: u32 = 0;
        loop {
            ticker.tick().await;
            attempts += 1;

            match self.probe.probe().await {
                Ok(()) => {
                    info!(attempts, "backend is ready");
                    return BootstrapState::Ready;
                }
                // Expected while the backend warms up.
                Err(e) => debug!(attempt = attempts, error = %e, "backend not ready yet"),
            }

            if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                warn!(attempts, "gave up waiting for backend");
                return BootstrapState::Failed(BootstrapFailure::Timeout { attempts });
            }
        }
    }
}

/// Clears the started flag unless the host call ran to completion.
struct StartAttempt<'a> {
    started: &'a AtomicBool,
    settled: bool,
}

impl<'a> StartAttempt<'a> {
    fn new(started: &'a AtomicBool) -> Self {
        Self {
            started,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for StartAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.started.store(false, Ordering::SeqCst);
        }
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns a spawned bootstrap run; dropping it cancels the polling task.
pub struct BootstrapHandle {
    bootstrapper: Arc<Bootstrapper>,
    task: Option<JoinHandle<BootstrapState>>,
}

impl BootstrapHandle {
    /// Wait for the run to finish and return the final state.
    ///
    /// Dropping this future before it completes cancels the run.
    pub async fn wait(mut self) -> BootstrapState {
        match self.task.as_mut() {
            Some(task) => match task.await {
                Ok(state) => state,
                Err(e) => {
                    warn!(error = %e, "bootstrap task ended abnormally");
                    self.bootstrapper.state()
                }
            },
            None => self.bootstrapper.state(),
        }
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for BootstrapHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("cancelling bootstrap task");
            }
            task.abort();
        }
    }
}
