//! Wiring and lifecycle of the cycle
//!
//! `wire` is the only place the topology is written down. `Orchestrator`
//! owns the frozen bus and its cancellation token and runs one cycle chain
//! at a time.

use crate::gateway::{EventBroadcaster, GatewayEvent};
use crate::orchestration::agent::{Agent, AgentError};
use crate::orchestration::bus::{Bus, BusError, EmitOutcome};
use crate::orchestration::messages::{AgentName, Route};
use crate::orchestration::observer::ObserverAgent;
use crate::orchestration::restart::{RestartBackoff, RestartPolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Register the four routes of the cycle
pub fn wire(
    bus: &mut Bus,
    observer: Arc<dyn Agent>,
    task_manager: Arc<dyn Agent>,
    executor: Arc<dyn Agent>,
) -> Result<(), BusError> {
    bus.register(Route::ObserverToTaskManager, task_manager.clone())?;
    bus.register(Route::TaskManagerToExecutor, executor)?;
    bus.register(Route::ExecutorToTaskManager, task_manager)?;
    bus.register(Route::TaskManagerToObserver, observer)?;
    Ok(())
}

#[derive(Debug)]
pub enum OrchestratorError {
    /// A cycle chain is already running
    CycleInFlight,
    Bus(BusError),
    Agent(AgentError),
    RestartLimitReached(u32),
}

impl std::fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorError::CycleInFlight => write!(f, "a cycle is already in flight"),
            OrchestratorError::Bus(e) => write!(f, "{}", e),
            OrchestratorError::Agent(e) => write!(f, "observer failed: {}", e),
            OrchestratorError::RestartLimitReached(n) => {
                write!(f, "gave up after {} consecutive restarts", n)
            }
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrchestratorError::Bus(e) => Some(e),
            OrchestratorError::Agent(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BusError> for OrchestratorError {
    fn from(err: BusError) -> Self {
        OrchestratorError::Bus(err)
    }
}

impl From<AgentError> for OrchestratorError {
    fn from(err: AgentError) -> Self {
        OrchestratorError::Agent(err)
    }
}

/// Clears the in-flight flag when a run ends, however it ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Orchestrator {
    bus: Arc<Bus>,
    observer: Arc<ObserverAgent>,
    broadcaster: Option<Arc<EventBroadcaster>>,
    in_flight: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        observer: Arc<ObserverAgent>,
        task_manager: Arc<dyn Agent>,
        executor: Arc<dyn Agent>,
        broadcaster: Option<Arc<EventBroadcaster>>,
    ) -> Result<Self, OrchestratorError> {
        let mut bus = Bus::new(CancellationToken::new());
        if let Some(broadcaster) = &broadcaster {
            bus = bus.with_broadcaster(broadcaster.clone());
        }
        wire(&mut bus, observer.clone(), task_manager, executor)?;

        log::info!(
            "[ORCHESTRATOR] Wired routes: {}",
            bus.routes().iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
        );

        Ok(Self {
            bus: Arc::new(bus),
            observer,
            broadcaster,
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        self.bus.cancellation_token()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run one cycle chain: a fresh observation, then every follow-up until
    /// the bus reports an outcome
    pub async fn run(&self) -> Result<EmitOutcome, OrchestratorError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("[ORCHESTRATOR] Refusing to start a second cycle");
            return Err(OrchestratorError::CycleInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        log::info!("[ORCHESTRATOR] Starting a fresh cycle");
        let first = match self.observer.start(None, self.cancellation_token()).await {
            Ok(envelope) => envelope,
            Err(AgentError::Cancelled) => return Ok(EmitOutcome::Cancelled { hops: 0 }),
            Err(e) => {
                log::error!("[ORCHESTRATOR] Observer failed to start the cycle: {}", e);
                if let Some(broadcaster) = &self.broadcaster {
                    broadcaster.broadcast(GatewayEvent::agent_error(
                        "start",
                        AgentName::Observer,
                        &e.to_string(),
                    ));
                }
                return Err(e.into());
            }
        };

        Ok(self.bus.emit(first).await?)
    }

    /// Keep running cycles, restarting failed ones with backoff, until shutdown
    pub async fn run_with_restarts(&self, policy: RestartPolicy) -> Result<(), OrchestratorError> {
        let mut backoff = RestartBackoff::from_policy(&policy);

        loop {
            let cycles_before = self.bus.completed_cycles();
            let delay = match self.run().await {
                Ok(EmitOutcome::Cancelled { hops }) => {
                    log::info!("[ORCHESTRATOR] Cycle cancelled after {} hop(s)", hops);
                    return Ok(());
                }
                Ok(outcome) => {
                    // Only a miswired or custom graph ends a chain on its own
                    log::warn!("[ORCHESTRATOR] Cycle chain ended: {:?}", outcome);
                    backoff.record_success();
                    policy.min_backoff
                }
                Err(OrchestratorError::CycleInFlight) => return Err(OrchestratorError::CycleInFlight),
                Err(e) => {
                    // A run that closed at least one cycle before failing breaks the failure streak
                    if self.bus.completed_cycles() > cycles_before {
                        backoff.record_success();
                    }
                    let delay = backoff.record_error();
                    if let Some(max) = policy.max_restarts {
                        if backoff.consecutive_failures() > max {
                            log::error!("[ORCHESTRATOR] Cycle failed: {}. Giving up", e);
                            return Err(OrchestratorError::RestartLimitReached(max));
                        }
                    }
                    log::error!("[ORCHESTRATOR] Cycle failed: {}. Restarting in {:?}", e, delay);
                    delay
                }
            };

            if !self.wait(delay).await {
                log::info!("[ORCHESTRATOR] Shutdown during restart wait");
                return Ok(());
            }
        }
    }

    /// Returns false if cancelled while waiting
    async fn wait(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancellation_token().cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Cancel every suspension point of the running cycle
    pub fn shutdown(&self) {
        log::info!("[ORCHESTRATOR] Shutting down");
        self.cancellation_token().cancel();
    }
}
