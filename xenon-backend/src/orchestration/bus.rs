//! In-process router from route to the one agent that handles it
//!
//! The table is filled during bootstrap through `&mut self` and is read-only
//! once the bus is shared, so delivery takes no locks. Delivery is a direct
//! call: no queue, no retry.

use crate::gateway::{EventBroadcaster, GatewayEvent};
use crate::orchestration::agent::{Agent, AgentError};
use crate::orchestration::messages::{AgentName, Envelope, Route};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum BusError {
    RouteAlreadyRegistered(Route),
    /// A handler failed; caught at the dispatch boundary
    Handler {
        route: Route,
        agent: AgentName,
        error: AgentError,
    },
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusError::RouteAlreadyRegistered(route) => {
                write!(f, "route '{}' already has a handler", route)
            }
            BusError::Handler { route, agent, error } => {
                write!(f, "{} failed handling '{}': {}", agent, route, error)
            }
        }
    }
}

impl std::error::Error for BusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BusError::Handler { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// How an `emit` chain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// A handler returned no follow-up
    Quiescent { hops: usize },
    /// The next envelope's route had no handler
    Dropped { route: Route, hops: usize },
    Cancelled { hops: usize },
}

impl EmitOutcome {
    pub fn hops(&self) -> usize {
        match self {
            EmitOutcome::Quiescent { hops }
            | EmitOutcome::Dropped { hops, .. }
            | EmitOutcome::Cancelled { hops } => *hops,
        }
    }
}

pub struct Bus {
    routes: HashMap<Route, Arc<dyn Agent>>,
    cancel: CancellationToken,
    broadcaster: Option<Arc<EventBroadcaster>>,
    /// Deliveries that closed the loop back to the observer
    completed_cycles: AtomicU64,
}

impl Bus {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            routes: HashMap::new(),
            cancel,
            broadcaster: None,
            completed_cycles: AtomicU64::new(0),
        }
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<EventBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Bind `agent` to `route`. A route takes exactly one handler.
    pub fn register(&mut self, route: Route, agent: Arc<dyn Agent>) -> Result<(), BusError> {
        if self.routes.contains_key(&route) {
            return Err(BusError::RouteAlreadyRegistered(route));
        }
        log::debug!("[BUS] Registered {} on '{}'", agent.name(), route);
        self.routes.insert(route, agent);
        Ok(())
    }

    /// Swap the handler of `route`, returning the previous one
    pub fn replace(&mut self, route: Route, agent: Arc<dyn Agent>) -> Option<Arc<dyn Agent>> {
        log::info!("[BUS] Replacing handler on '{}' with {}", route, agent.name());
        self.routes.insert(route, agent)
    }

    pub fn is_registered(&self, route: Route) -> bool {
        self.routes.contains_key(&route)
    }

    /// Registered routes in cycle order
    pub fn routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.routes.keys().copied().collect();
        routes.sort();
        routes
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Number of cycles that made it back to the observer
    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles.load(Ordering::SeqCst)
    }

    /// Deliver one envelope to its handler and return the follow-up.
    /// An unregistered route drops the envelope.
    pub async fn dispatch(&self, envelope: Envelope) -> Result<Option<Envelope>, BusError> {
        self.deliver(envelope, 1).await
    }

    /// Deliver `envelope` and every follow-up until the chain ends
    pub async fn emit(&self, envelope: Envelope) -> Result<EmitOutcome, BusError> {
        let mut hops = 0;
        let mut next = envelope;

        loop {
            if self.cancel.is_cancelled() {
                log::info!("[BUS] Cancelled after {} hop(s)", hops);
                return Ok(EmitOutcome::Cancelled { hops });
            }

            let route = next.route();
            if !self.is_registered(route) {
                log::debug!("[BUS] No handler for '{}', dropping message", route);
                return Ok(EmitOutcome::Dropped { route, hops });
            }

            hops += 1;
            match self.deliver(next, hops).await {
                Ok(Some(follow_up)) => next = follow_up,
                Ok(None) => return Ok(EmitOutcome::Quiescent { hops }),
                Err(BusError::Handler { error: AgentError::Cancelled, .. }) => {
                    log::info!("[BUS] Handler cancelled on hop {}", hops);
                    return Ok(EmitOutcome::Cancelled { hops });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn deliver(&self, envelope: Envelope, hop: usize) -> Result<Option<Envelope>, BusError> {
        let route = envelope.route();
        let agent = match self.routes.get(&route) {
            Some(agent) => agent.clone(),
            None => {
                log::debug!("[BUS] No handler for '{}', dropping message", route);
                return Ok(None);
            }
        };

        log::info!("[BUS] '{}' -> {} (hop {})", route, agent.name(), hop);
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.broadcast(GatewayEvent::route_delivered(
                &route.to_string(),
                hop,
                envelope.payload_json(),
            ));
        }

        if route == Route::TaskManagerToObserver {
            self.completed_cycles.fetch_add(1, Ordering::SeqCst);
        }

        match agent.handle_event(envelope, &self.cancel).await {
            Ok(follow_up) => Ok(follow_up),
            Err(AgentError::Cancelled) => Err(BusError::Handler {
                route,
                agent: agent.name(),
                error: AgentError::Cancelled,
            }),
            Err(error) => {
                log::error!("[BUS] {} failed on '{}': {}", agent.name(), route, error);
                if let Some(broadcaster) = &self.broadcaster {
                    broadcaster.broadcast(GatewayEvent::agent_error(
                        &route.to_string(),
                        agent.name(),
                        &error.to_string(),
                    ));
                }
                Err(BusError::Handler {
                    route,
                    agent: agent.name(),
                    error,
                })
            }
        }
    }
}
