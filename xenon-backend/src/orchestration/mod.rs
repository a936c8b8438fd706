//! The autonomous cycle: observer, task manager and executor talking over a bus

pub mod agent;
pub mod bootstrap;
pub mod bus;
pub mod executor;
pub mod messages;
pub mod observer;
pub mod restart;
pub mod task_manager;

#[cfg(test)]
mod orchestration_tests;

pub use agent::{Agent, AgentDeps, AgentError};
pub use bootstrap::{wire, Orchestrator, OrchestratorError};
pub use bus::{Bus, BusError, EmitOutcome};
pub use executor::ExecutorAgent;
pub use messages::{
    AgentName, CycleFeedback, DispatchInstruction, Envelope, ExecutionResult, IdleSignal,
    Observation, Route,
};
pub use observer::{ObserverAgent, ObserverSettings};
pub use restart::RestartPolicy;
pub use task_manager::{TaskManagerAgent, DEFAULT_GUIDANCE};
