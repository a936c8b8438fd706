//! Typed routes and the envelopes that travel on them

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// The three long-lived participants of the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentName {
    Observer,
    TaskManager,
    Executor,
}

impl AgentName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Observer => "observer",
            AgentName::TaskManager => "task-manager",
            AgentName::Executor => "executor",
        }
    }

    /// Log prefix, e.g. `TASK_MANAGER`
    pub fn tag(&self) -> &'static str {
        match self {
            AgentName::Observer => "OBSERVER",
            AgentName::TaskManager => "TASK_MANAGER",
            AgentName::Executor => "EXECUTOR",
        }
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A one-way channel between two agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Route {
    ObserverToTaskManager,
    TaskManagerToExecutor,
    ExecutorToTaskManager,
    TaskManagerToObserver,
}

impl Route {
    pub const ALL: [Route; 4] = [
        Route::ObserverToTaskManager,
        Route::TaskManagerToExecutor,
        Route::ExecutorToTaskManager,
        Route::TaskManagerToObserver,
    ];

    pub fn source(&self) -> AgentName {
        match self {
            Route::ObserverToTaskManager => AgentName::Observer,
            Route::TaskManagerToExecutor | Route::TaskManagerToObserver => AgentName::TaskManager,
            Route::ExecutorToTaskManager => AgentName::Executor,
        }
    }

    pub fn destination(&self) -> AgentName {
        match self {
            Route::ObserverToTaskManager | Route::ExecutorToTaskManager => AgentName::TaskManager,
            Route::TaskManagerToExecutor => AgentName::Executor,
            Route::TaskManagerToObserver => AgentName::Observer,
        }
    }
}

/// Renders the route key, e.g. `observer-task-manager`
impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.source(), self.destination())
    }
}

/// Pause request from the observer
#[derive(Debug, Clone, PartialEq)]
pub struct IdleSignal {
    pub reason: String,
    pub wait: Duration,
}

/// What the observer hands to the task manager
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Report { report: String },
    Idle(IdleSignal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchInstruction {
    pub instruction: String,
    /// The observer report the instruction came from
    pub report: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub result: String,
    /// Echo of the originating report, so the task manager can synthesize without state
    pub report: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleFeedback {
    pub result: String,
    pub report: String,
}

/// A message in flight. The variant fixes the route it travels on.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    ObserverToTaskManager(Observation),
    TaskManagerToExecutor(DispatchInstruction),
    ExecutorToTaskManager(ExecutionResult),
    /// `None` restarts the cycle after an idle wait
    TaskManagerToObserver(Option<CycleFeedback>),
}

impl Envelope {
    pub fn route(&self) -> Route {
        match self {
            Envelope::ObserverToTaskManager(_) => Route::ObserverToTaskManager,
            Envelope::TaskManagerToExecutor(_) => Route::TaskManagerToExecutor,
            Envelope::ExecutorToTaskManager(_) => Route::ExecutorToTaskManager,
            Envelope::TaskManagerToObserver(_) => Route::TaskManagerToObserver,
        }
    }

    /// Flat key/value view of the payload, for events and logs
    pub fn payload_json(&self) -> Value {
        match self {
            Envelope::ObserverToTaskManager(Observation::Report { report }) => {
                json!({ "report": report })
            }
            Envelope::ObserverToTaskManager(Observation::Idle(idle)) => json!({
                "noFurtherActions": true,
                "waitTime": idle.wait.as_millis() as u64,
                "reason": idle.reason,
            }),
            Envelope::TaskManagerToExecutor(dispatch) => json!({
                "result": dispatch.instruction,
                "report": dispatch.report,
            }),
            Envelope::ExecutorToTaskManager(execution) => json!({
                "result": execution.result,
                "report": execution.report,
            }),
            Envelope::TaskManagerToObserver(Some(feedback)) => json!({
                "result": feedback.result,
                "report": feedback.report,
            }),
            Envelope::TaskManagerToObserver(None) => Value::Null,
        }
    }
}
