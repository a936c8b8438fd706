//! The contract every participant of the cycle implements

use crate::ai::{AiClient, AiError, StepRecord};
use crate::gateway::{EventBroadcaster, GatewayEvent};
use crate::memory::{save_thought_best_effort, AgentMemory, Thought};
use crate::orchestration::messages::{AgentName, Envelope};
use crate::tools::ToolContext;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum AgentError {
    /// The decision capability failed
    Decision(AiError),
    /// The cancellation token fired at a suspension point
    Cancelled,
    Internal(String),
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::Decision(e) => write!(f, "decision failed: {}", e),
            AgentError::Cancelled => write!(f, "cancelled"),
            AgentError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<AiError> for AgentError {
    fn from(err: AiError) -> Self {
        AgentError::Decision(err)
    }
}

/// A named participant. Agents return their follow-up envelope instead of
/// emitting it, so they never hold a reference to the bus.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> AgentName;

    /// Handle one envelope. Envelopes on routes the agent does not consume
    /// are ignored with `Ok(None)`.
    async fn handle_event(
        &self,
        envelope: Envelope,
        cancel: &CancellationToken,
    ) -> Result<Option<Envelope>, AgentError>;
}

/// Collaborators shared by the agents
#[derive(Clone)]
pub struct AgentDeps {
    pub ai: Arc<AiClient>,
    pub memory: Arc<dyn AgentMemory>,
    pub broadcaster: Option<Arc<EventBroadcaster>>,
}

impl AgentDeps {
    pub fn new(ai: Arc<AiClient>, memory: Arc<dyn AgentMemory>) -> Self {
        Self {
            ai,
            memory,
            broadcaster: None,
        }
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<EventBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn broadcast(&self, event: GatewayEvent) {
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.broadcast(event);
        }
    }

    pub fn action(&self, agent: AgentName, action: &str) {
        log::info!("[{}] {}", agent.tag(), action);
        self.broadcast(GatewayEvent::agent_action(agent, action));
    }

    pub fn respond(&self, agent: AgentName, text: &str) {
        self.broadcast(GatewayEvent::agent_response(agent, text));
    }

    /// Tool context carrying the report store and broadcaster
    pub fn tool_context(&self, agent: AgentName) -> ToolContext {
        ToolContext::new(agent)
            .with_memory(self.memory.clone())
            .with_broadcaster(self.broadcaster.clone())
    }

    /// Step callback: logs the tools called and appends non-empty text to the thought log
    pub fn step_logger(&self, agent: AgentName) -> impl Fn(&StepRecord) + Send + Sync + '_ {
        move |step: &StepRecord| {
            let called = if step.tool_calls.is_empty() {
                "none".to_string()
            } else {
                step.tool_calls
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            log::info!("[{}] step finished. tools called: {}", agent.tag(), called);

            if !step.text.trim().is_empty() {
                save_thought_best_effort(
                    self.memory.as_ref(),
                    &Thought {
                        agent,
                        text: step.text.clone(),
                        tool_calls: step.tool_calls.clone(),
                        tool_results: step.tool_results.clone(),
                    },
                );
            }
        }
    }
}
