//! Observer: turns the state of the watched wallet into a report, or asks
//! the cycle to pause

use crate::ai::{decide, DecisionRequest, Message, ToolCall};
use crate::orchestration::agent::{Agent, AgentDeps, AgentError};
use crate::orchestration::messages::{AgentName, CycleFeedback, Envelope, IdleSignal, Observation};
use crate::tools::signals::NO_FURTHER_ACTIONS;
use crate::tools::Toolkit;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const STARTING_PROMPT: &str = "Based on the current market data and the tokens that you hold, generate a report explaining what steps could be taken.";

const NO_REPORT: &str = "No report was produced.";

const DEFAULT_IDLE_REASON: &str = "No further actions are needed.";

#[derive(Debug, Clone)]
pub struct ObserverSettings {
    pub network: String,
    pub step_limit: usize,
    /// Wait used when the model gives no usable wait time
    pub idle_default: Duration,
    pub idle_max: Duration,
}

pub struct ObserverAgent {
    deps: AgentDeps,
    toolkit: Arc<Toolkit>,
    target: RwLock<String>,
    settings: ObserverSettings,
}

impl ObserverAgent {
    pub fn new(
        deps: AgentDeps,
        toolkit: Arc<Toolkit>,
        target_address: impl Into<String>,
        settings: ObserverSettings,
    ) -> Self {
        Self {
            deps,
            toolkit,
            target: RwLock::new(target_address.into()),
            settings,
        }
    }

    pub fn target(&self) -> String {
        self.target.read().clone()
    }

    /// Watch a different address from the next observation on
    pub fn set_target(&self, address: impl Into<String>) {
        let address = address.into();
        log::info!("[OBSERVER] Now watching {}", address);
        *self.target.write() = address;
    }

    fn system_prompt(&self, target: &str) -> String {
        include_str!("prompts/observer.md")
            .replace("{address}", target)
            .replace("{network}", &self.settings.network)
    }

    /// `wait_time` is in seconds; anything unusable falls back to the default
    fn idle_wait(&self, call: &ToolCall) -> Duration {
        let secs = call.arguments.get("wait_time").and_then(|v| {
            v.as_f64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        });

        let wait = match secs {
            Some(s) if s.is_finite() && s > 0.0 => Duration::from_secs_f64(s),
            _ => {
                log::warn!(
                    "[OBSERVER] Unusable wait_time {:?}, waiting {}s",
                    call.arguments.get("wait_time"),
                    self.settings.idle_default.as_secs()
                );
                self.settings.idle_default
            }
        };
        wait.min(self.settings.idle_max)
    }

    /// Run one observation. With no feedback this is the start of a fresh
    /// cycle; with feedback the observer may decide to go idle.
    pub async fn start(
        &self,
        previous: Option<CycleFeedback>,
        cancel: &CancellationToken,
    ) -> Result<Envelope, AgentError> {
        let target = self.target();
        self.deps.action(AgentName::Observer, "Starting market analysis");

        let context = self.deps.tool_context(AgentName::Observer).with_target(target.clone());
        let on_step = self.deps.step_logger(AgentName::Observer);

        let (messages, is_feedback) = match previous {
            None => (vec![Message::user(STARTING_PROMPT)], false),
            Some(feedback) => {
                log::info!("[OBSERVER] received message from task-manager: {}", feedback.result);
                (
                    vec![
                        Message::assistant(feedback.report),
                        Message::user(format!(
                            "This is the feedback from the task executor agent:\n{}",
                            feedback.result
                        )),
                    ],
                    true,
                )
            }
        };

        let decision = decide(
            &self.deps.ai,
            DecisionRequest {
                system: self.system_prompt(&target),
                messages,
                toolkit: Some(&self.toolkit),
                step_limit: self.settings.step_limit,
            },
            &context,
            cancel,
            &on_step,
        )
        .await?;

        let idle_call = decision.signal(NO_FURTHER_ACTIONS);

        if is_feedback {
            if let Some(call) = idle_call {
                let wait = self.idle_wait(call);
                let reason = call.str_arg("reason").unwrap_or(DEFAULT_IDLE_REASON).to_string();
                log::info!("[OBSERVER] No further actions for {:?}: {}", wait, reason);
                self.deps.respond(AgentName::Observer, &reason);
                return Ok(Envelope::ObserverToTaskManager(Observation::Idle(IdleSignal {
                    reason,
                    wait,
                })));
            }
        }

        // A fresh cycle always reports, even if the model tried to go idle
        let report = if !decision.text.is_empty() {
            decision.text.clone()
        } else {
            idle_call
                .and_then(|call| call.str_arg("reason"))
                .unwrap_or(NO_REPORT)
                .to_string()
        };

        self.deps.respond(AgentName::Observer, &report);
        Ok(Envelope::ObserverToTaskManager(Observation::Report { report }))
    }
}

#[async_trait]
impl Agent for ObserverAgent {
    fn name(&self) -> AgentName {
        AgentName::Observer
    }

    async fn handle_event(
        &self,
        envelope: Envelope,
        cancel: &CancellationToken,
    ) -> Result<Option<Envelope>, AgentError> {
        match envelope {
            Envelope::TaskManagerToObserver(feedback) => self.start(feedback, cancel).await.map(Some),
            other => {
                log::debug!("[OBSERVER] Ignoring message on '{}'", other.route());
                Ok(None)
            }
        }
    }
}
