//! Task manager: the branch point of the cycle
//!
//! A report is routed either to the executor or back to the observer. An
//! execution result is synthesized into a stored report and fed back to the
//! observer. An idle signal pauses the cycle; it is the only place the cycle
//! waits on purpose.

use crate::ai::{decide, AiClient, Decision, DecisionRequest, Message};
use crate::gateway::GatewayEvent;
use crate::orchestration::agent::{Agent, AgentDeps, AgentError};
use crate::orchestration::messages::{
    AgentName, CycleFeedback, DispatchInstruction, Envelope, ExecutionResult, IdleSignal, Observation,
};
use crate::tools::signals::{SEND_MESSAGE_TO_EXECUTOR, SEND_MESSAGE_TO_OBSERVER};
use crate::tools::{task_manager_toolkit, Toolkit};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Guidance sent back to the observer when the decision is missing or malformed
pub const DEFAULT_GUIDANCE: &str = "Generate a new report.";

/// Where a report goes next
#[derive(Debug, Clone, PartialEq)]
enum Routing {
    Dispatch(String),
    Feedback(String),
}

/// First recognized signal wins; anything else degrades to default guidance
fn route_decision(decision: &Decision) -> Routing {
    for call in &decision.tool_calls {
        match call.name.as_str() {
            SEND_MESSAGE_TO_EXECUTOR => {
                return match call.str_arg("message") {
                    Some(instruction) => Routing::Dispatch(instruction.to_string()),
                    None => {
                        log::warn!("[TASK_MANAGER] Executor message without instructions, asking for a new report");
                        Routing::Feedback(DEFAULT_GUIDANCE.to_string())
                    }
                };
            }
            SEND_MESSAGE_TO_OBSERVER => {
                return Routing::Feedback(
                    call.str_arg("message").unwrap_or(DEFAULT_GUIDANCE).to_string(),
                );
            }
            other => log::warn!("[TASK_MANAGER] Ignoring unexpected tool call '{}'", other),
        }
    }
    Routing::Feedback(DEFAULT_GUIDANCE.to_string())
}

pub struct TaskManagerAgent {
    deps: AgentDeps,
    /// Separate, cheaper model for the closing report
    report_ai: Arc<AiClient>,
    toolkit: Toolkit,
    step_limit: usize,
}

impl TaskManagerAgent {
    pub fn new(deps: AgentDeps, report_ai: Arc<AiClient>, step_limit: usize) -> Self {
        Self {
            deps,
            report_ai,
            toolkit: task_manager_toolkit(),
            step_limit,
        }
    }

    async fn handle_idle(
        &self,
        idle: IdleSignal,
        cancel: &CancellationToken,
    ) -> Result<Option<Envelope>, AgentError> {
        let wait_ms = idle.wait.as_millis() as u64;
        log::info!("[TASK_MANAGER] Waiting {}ms before the next observation: {}", wait_ms, idle.reason);
        self.deps.broadcast(GatewayEvent::cycle_idle(wait_ms, &idle.reason));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
            _ = tokio::time::sleep(idle.wait) => {}
        }

        Ok(Some(Envelope::TaskManagerToObserver(None)))
    }

    async fn handle_report(
        &self,
        report: String,
        cancel: &CancellationToken,
    ) -> Result<Option<Envelope>, AgentError> {
        self.deps.action(AgentName::TaskManager, "Deciding on the observer report");

        let prompt = format!(
            "Given the report that follows, decide to generate one or more tasks to be executed.\n\nObserver agent report:\n{}\n\nDecide whether you want to use the {} or {} tool. You must use one of them.",
            report, SEND_MESSAGE_TO_OBSERVER, SEND_MESSAGE_TO_EXECUTOR
        );

        let on_step = self.deps.step_logger(AgentName::TaskManager);
        let decision = decide(
            &self.deps.ai,
            DecisionRequest {
                system: include_str!("prompts/task_manager.md").to_string(),
                messages: vec![Message::user(prompt)],
                toolkit: Some(&self.toolkit),
                step_limit: self.step_limit,
            },
            &self.deps.tool_context(AgentName::TaskManager),
            cancel,
            &on_step,
        )
        .await?;

        match route_decision(&decision) {
            Routing::Dispatch(instruction) => {
                log::info!("[TASK_MANAGER] Dispatching to executor: {}", instruction);
                self.deps.respond(AgentName::TaskManager, &instruction);
                Ok(Some(Envelope::TaskManagerToExecutor(DispatchInstruction {
                    instruction,
                    report,
                })))
            }
            Routing::Feedback(guidance) => {
                log::info!("[TASK_MANAGER] Sending back to observer: {}", guidance);
                self.deps.respond(AgentName::TaskManager, &guidance);
                Ok(Some(Envelope::TaskManagerToObserver(Some(CycleFeedback {
                    result: guidance,
                    report,
                }))))
            }
        }
    }

    async fn handle_execution_result(
        &self,
        execution: ExecutionResult,
        cancel: &CancellationToken,
    ) -> Result<Option<Envelope>, AgentError> {
        self.deps.action(AgentName::TaskManager, "Writing the final report");

        let prompt = format!(
            "Given the following report and result, generate a report to be sent to the observer agent about the execution of the tasks.\n\nObserver agent report:\n{}\n\nExecutor agent result:\n{}",
            execution.report, execution.result
        );

        let on_step = self.deps.step_logger(AgentName::TaskManager);
        let decision = decide(
            &self.report_ai,
            DecisionRequest {
                system: include_str!("prompts/final_report.md").to_string(),
                messages: vec![Message::user(prompt)],
                toolkit: None,
                step_limit: 1,
            },
            &self.deps.tool_context(AgentName::TaskManager),
            cancel,
            &on_step,
        )
        .await?;

        let synthesized = if decision.text.is_empty() {
            log::warn!("[TASK_MANAGER] Empty final report, forwarding the executor result");
            execution.result
        } else {
            decision.text
        };

        match self.deps.memory.store_report(&synthesized) {
            Ok(id) => self.deps.broadcast(GatewayEvent::report_stored(Some(id), &synthesized)),
            Err(e) => log::warn!("[TASK_MANAGER] Failed to store report: {}", e),
        }

        self.deps.respond(AgentName::TaskManager, &synthesized);
        Ok(Some(Envelope::TaskManagerToObserver(Some(CycleFeedback {
            result: synthesized,
            report: execution.report,
        }))))
    }
}

#[async_trait]
impl Agent for TaskManagerAgent {
    fn name(&self) -> AgentName {
        AgentName::TaskManager
    }

    async fn handle_event(
        &self,
        envelope: Envelope,
        cancel: &CancellationToken,
    ) -> Result<Option<Envelope>, AgentError> {
        match envelope {
            Envelope::ObserverToTaskManager(Observation::Idle(idle)) => self.handle_idle(idle, cancel).await,
            Envelope::ObserverToTaskManager(Observation::Report { report }) => {
                self.handle_report(report, cancel).await
            }
            Envelope::ExecutorToTaskManager(execution) => {
                self.handle_execution_result(execution, cancel).await
            }
            other => {
                log::debug!("[TASK_MANAGER] Ignoring message on '{}'", other.route());
                Ok(None)
            }
        }
    }
}
