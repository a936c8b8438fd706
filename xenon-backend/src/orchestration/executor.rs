//! Executor: instruction in, outcome text out. The only agent holding the
//! signing account, so the only one whose tools change anything on chain.

use crate::ai::{decide, DecisionRequest, Message, StepRecord};
use crate::orchestration::agent::{Agent, AgentDeps, AgentError};
use crate::orchestration::messages::{AgentName, DispatchInstruction, Envelope, ExecutionResult};
use crate::tools::builtin::ExecutionAccount;
use crate::tools::Toolkit;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const NO_RESULT: &str = "Execution finished without a textual result.";

pub struct ExecutorAgent {
    deps: AgentDeps,
    toolkit: Arc<Toolkit>,
    account: Arc<ExecutionAccount>,
    step_limit: usize,
}

impl ExecutorAgent {
    pub fn new(
        deps: AgentDeps,
        toolkit: Arc<Toolkit>,
        account: Arc<ExecutionAccount>,
        step_limit: usize,
    ) -> Self {
        Self {
            deps,
            toolkit,
            account,
            step_limit,
        }
    }

    async fn execute(
        &self,
        dispatch: DispatchInstruction,
        cancel: &CancellationToken,
    ) -> Result<Envelope, AgentError> {
        self.deps.action(AgentName::Executor, &format!("Executing task: {}", dispatch.instruction));

        let context = self
            .deps
            .tool_context(AgentName::Executor)
            .with_account(self.account.clone())
            .with_target(self.account.address_string());

        let system = include_str!("prompts/executor.md")
            .replace("{address}", &self.account.address_string())
            .replace("{network}", self.account.chain_name());

        let prompt = format!(
            "Execute the following task:\n{}\n\nContext report from the observer agent:\n{}",
            dispatch.instruction, dispatch.report
        );

        let last_tool_result: Mutex<Option<String>> = Mutex::new(None);
        let log_step = self.deps.step_logger(AgentName::Executor);
        let on_step = |step: &StepRecord| {
            log_step(step);
            if let Some(result) = step.tool_results.last() {
                *last_tool_result.lock() = Some(result.content.clone());
            }
        };

        let decision = decide(
            &self.deps.ai,
            DecisionRequest {
                system,
                messages: vec![Message::user(prompt)],
                toolkit: Some(&self.toolkit),
                step_limit: self.step_limit,
            },
            &context,
            cancel,
            &on_step,
        )
        .await?;

        let result = if !decision.text.is_empty() {
            decision.text
        } else {
            last_tool_result
                .lock()
                .take()
                .unwrap_or_else(|| NO_RESULT.to_string())
        };

        log::info!("[EXECUTOR] Finished after {} step(s)", decision.steps);
        self.deps.respond(AgentName::Executor, &result);

        Ok(Envelope::ExecutorToTaskManager(ExecutionResult {
            result,
            report: dispatch.report,
        }))
    }
}

#[async_trait]
impl Agent for ExecutorAgent {
    fn name(&self) -> AgentName {
        AgentName::Executor
    }

    async fn handle_event(
        &self,
        envelope: Envelope,
        cancel: &CancellationToken,
    ) -> Result<Option<Envelope>, AgentError> {
        match envelope {
            Envelope::TaskManagerToExecutor(dispatch) => self.execute(dispatch, cancel).await.map(Some),
            other => {
                log::debug!("[EXECUTOR] Ignoring message on '{}'", other.route());
                Ok(None)
            }
        }
    }
}
