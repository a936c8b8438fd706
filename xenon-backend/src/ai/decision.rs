//! The bounded decision loop every agent runs against its model
//!
//! Each step is one model call. Executable tool calls are run through the
//! agent's toolkit and fed back as tool history; a call to a signal tool ends
//! the loop and is handed back to the agent as the decision. A toolkit made
//! only of signals also ends the loop on any call it does not recognize, so
//! the agent can apply its own default instead of the model trying again.

use crate::ai::{AiClient, Message, ToolCall, ToolHistoryEntry, ToolResponse};
use crate::orchestration::AgentError;
use crate::tools::{ToolContext, Toolkit};
use tokio_util::sync::CancellationToken;

/// Input for one decision
pub struct DecisionRequest<'a> {
    pub system: String,
    pub messages: Vec<Message>,
    pub toolkit: Option<&'a Toolkit>,
    pub step_limit: usize,
}

/// What happened during one step, handed to the step callback
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: usize,
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResponse>,
}

#[derive(Debug, Clone, Default)]
pub struct Decision {
    /// Last non-empty text the model produced
    pub text: String,
    /// Signal calls in the order the model made them. For a signal-only
    /// toolkit this is every call of the final step, unrecognized ones included.
    pub tool_calls: Vec<ToolCall>,
    pub steps: usize,
}

impl Decision {
    pub fn first_signal(&self) -> Option<&ToolCall> {
        self.tool_calls.first()
    }

    pub fn signal(&self, name: &str) -> Option<&ToolCall> {
        self.tool_calls.iter().find(|c| c.name == name)
    }
}

/// Run the decision loop until the model answers, selects a signal or runs out of steps
pub async fn decide(
    client: &AiClient,
    request: DecisionRequest<'_>,
    context: &ToolContext,
    cancel: &CancellationToken,
    on_step: &(dyn Fn(&StepRecord) + Send + Sync),
) -> Result<Decision, AgentError> {
    let DecisionRequest { system, messages, toolkit, step_limit } = request;
    let step_limit = step_limit.max(1);
    let tools = toolkit.map(|kit| kit.definitions()).unwrap_or_default();

    let mut conversation = Vec::with_capacity(messages.len() + 1);
    conversation.push(Message::system(system));
    conversation.extend(messages);

    let mut tool_history: Vec<ToolHistoryEntry> = Vec::new();
    let mut last_text = String::new();

    for step in 1..=step_limit {
        log::debug!("[DECIDE:{}] Step {} of {}", context.agent, step, step_limit);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
            r = client.generate_with_tools(conversation.clone(), &tool_history, tools.clone()) => r?,
        };

        log::debug!(
            "[DECIDE:{}] Response - content_len: {}, tool_calls: {}, stop_reason: {:?}",
            context.agent,
            response.content.len(),
            response.tool_calls.len(),
            response.stop_reason
        );

        if !response.content.trim().is_empty() {
            last_text = response.content.trim().to_string();
        }

        if response.tool_calls.is_empty() {
            on_step(&StepRecord {
                step,
                text: response.content,
                tool_calls: Vec::new(),
                tool_results: Vec::new(),
            });
            return Ok(Decision { text: last_text, tool_calls: Vec::new(), steps: step });
        }

        let (signals, executable): (Vec<ToolCall>, Vec<ToolCall>) = response
            .tool_calls
            .iter()
            .cloned()
            .partition(|call| toolkit.is_some_and(|kit| kit.is_signal(&call.name)));

        if !executable.is_empty() && toolkit.is_some_and(|kit| kit.is_signals_only()) {
            log::warn!(
                "[DECIDE:{}] Unrecognized tool call(s) at step {}: {}",
                context.agent,
                step,
                executable.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
            );
            let tool_calls = response.tool_calls.clone();
            on_step(&StepRecord {
                step,
                text: response.content,
                tool_calls: response.tool_calls,
                tool_results: Vec::new(),
            });
            return Ok(Decision { text: last_text, tool_calls, steps: step });
        }

        let tool_results = match (toolkit, executable.is_empty()) {
            (_, true) => Vec::new(),
            (Some(kit), false) => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                results = kit.execute_calls(&executable, context) => results,
            },
            (None, false) => executable
                .iter()
                .map(|call| {
                    ToolResponse::error(call.id.clone(), format!("Tool '{}' is not available", call.name))
                })
                .collect(),
        };

        on_step(&StepRecord {
            step,
            text: response.content,
            tool_calls: response.tool_calls,
            tool_results: tool_results.clone(),
        });

        if !signals.is_empty() {
            log::info!(
                "[DECIDE:{}] Signal selected at step {}: {}",
                context.agent,
                step,
                signals.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
            );
            return Ok(Decision { text: last_text, tool_calls: signals, steps: step });
        }

        tool_history.push(ToolHistoryEntry::new(executable, tool_results));
    }

    log::warn!(
        "[DECIDE:{}] Step limit ({}) reached without a final answer",
        context.agent,
        step_limit
    );
    Ok(Decision { text: last_text, tool_calls: Vec::new(), steps: step_limit })
}
