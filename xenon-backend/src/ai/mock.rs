//! Scripted AI client used by tests
//!
//! Responses are consumed in order. Every call is recorded as a `TraceEntry`
//! so tests can assert what each agent sent to the model.

use crate::ai::types::{AiError, AiResponse, ToolHistoryEntry};
use crate::ai::Message;
use crate::tools::ToolDefinition;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

/// One INPUT/OUTPUT pair captured by the mock
#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub iteration: usize,
    pub input_messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub history_rounds: usize,
    pub output: Option<AiResponse>,
    pub error: Option<String>,
}

pub struct MockAiClient {
    responses: Mutex<VecDeque<Result<AiResponse, AiError>>>,
    fallback: Option<AiResponse>,
    trace: Mutex<Vec<TraceEntry>>,
}

impl MockAiClient {
    pub fn new(responses: Vec<Result<AiResponse, AiError>>) -> Self {
        MockAiClient {
            responses: Mutex::new(responses.into()),
            fallback: None,
            trace: Mutex::new(Vec::new()),
        }
    }

    /// Answer with `response` once the scripted queue is exhausted
    pub fn with_fallback(mut self, response: AiResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    pub async fn generate_with_tools(
        &self,
        messages: Vec<Message>,
        tool_history: &[ToolHistoryEntry],
        tools: &[ToolDefinition],
    ) -> Result<AiResponse, AiError> {
        let next = self.responses.lock().pop_front();
        let result = match next {
            Some(r) => r,
            None => match &self.fallback {
                Some(fallback) => Ok(fallback.clone()),
                None => Err(AiError::new("MockAiClient: no more scripted responses")),
            },
        };

        let mut trace = self.trace.lock();
        let iteration = trace.len() + 1;
        log::debug!(
            "[MOCK_AI] Call {} with {} messages, {} tools, {} history rounds",
            iteration,
            messages.len(),
            tools.len(),
            tool_history.len()
        );
        trace.push(TraceEntry {
            iteration,
            input_messages: messages,
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            history_rounds: tool_history.len(),
            output: result.as_ref().ok().cloned(),
            error: result.as_ref().err().map(|e| e.to_string()),
        });

        result
    }

    pub fn trace(&self) -> Vec<TraceEntry> {
        self.trace.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.trace.lock().len()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_responses_are_consumed_in_order() {
        let mock = MockAiClient::new(vec![
            Ok(AiResponse::text("first")),
            Err(AiError::new("boom")),
        ]);

        let first = mock.generate_with_tools(vec![Message::user("hi")], &[], &[]).await;
        assert_eq!(first.unwrap().content, "first");

        let second = mock.generate_with_tools(vec![], &[], &[]).await;
        assert_eq!(second.unwrap_err().message, "boom");

        let exhausted = mock.generate_with_tools(vec![], &[], &[]).await;
        assert!(exhausted.is_err());

        let trace = mock.trace();
        assert_eq!(trace.len(), 3);
        assert_eq!(trace[0].input_messages[0].content, "hi");
        assert_eq!(trace[1].error.as_deref(), Some("boom"));
        assert_eq!(mock.remaining(), 0);
    }

    #[tokio::test]
    async fn test_fallback_repeats_after_script() {
        let mock = MockAiClient::new(vec![Ok(AiResponse::text("scripted"))])
            .with_fallback(AiResponse::text("again"));

        let mut outputs = Vec::new();
        for _ in 0..3 {
            outputs.push(mock.generate_with_tools(vec![], &[], &[]).await.unwrap().content);
        }
        assert_eq!(outputs, vec!["scripted", "again", "again"]);
        assert_eq!(mock.call_count(), 3);
    }
}
