pub mod decision;
pub mod mock;
pub mod openai;
pub mod types;

pub use decision::{decide, Decision, DecisionRequest, StepRecord};
pub use mock::{MockAiClient, TraceEntry};
pub use openai::OpenAIClient;
pub use types::{AiError, AiResponse, ToolCall, ToolHistoryEntry, ToolResponse};

use crate::tools::ToolDefinition;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message { role: MessageRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message { role: MessageRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message { role: MessageRole::Assistant, content: content.into() }
    }
}

/// The decision capability shared by every agent
pub enum AiClient {
    OpenAI(OpenAIClient),
    Mock(MockAiClient),
}

impl AiClient {
    /// Create an OpenAI-compatible client for the given model
    pub fn openai(
        api_key: &str,
        endpoint: &str,
        model: &str,
        max_tokens: u32,
    ) -> Result<Self, String> {
        let client = OpenAIClient::new(api_key, Some(endpoint), Some(model), Some(max_tokens))?;
        log::info!("[AI] Using model {} at {}", client.model(), endpoint);
        Ok(AiClient::OpenAI(client))
    }

    pub fn mock(responses: Vec<Result<AiResponse, AiError>>) -> Self {
        AiClient::Mock(MockAiClient::new(responses))
    }

    /// Generate a response, optionally offering tools and replaying earlier tool rounds
    pub async fn generate_with_tools(
        &self,
        messages: Vec<Message>,
        tool_history: &[ToolHistoryEntry],
        tools: Vec<ToolDefinition>,
    ) -> Result<AiResponse, AiError> {
        match self {
            AiClient::OpenAI(client) => {
                let tool_messages = tool_history
                    .iter()
                    .flat_map(|entry| {
                        OpenAIClient::build_tool_result_messages(
                            &entry.tool_calls,
                            &entry.tool_responses,
                        )
                    })
                    .collect();
                client.generate_with_tools(messages, tool_messages, tools).await
            }
            AiClient::Mock(mock) => mock.generate_with_tools(messages, tool_history, &tools).await,
        }
    }

    /// Trace of a mock client; empty for real providers
    pub fn mock_trace(&self) -> Vec<TraceEntry> {
        match self {
            AiClient::Mock(mock) => mock.trace(),
            _ => Vec::new(),
        }
    }
}
