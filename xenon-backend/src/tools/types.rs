use crate::gateway::events::EventBroadcaster;
use crate::gateway::protocol::GatewayEvent;
use crate::memory::AgentMemory;
use crate::orchestration::AgentName;
use crate::tools::builtin::cryptocurrency::ExecutionAccount;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Tool groups, by the kind of effect a tool has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolGroup {
    /// Reads external state without changing it
    #[default]
    Read,
    /// Changes external state (chain writes)
    Action,
    /// Has no handler; selecting it ends the decision loop
    Signal,
}

impl ToolGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolGroup::Read => "read",
            ToolGroup::Action => "action",
            ToolGroup::Signal => "signal",
        }
    }
}

/// JSON Schema property definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl PropertySchema {
    pub fn new(schema_type: &str, description: impl Into<String>) -> Self {
        PropertySchema {
            schema_type: schema_type.to_string(),
            description: description.into(),
            default: None,
            items: None,
            enum_values: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

/// Tool input schema using JSON Schema format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: HashMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for ToolInputSchema {
    fn default() -> Self {
        ToolInputSchema {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: vec![],
        }
    }
}

/// Tool definition that gets sent to the AI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
    #[serde(skip)]
    pub group: ToolGroup,
}

/// Result of tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        ToolResult {
            success: true,
            content: content.into(),
            error: None,
            metadata: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let msg = message.into();
        ToolResult {
            success: false,
            content: msg.clone(),
            error: Some(msg),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Context provided to tools during execution
#[derive(Clone)]
pub struct ToolContext {
    /// Agent on whose behalf the tool runs
    pub agent: AgentName,
    /// Address the observer is watching
    pub target_address: Option<String>,
    /// Signing identity, only present for the executor
    pub account: Option<Arc<ExecutionAccount>>,
    /// Report store for memory-backed tools
    pub memory: Option<Arc<dyn AgentMemory>>,
    /// Event broadcaster for tool.result events
    pub broadcaster: Option<Arc<EventBroadcaster>>,
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("agent", &self.agent)
            .field("target_address", &self.target_address)
            .field("account", &self.account.as_ref().map(|a| a.address_string()))
            .field("memory", &self.memory.is_some())
            .field("broadcaster", &self.broadcaster.is_some())
            .finish()
    }
}

impl ToolContext {
    pub fn new(agent: AgentName) -> Self {
        ToolContext {
            agent,
            target_address: None,
            account: None,
            memory: None,
            broadcaster: None,
        }
    }

    pub fn with_target(mut self, address: impl Into<String>) -> Self {
        self.target_address = Some(address.into());
        self
    }

    pub fn with_account(mut self, account: Arc<ExecutionAccount>) -> Self {
        self.account = Some(account);
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn AgentMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: Option<Arc<EventBroadcaster>>) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    /// Broadcast a tool.result event if a broadcaster is attached
    pub fn report_result(&self, tool_name: &str, result: &ToolResult, duration_ms: i64) {
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.broadcast(GatewayEvent::tool_result(
                self.agent,
                tool_name,
                result.success,
                duration_ms,
                &result.content,
            ));
        }
    }
}
