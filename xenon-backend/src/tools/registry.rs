use crate::ai::{ToolCall, ToolResponse};
use crate::tools::types::{ToolContext, ToolDefinition, ToolGroup, ToolResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Trait that all executable tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool definition for the AI API
    fn definition(&self) -> ToolDefinition;

    /// Executes the tool with the given parameters
    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult;

    /// Returns the tool's name
    fn name(&self) -> String {
        self.definition().name
    }

    /// Returns the tool's group
    fn group(&self) -> ToolGroup {
        self.definition().group
    }
}

/// A named set of tools offered to one agent's decision capability.
///
/// Executable tools have handlers. Signal tools are bare definitions: when the
/// model selects one, the decision loop stops and hands the call back to the agent.
pub struct Toolkit {
    name: String,
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
    signals: RwLock<HashMap<String, ToolDefinition>>,
}

impl Toolkit {
    pub fn new(name: impl Into<String>) -> Self {
        Toolkit {
            name: name.into(),
            tools: RwLock::new(HashMap::new()),
            signals: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register an executable tool
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        self.tools.write().insert(name, tool);
    }

    /// Register a signal definition (no handler)
    pub fn register_signal(&self, mut definition: ToolDefinition) {
        definition.group = ToolGroup::Signal;
        self.signals.write().insert(definition.name.clone(), definition);
    }

    pub fn with_tool(self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn with_signal(self, definition: ToolDefinition) -> Self {
        self.register_signal(definition);
        self
    }

    pub fn is_signal(&self, name: &str) -> bool {
        self.signals.read().contains_key(name)
    }

    /// True when the toolkit offers signals and nothing executable
    pub fn is_signals_only(&self) -> bool {
        self.tools.read().is_empty() && !self.signals.read().is_empty()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.read().contains_key(name) || self.is_signal(name)
    }

    /// All definitions, sorted by name so requests are deterministic
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .read()
            .values()
            .map(|t| t.definition())
            .chain(self.signals.read().values().cloned())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.read().len() + self.signals.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, params: Value, context: &ToolContext) -> ToolResult {
        let tool = match self.tools.read().get(name).cloned() {
            Some(t) => t,
            None if self.is_signal(name) => {
                return ToolResult::error(format!("Tool '{}' is a signal and cannot be executed", name))
            }
            None => return ToolResult::error(format!("Tool '{}' not found in toolkit '{}'", name, self.name)),
        };

        let start = Instant::now();
        let result = tool.execute(params, context).await;
        let duration_ms = start.elapsed().as_millis() as i64;

        log::info!(
            "[TOOLKIT:{}] Tool '{}' executed in {}ms, success: {}",
            self.name,
            name,
            duration_ms,
            result.success
        );
        context.report_result(name, &result, duration_ms);

        result
    }

    /// Execute a round of tool calls in order and build responses for the model
    pub async fn execute_calls(&self, calls: &[ToolCall], context: &ToolContext) -> Vec<ToolResponse> {
        let mut responses = Vec::with_capacity(calls.len());
        for call in calls {
            let result = self.execute(&call.name, call.arguments.clone(), context).await;
            responses.push(if result.success {
                ToolResponse::success(call.id.clone(), result.content)
            } else {
                ToolResponse::error(call.id.clone(), result.content)
            });
        }
        responses
    }
}
