use crate::orchestration::AgentName;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event types for orchestration broadcasts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    // Agent events
    AgentAction,
    AgentResponse,
    AgentError,
    // Bus events
    RouteDelivered,
    // Cycle events
    CycleIdle,
    ReportStored,
    // Tool events
    ToolResult,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentAction => "agent.action",
            Self::AgentResponse => "agent.response",
            Self::AgentError => "agent.error",
            Self::RouteDelivered => "route.delivered",
            Self::CycleIdle => "cycle.idle",
            Self::ReportStored => "report.stored",
            Self::ToolResult => "tool.result",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.as_str().to_string()
    }
}

/// Server-pushed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    #[serde(rename = "type")]
    pub type_: String,
    pub event: String,
    pub data: Value,
}

impl GatewayEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            type_: "event".to_string(),
            event: event.into(),
            data,
        }
    }

    /// An agent started working on something
    pub fn agent_action(agent: AgentName, action: &str) -> Self {
        Self::new(
            EventType::AgentAction,
            serde_json::json!({
                "agent": agent,
                "action": action
            }),
        )
    }

    pub fn agent_response(agent: AgentName, text: &str) -> Self {
        Self::new(
            EventType::AgentResponse,
            serde_json::json!({
                "agent": agent,
                "text": text
            }),
        )
    }

    /// A handler failed; caught at the bus boundary
    pub fn agent_error(route: &str, agent: AgentName, error: &str) -> Self {
        Self::new(
            EventType::AgentError,
            serde_json::json!({
                "route": route,
                "agent": agent,
                "error": error
            }),
        )
    }

    pub fn route_delivered(route: &str, hop: usize, payload: Value) -> Self {
        Self::new(
            EventType::RouteDelivered,
            serde_json::json!({
                "route": route,
                "hop": hop,
                "payload": payload
            }),
        )
    }

    pub fn cycle_idle(wait_ms: u64, reason: &str) -> Self {
        Self::new(
            EventType::CycleIdle,
            serde_json::json!({
                "wait_ms": wait_ms,
                "reason": reason
            }),
        )
    }

    pub fn report_stored(report_id: Option<i64>, report: &str) -> Self {
        Self::new(
            EventType::ReportStored,
            serde_json::json!({
                "report_id": report_id,
                "report": report
            }),
        )
    }

    pub fn tool_result(agent: AgentName, tool_name: &str, success: bool, duration_ms: i64, content: &str) -> Self {
        Self::new(
            EventType::ToolResult,
            serde_json::json!({
                "agent": agent,
                "tool_name": tool_name,
                "success": success,
                "duration_ms": duration_ms,
                "content": content
            }),
        )
    }
}
