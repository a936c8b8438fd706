//! Signal tools: definitions without handlers
//!
//! The model selects one of these to hand a decision back to its agent
//! instead of performing work. The decision loop stops as soon as one is chosen.

use crate::tools::{PropertySchema, ToolDefinition, ToolGroup, ToolInputSchema};
use std::collections::HashMap;

pub const NO_FURTHER_ACTIONS: &str = "no_further_actions";
pub const SEND_MESSAGE_TO_OBSERVER: &str = "send_message_to_observer";
pub const SEND_MESSAGE_TO_EXECUTOR: &str = "send_message_to_executor";

/// Create the `no_further_actions` tool used by the observer to go idle
pub fn no_further_actions_tool() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "reason".to_string(),
        PropertySchema::new("string", "The reason why no further actions are needed."),
    );
    properties.insert(
        "wait_time".to_string(),
        PropertySchema::new(
            "number",
            "Seconds to wait before the next observation. This number must be logical to the operations you've done.",
        ),
    );

    ToolDefinition {
        name: NO_FURTHER_ACTIONS.to_string(),
        description: "A tool that you decide to use when no further actions are needed.".to_string(),
        input_schema: ToolInputSchema {
            schema_type: "object".to_string(),
            properties,
            required: vec!["reason".to_string(), "wait_time".to_string()],
        },
        group: ToolGroup::Signal,
    }
}

fn message_signal(name: &str, description: &str, message_description: &str) -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "message".to_string(),
        PropertySchema::new("string", message_description),
    );

    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: ToolInputSchema {
            schema_type: "object".to_string(),
            properties,
            required: vec!["message".to_string()],
        },
        group: ToolGroup::Signal,
    }
}

/// Create the `send_message_to_observer` tool (continue observing)
pub fn send_message_to_observer_tool() -> ToolDefinition {
    message_signal(
        SEND_MESSAGE_TO_OBSERVER,
        "Send a message to the observer agent when no task should be executed right now. Use it to ask for a new or more focused report.",
        "Guidance for the observer agent's next report.",
    )
}

/// Create the `send_message_to_executor` tool (dispatch work)
pub fn send_message_to_executor_tool() -> ToolDefinition {
    message_signal(
        SEND_MESSAGE_TO_EXECUTOR,
        "Send a message to the executor agent with the tasks it must execute.",
        "The tasks to execute, written as clear instructions.",
    )
}
