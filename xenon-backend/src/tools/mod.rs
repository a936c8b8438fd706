pub mod builtin;
pub mod registry;
pub mod signals;
pub mod types;

pub use registry::{Tool, Toolkit};
pub use types::{
    PropertySchema, ToolContext, ToolDefinition, ToolGroup, ToolInputSchema, ToolResult,
};

use crate::config::Config;
use std::sync::Arc;

/// Read-oriented toolkit for the observer, plus its idle signal
pub fn observer_toolkit(config: &Config) -> Toolkit {
    Toolkit::new("observer")
        .with_tool(Arc::new(builtin::GetWalletBalanceTool::new(&config.rpc_url)))
        .with_tool(Arc::new(builtin::GetPastReportsTool::new()))
        .with_tool(Arc::new(builtin::GetEurUsdRateTool::new(&config.exchange_rate_url)))
        .with_tool(Arc::new(builtin::TokenLookupTool::new(&config.chain_name)))
        .with_signal(signals::no_further_actions_tool())
}

/// The task manager only chooses where the cycle goes next
pub fn task_manager_toolkit() -> Toolkit {
    Toolkit::new("task-manager")
        .with_signal(signals::send_message_to_observer_tool())
        .with_signal(signals::send_message_to_executor_tool())
}

/// Action-oriented toolkit for the executor
pub fn executor_toolkit(config: &Config) -> Toolkit {
    Toolkit::new("executor")
        .with_tool(Arc::new(builtin::GetWalletBalanceTool::new(&config.rpc_url)))
        .with_tool(Arc::new(builtin::TokenLookupTool::new(&config.chain_name)))
        .with_tool(Arc::new(builtin::SendEthTool::new()))
}
