use super::account::{connect_provider, format_eth};
use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolGroup, ToolInputSchema, ToolResult,
};
use async_trait::async_trait;
use ethers::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Reads the native balance of the watched wallet (or any given address)
pub struct GetWalletBalanceTool {
    rpc_url: String,
    definition: ToolDefinition,
}

impl GetWalletBalanceTool {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "address".to_string(),
            PropertySchema::new(
                "string",
                "Address to check. Defaults to your own wallet when omitted.",
            ),
        );

        GetWalletBalanceTool {
            rpc_url: rpc_url.into(),
            definition: ToolDefinition {
                name: "get_wallet_balance".to_string(),
                description: "A tool that returns the current native (ETH) balance of your wallet.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec![],
                },
                group: ToolGroup::Read,
            },
        }
    }

    /// Explicit address, then the watched target, then the execution account
    fn resolve_address(params: &BalanceParams, context: &ToolContext) -> Option<String> {
        params
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .or_else(|| context.target_address.clone())
            .or_else(|| context.account.as_ref().map(|a| a.address_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct BalanceParams {
    #[serde(default)]
    address: Option<String>,
}

#[async_trait]
impl Tool for GetWalletBalanceTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: BalanceParams = if params.is_null() {
            BalanceParams::default()
        } else {
            match serde_json::from_value(params) {
                Ok(p) => p,
                Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
            }
        };

        let address_str = match Self::resolve_address(&params, context) {
            Some(a) => a,
            None => return ToolResult::error("No address given and no wallet is being watched"),
        };
        let address: Address = match address_str.parse() {
            Ok(a) => a,
            Err(_) => return ToolResult::error(format!("Invalid address: {}", address_str)),
        };

        log::info!("[get_wallet_balance] Fetching balance for {:?}", address);

        let provider = match connect_provider(&self.rpc_url) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e),
        };

        match provider.get_balance(address, None).await {
            Ok(wei) => ToolResult::success(format!(
                "Balance of {:?}: {} ({} wei)",
                address,
                format_eth(wei),
                wei
            ))
            .with_metadata(json!({
                "address": format!("{:?}", address),
                "wei": wei.to_string(),
            })),
            Err(e) => ToolResult::error(format!("Failed to fetch balance: {}", e)),
        }
    }
}
