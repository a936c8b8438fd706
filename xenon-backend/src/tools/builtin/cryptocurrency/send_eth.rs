//! Native ETH transfer tool for the executor
//!
//! Builds an EIP-1559 transfer from the execution account, signs it locally
//! and broadcasts the raw transaction. In dry-run mode the signed payload is
//! returned without being broadcast.

use super::account::format_eth;
use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolGroup, ToolInputSchema, ToolResult,
};
use async_trait::async_trait;
use ethers::prelude::*;
use ethers::types::transaction::eip1559::Eip1559TransactionRequest;
use ethers::types::transaction::eip2718::TypedTransaction;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

pub struct SendEthTool {
    definition: ToolDefinition,
}

impl SendEthTool {
    pub fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            "to".to_string(),
            PropertySchema::new("string", "Recipient address (0x-prefixed, 20 bytes)"),
        );
        properties.insert(
            "amount".to_string(),
            PropertySchema::new(
                "string",
                "Amount to send. Decimal or 0x-hex when unit is 'wei', decimal when unit is 'ether'.",
            ),
        );
        properties.insert(
            "unit".to_string(),
            PropertySchema::new("string", "Unit of the amount")
                .with_default(json!("wei"))
                .with_enum(&["wei", "ether"]),
        );

        SendEthTool {
            definition: ToolDefinition {
                name: "send_eth".to_string(),
                description: "Send native ETH from your wallet to an address. Returns the transaction hash.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["to".to_string(), "amount".to_string()],
                },
                group: ToolGroup::Action,
            },
        }
    }
}

impl Default for SendEthTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct SendEthParams {
    to: String,
    amount: String,
    #[serde(default = "default_unit")]
    unit: String,
}

fn default_unit() -> String {
    "wei".to_string()
}

/// Parse decimal or hex strings to U256.
/// `str::parse::<U256>()` treats input as hex, so decimal goes through `from_dec_str`.
fn parse_u256(s: &str) -> Result<U256, String> {
    let s = s.trim();
    if let Some(hex_digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        U256::from_str_radix(hex_digits, 16).map_err(|e| format!("Invalid hex: {} - {}", s, e))
    } else {
        U256::from_dec_str(s).map_err(|e| format!("Invalid decimal: {} - {}", s, e))
    }
}

/// Gas limit with a 20% buffer over the node's estimate
fn buffered_gas(estimate: U256) -> U256 {
    estimate * U256::from(120u64) / U256::from(100u64)
}

fn parse_amount(amount: &str, unit: &str) -> Result<U256, String> {
    match unit.to_lowercase().as_str() {
        "wei" => parse_u256(amount),
        "ether" | "eth" => ethers::utils::parse_ether(amount.trim())
            .map_err(|e| format!("Invalid ether amount '{}': {}", amount, e)),
        other => Err(format!("Unsupported unit '{}', use 'wei' or 'ether'", other)),
    }
}

#[async_trait]
impl Tool for SendEthTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, context: &ToolContext) -> ToolResult {
        let params: SendEthParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
        };

        let account = match &context.account {
            Some(a) => a.clone(),
            None => return ToolResult::error("No execution account is available to this agent"),
        };

        let to: Address = match params.to.trim().parse() {
            Ok(a) => a,
            Err(_) => return ToolResult::error(format!("Invalid 'to' address: {}", params.to)),
        };

        let value = match parse_amount(&params.amount, &params.unit) {
            Ok(v) if v.is_zero() => return ToolResult::error("Amount must be greater than zero"),
            Ok(v) => v,
            Err(e) => return ToolResult::error(e),
        };

        let provider = match account.provider() {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e),
        };
        let from = account.address();

        let nonce = match provider.get_transaction_count(from, None).await {
            Ok(n) => n,
            Err(e) => return ToolResult::error(format!("Failed to fetch nonce: {}", e)),
        };

        let (max_fee, priority_fee) = match provider.estimate_eip1559_fees(None).await {
            Ok(fees) => fees,
            Err(e) => return ToolResult::error(format!("Failed to estimate fees: {}", e)),
        };

        let mut tx: TypedTransaction = Eip1559TransactionRequest::new()
            .from(from)
            .to(to)
            .value(value)
            .nonce(nonce)
            .max_fee_per_gas(max_fee)
            .max_priority_fee_per_gas(priority_fee)
            .chain_id(account.chain_id())
            .into();

        let gas = match provider.estimate_gas(&tx, None).await {
            Ok(estimate) => buffered_gas(estimate),
            Err(e) => return ToolResult::error(format!("Failed to estimate gas: {}", e)),
        };
        tx.set_gas(gas);

        log::info!(
            "[send_eth] Signing transfer: to={:?}, value={}, gas={}, max_fee={}, priority_fee={}, nonce={} on {}",
            to, value, gas, max_fee, priority_fee, nonce, account.chain_name()
        );

        let signature = match account.wallet().sign_transaction(&tx).await {
            Ok(s) => s,
            Err(e) => return ToolResult::error(format!("Failed to sign transaction: {}", e)),
        };
        let raw = tx.rlp_signed(&signature);
        let signed_tx_hex = format!("0x{}", hex::encode(&raw));

        let metadata = json!({
            "from": account.address_string(),
            "to": format!("{:?}", to),
            "value": value.to_string(),
            "nonce": nonce.as_u64(),
            "gas_limit": gas.to_string(),
            "chain_id": account.chain_id(),
        });

        if account.dry_run() {
            log::info!("[send_eth] Dry run, transaction signed but not broadcast");
            return ToolResult::success(format!(
                "DRY RUN: signed a transfer of {} to {:?} (nonce {}) without broadcasting it.\nSigned transaction: {}",
                format_eth(value),
                to,
                nonce,
                signed_tx_hex
            ))
            .with_metadata(metadata);
        }

        match provider.send_raw_transaction(raw).await {
            Ok(pending) => {
                let tx_hash = format!("{:?}", pending.tx_hash());
                log::info!("[send_eth] Broadcast transaction {}", tx_hash);
                ToolResult::success(format!(
                    "Sent {} to {:?}. Transaction hash: {}",
                    format_eth(value),
                    to,
                    tx_hash
                ))
                .with_metadata(metadata)
            }
            Err(e) => ToolResult::error(format!("Failed to broadcast transaction: {}", e)),
        }
    }
}
