//! Token Lookup tool for resolving token symbols to addresses
//!
//! Token data comes from a RON table: the one embedded from config/tokens.ron,
//! or a file given at startup. This prevents hallucination of token addresses
//! for common tokens.

use crate::tools::registry::Tool;
use crate::tools::types::{
    PropertySchema, ToolContext, ToolDefinition, ToolGroup, ToolInputSchema, ToolResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

type TokenTable = HashMap<String, HashMap<String, TokenInfo>>;

const EMBEDDED_TOKENS: &str = include_str!("../../../../config/tokens.ron");

/// Global token storage (loaded once)
static TOKENS: OnceLock<TokenTable> = OnceLock::new();

/// Token info loaded from config
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub address: String,
    pub decimals: u8,
    pub name: String,
}

fn parse_tokens(content: &str) -> Result<TokenTable, String> {
    ron::from_str(content).map_err(|e| format!("Failed to parse token table: {}", e))
}

/// Load the token table from `path`, or the embedded table when `None`.
/// Returns the number of tokens loaded.
pub fn load_tokens(path: Option<&Path>) -> Result<usize, String> {
    let (content, source) = match path {
        Some(p) => (
            std::fs::read_to_string(p).map_err(|e| format!("Failed to read {:?}: {}", p, e))?,
            format!("{:?}", p),
        ),
        None => (EMBEDDED_TOKENS.to_string(), "embedded table".to_string()),
    };

    let tokens = parse_tokens(&content)?;
    let total: usize = tokens.values().map(|t| t.len()).sum();
    log::info!(
        "[tokens] Loaded {} tokens across {} networks from {}",
        total,
        tokens.len(),
        source
    );

    if TOKENS.set(tokens).is_err() {
        log::warn!("[tokens] Token table already initialized, keeping the existing one");
    }
    Ok(total)
}

fn get_tokens() -> &'static TokenTable {
    TOKENS.get_or_init(|| {
        parse_tokens(EMBEDDED_TOKENS).unwrap_or_else(|e| {
            log::error!("[tokens] {}", e);
            HashMap::new()
        })
    })
}

/// Token Lookup tool
pub struct TokenLookupTool {
    default_network: String,
    definition: ToolDefinition,
}

impl TokenLookupTool {
    pub fn new(default_network: impl Into<String>) -> Self {
        let default_network = default_network.into();
        let mut networks: Vec<&str> = get_tokens().keys().map(|k| k.as_str()).collect();
        networks.sort();

        let mut properties = HashMap::new();
        properties.insert(
            "symbol".to_string(),
            PropertySchema::new(
                "string",
                "Token symbol (e.g., 'ETH', 'USDC', 'EURC'). Case-insensitive.",
            ),
        );
        properties.insert(
            "network".to_string(),
            PropertySchema::new("string", "Network to look the token up on")
                .with_default(json!(default_network))
                .with_enum(&networks),
        );

        TokenLookupTool {
            default_network,
            definition: ToolDefinition {
                name: "token_lookup".to_string(),
                description: "Look up a token's contract address and decimals by symbol.".to_string(),
                input_schema: ToolInputSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["symbol".to_string()],
                },
                group: ToolGroup::Read,
            },
        }
    }

    fn lookup(symbol: &str, network: &str) -> Option<TokenInfo> {
        get_tokens()
            .get(network)
            .and_then(|network_tokens| network_tokens.get(&symbol.trim().to_uppercase()))
            .cloned()
    }

    fn list_available(network: &str) -> Vec<String> {
        get_tokens()
            .get(network)
            .map(|network_tokens| {
                let mut symbols: Vec<String> = network_tokens.keys().cloned().collect();
                symbols.sort();
                symbols
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct TokenLookupParams {
    symbol: String,
    #[serde(default)]
    network: Option<String>,
}

#[async_trait]
impl Tool for TokenLookupTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, params: Value, _context: &ToolContext) -> ToolResult {
        let params: TokenLookupParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("Invalid parameters: {}", e)),
        };
        let network = params
            .network
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.default_network.clone());
        let symbol = params.symbol.trim().to_uppercase();

        match Self::lookup(&symbol, &network) {
            Some(token) => {
                log::info!("[token_lookup] {} on {} -> {}", symbol, network, token.address);
                ToolResult::success(format!(
                    "{} ({}) on {}\nAddress: {}\nDecimals: {}",
                    token.name, symbol, network, token.address, token.decimals
                ))
                .with_metadata(json!({
                    "symbol": symbol,
                    "address": token.address,
                    "decimals": token.decimals,
                    "name": token.name,
                    "network": network,
                }))
            }
            None => {
                let available = Self::list_available(&network);
                if available.is_empty() {
                    ToolResult::error(format!("Network '{}' is not supported", network))
                } else {
                    ToolResult::error(format!(
                        "Token '{}' not found on {}. Available tokens: {}",
                        symbol,
                        network,
                        available.join(", ")
                    ))
                }
            }
        }
    }
}
