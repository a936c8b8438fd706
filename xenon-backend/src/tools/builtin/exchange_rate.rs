//! EUR/USD exchange rate from the frankfurter API

use crate::tools::registry::Tool;
use crate::tools::types::{ToolContext, ToolDefinition, ToolGroup, ToolInputSchema, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_EXCHANGE_RATE_URL: &str = "https://api.frankfurter.dev/v1/latest?symbols=USD";

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    base: Option<String>,
    date: String,
    rates: HashMap<String, f64>,
}

/// Parse a frankfurter response into `(rate, date)`
fn parse_rate(body: &str) -> Result<(f64, String), String> {
    let parsed: RatesResponse =
        serde_json::from_str(body).map_err(|e| format!("Unexpected response: {}", e))?;
    if let Some(base) = &parsed.base {
        if base != "EUR" {
            return Err(format!("Unexpected base currency {}", base));
        }
    }
    let rate = parsed
        .rates
        .get("USD")
        .copied()
        .ok_or_else(|| "Response does not contain a USD rate".to_string())?;
    Ok((rate, parsed.date))
}

pub struct GetEurUsdRateTool {
    url: String,
    client: reqwest::Client,
    definition: ToolDefinition,
}

impl GetEurUsdRateTool {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Xenon/1.0 (Exchange Rate Tool)")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        GetEurUsdRateTool {
            url: url.into(),
            client,
            definition: ToolDefinition {
                name: "get_eur_usd_rate".to_string(),
                description: "A tool that returns the current EUR/USD exchange rate.".to_string(),
                input_schema: ToolInputSchema::default(),
                group: ToolGroup::Read,
            },
        }
    }
}

#[async_trait]
impl Tool for GetEurUsdRateTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(&self, _params: Value, _context: &ToolContext) -> ToolResult {
        let response = match self.client.get(&self.url).send().await {
            Ok(r) => r,
            Err(e) => return ToolResult::error(format!("Failed to fetch exchange rate: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            return ToolResult::error(format!("Exchange rate API returned HTTP {}", status));
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return ToolResult::error(format!("Failed to read response: {}", e)),
        };

        match parse_rate(&body) {
            Ok((rate, date)) => {
                log::info!("[get_eur_usd_rate] 1 EUR = {} USD ({})", rate, date);
                ToolResult::success(format!(
                    "Current EUR/USD exchange rate: 1 EUR = {} USD (as of {})",
                    rate, date
                ))
                .with_metadata(json!({ "rate": rate, "date": date }))
            }
            Err(e) => ToolResult::error(e),
        }
    }
}
