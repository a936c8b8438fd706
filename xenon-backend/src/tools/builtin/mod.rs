//! Built-in tools for the agents
//!
//! - `cryptocurrency`: the execution account, balances, token lookup and transfers
//! - `exchange_rate`: EUR/USD market data
//! - `past_reports`: retrieval from the report store

pub mod cryptocurrency;

mod exchange_rate;
mod past_reports;

pub use cryptocurrency::{
    load_tokens, ExecutionAccount, GetWalletBalanceTool, SendEthTool, TokenLookupTool,
};
pub use exchange_rate::{GetEurUsdRateTool, DEFAULT_EXCHANGE_RATE_URL};
pub use past_reports::GetPastReportsTool;
