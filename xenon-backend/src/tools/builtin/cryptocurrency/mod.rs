//! Chain tools: the execution account and the tools that read or move funds

mod account;
mod send_eth;
mod token_lookup;
mod wallet_balance;

pub use account::ExecutionAccount;
pub use send_eth::SendEthTool;
pub use token_lookup::{load_tokens, TokenLookupTool};
pub use wallet_balance::GetWalletBalanceTool;
