//! Execution account: the single signing identity used by the executor

use ethers::prelude::*;

pub struct ExecutionAccount {
    wallet: LocalWallet,
    chain_name: String,
    rpc_url: String,
    dry_run: bool,
}

impl std::fmt::Debug for ExecutionAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionAccount")
            .field("address", &self.address_string())
            .field("chain_id", &self.chain_id())
            .field("chain_name", &self.chain_name)
            .field("rpc_url", &self.rpc_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ExecutionAccount {
    pub fn from_private_key(
        private_key: &str,
        chain_id: u64,
        chain_name: &str,
        rpc_url: &str,
        dry_run: bool,
    ) -> Result<Self, String> {
        let wallet = private_key
            .trim()
            .parse::<LocalWallet>()
            .map_err(|e| format!("Invalid private key: {}", e))?
            .with_chain_id(chain_id);

        Ok(ExecutionAccount {
            wallet,
            chain_name: chain_name.to_string(),
            rpc_url: rpc_url.to_string(),
            dry_run,
        })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn address_string(&self) -> String {
        format!("{:?}", self.wallet.address())
    }

    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }

    pub fn chain_id(&self) -> u64 {
        self.wallet.chain_id()
    }

    pub fn chain_name(&self) -> &str {
        &self.chain_name
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Sign transactions without broadcasting them
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn provider(&self) -> Result<Provider<Http>, String> {
        connect_provider(&self.rpc_url)
    }
}

pub fn connect_provider(rpc_url: &str) -> Result<Provider<Http>, String> {
    Provider::<Http>::try_from(rpc_url).map_err(|e| format!("Invalid RPC URL '{}': {}", rpc_url, e))
}

/// Format a wei amount as human-readable ETH
pub fn format_eth(wei: U256) -> String {
    let eth = ethers::utils::format_ether(wei);
    // format_ether always prints 18 decimals; trim the noise
    let trimmed = eth.trim_end_matches('0').trim_end_matches('.');
    format!("{} ETH", if trimmed.is_empty() { "0" } else { trimmed })
}
