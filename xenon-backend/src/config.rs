use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::tools::builtin::DEFAULT_EXCHANGE_RATE_URL;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub ai_endpoint: String,
    pub ai_api_key: String,
    pub model_name: String,
    /// Model used for the closing report of a cycle
    pub report_model_name: String,
    pub ai_max_tokens: u32,
    pub private_key: String,
    /// Address the observer watches; the account address when unset
    pub target_address: Option<String>,
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    pub executor_dry_run: bool,
    pub observer_max_steps: usize,
    pub task_manager_max_steps: usize,
    pub executor_max_steps: usize,
    pub idle_default_secs: u64,
    pub idle_max_secs: u64,
    pub restart_min_backoff_secs: u64,
    pub restart_max_backoff_secs: u64,
    /// Unlimited when unset
    pub max_restarts: Option<u32>,
    pub tokens_config: Option<PathBuf>,
    pub exchange_rate_url: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("ai_endpoint", &self.ai_endpoint)
            .field("model_name", &self.model_name)
            .field("report_model_name", &self.report_model_name)
            .field("chain_id", &self.chain_id)
            .field("chain_name", &self.chain_name)
            .field("rpc_url", &self.rpc_url)
            .field("executor_dry_run", &self.executor_dry_run)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let private_key = get("PRIVATE_KEY").ok_or("PRIVATE_KEY must be set")?;

        let ai_endpoint = or("AI_ENDPOINT", "https://api.openai.com/v1/chat/completions");
        validate_url("AI_ENDPOINT", &ai_endpoint)?;
        let rpc_url = or("RPC_URL", "https://mainnet.base.org");
        validate_url("RPC_URL", &rpc_url)?;
        let exchange_rate_url = or("EXCHANGE_RATE_URL", DEFAULT_EXCHANGE_RATE_URL);
        validate_url("EXCHANGE_RATE_URL", &exchange_rate_url)?;

        Ok(Self {
            database_url: or("DATABASE_URL", "./.db/xenon.db"),
            ai_endpoint,
            ai_api_key: or("AI_API_KEY", ""),
            model_name: or("MODEL_NAME", "gpt-4o-2024-08-06"),
            report_model_name: or("REPORT_MODEL_NAME", "gpt-4o-mini"),
            ai_max_tokens: parse_or("AI_MAX_TOKENS", get("AI_MAX_TOKENS"), 4096)?,
            private_key,
            target_address: get("TARGET_ADDRESS"),
            chain_id: parse_or("CHAIN_ID", get("CHAIN_ID"), 8453)?,
            chain_name: or("CHAIN_NAME", "base").to_lowercase(),
            rpc_url,
            executor_dry_run: parse_bool("EXECUTOR_DRY_RUN", get("EXECUTOR_DRY_RUN"), true)?,
            observer_max_steps: parse_or("OBSERVER_MAX_STEPS", get("OBSERVER_MAX_STEPS"), 100)?,
            task_manager_max_steps: parse_or("TASK_MANAGER_MAX_STEPS", get("TASK_MANAGER_MAX_STEPS"), 10)?,
            executor_max_steps: parse_or("EXECUTOR_MAX_STEPS", get("EXECUTOR_MAX_STEPS"), 10)?,
            idle_default_secs: parse_or("IDLE_DEFAULT_SECS", get("IDLE_DEFAULT_SECS"), 300)?,
            idle_max_secs: parse_or("IDLE_MAX_SECS", get("IDLE_MAX_SECS"), 3600)?,
            restart_min_backoff_secs: parse_or("RESTART_MIN_BACKOFF_SECS", get("RESTART_MIN_BACKOFF_SECS"), 5)?,
            restart_max_backoff_secs: parse_or("RESTART_MAX_BACKOFF_SECS", get("RESTART_MAX_BACKOFF_SECS"), 60)?,
            max_restarts: get("MAX_RESTARTS")
                .map(|v| parse_value("MAX_RESTARTS", &v))
                .transpose()?,
            tokens_config: get("TOKENS_CONFIG").map(PathBuf::from),
            exchange_rate_url,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: ":memory:".to_string(),
            ai_endpoint: "http://127.0.0.1:1/v1/chat/completions".to_string(),
            ai_api_key: String::new(),
            model_name: "test-model".to_string(),
            report_model_name: "test-report-model".to_string(),
            ai_max_tokens: 1024,
            private_key: "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
            target_address: None,
            chain_id: 8453,
            chain_name: "base".to_string(),
            rpc_url: "http://127.0.0.1:1".to_string(),
            executor_dry_run: true,
            observer_max_steps: 10,
            task_manager_max_steps: 10,
            executor_max_steps: 10,
            idle_default_secs: 300,
            idle_max_secs: 3600,
            restart_min_backoff_secs: 5,
            restart_max_backoff_secs: 60,
            max_restarts: None,
            tokens_config: None,
            exchange_rate_url: "http://127.0.0.1:1/latest".to_string(),
        }
    }
}

fn validate_url(key: &str, value: &str) -> Result<(), String> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| format!("{} is not a valid URL ({}): {}", key, value, e))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| format!("{} must be a valid number, got '{}': {}", key, value, e))
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool, String> {
    match value.as_deref().map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(format!("{} must be true or false, got '{}'", key, v)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("PRIVATE_KEY", "0xabc")]).unwrap();
        assert_eq!(config.database_url, "./.db/xenon.db");
        assert_eq!(config.model_name, "gpt-4o-2024-08-06");
        assert_eq!(config.report_model_name, "gpt-4o-mini");
        assert_eq!(config.chain_id, 8453);
        assert_eq!(config.chain_name, "base");
        assert!(config.executor_dry_run);
        assert_eq!(config.observer_max_steps, 100);
        assert_eq!(config.task_manager_max_steps, 10);
        assert_eq!(config.idle_default_secs, 300);
        assert_eq!(config.max_restarts, None);
        assert_eq!(config.target_address, None);
        assert_eq!(config.exchange_rate_url, DEFAULT_EXCHANGE_RATE_URL);
    }

    #[test]
    fn test_private_key_required() {
        assert!(config(&[]).unwrap_err().contains("PRIVATE_KEY"));
        assert!(config(&[("PRIVATE_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PRIVATE_KEY", "0xabc"),
            ("CHAIN_ID", "1"),
            ("CHAIN_NAME", "Mainnet"),
            ("EXECUTOR_DRY_RUN", "false"),
            ("MAX_RESTARTS", "3"),
            ("TARGET_ADDRESS", "0x00000000000000000000000000000000000000aa"),
            ("TOKENS_CONFIG", "config/tokens.ron"),
        ])
        .unwrap();
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.chain_name, "mainnet");
        assert!(!config.executor_dry_run);
        assert_eq!(config.max_restarts, Some(3));
        assert_eq!(
            config.target_address.as_deref(),
            Some("0x00000000000000000000000000000000000000aa")
        );
        assert_eq!(config.tokens_config, Some(PathBuf::from("config/tokens.ron")));
    }

    #[test]
    fn test_parse_errors_name_the_variable() {
        let err = config(&[("PRIVATE_KEY", "0xabc"), ("IDLE_MAX_SECS", "soon")]).unwrap_err();
        assert!(err.contains("IDLE_MAX_SECS"));

        let err = config(&[("PRIVATE_KEY", "0xabc"), ("EXECUTOR_DRY_RUN", "maybe")]).unwrap_err();
        assert!(err.contains("EXECUTOR_DRY_RUN"));

        let err = config(&[("PRIVATE_KEY", "0xabc"), ("RPC_URL", "not a url")]).unwrap_err();
        assert!(err.contains("RPC_URL"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config::for_tests();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(&config.private_key));
    }
}
