//! Construction parameters for [`crate::Web3Name`].

use ethers::types::{Address, H160};

use crate::chains::Chain;
use crate::error::{Result, Web3NameError};
use crate::hub::HubConfig;
use crate::validate::{NameRules, DEFAULT_SHORT_LABEL_EXEMPT_TLDS};

/// Verified TLD hub deployment, 0x754D6827A57334143eD5fB58C5b1A4aAe4396ba5
pub const DEFAULT_HUB_ADDRESS: Address = H160([
    0x75, 0x4d, 0x68, 0x27, 0xa5, 0x73, 0x34, 0x14, 0x3e, 0xd5, 0xfb, 0x58, 0xc5, 0xb1, 0xa4,
    0xaa, 0xe4, 0x39, 0x6b, 0xa5,
]);

/// TLDs whose names hash without their identifier.
pub const DEFAULT_V2_TLDS: [&str; 3] = ["bnb", "arb", "eth"];

#[derive(Debug, Clone)]
pub struct Web3NameConfig {
    /// Use the BNB testnet hub
    pub is_dev: bool,
    /// Endpoint for the hub chain, overriding the chain default
    pub rpc_url: Option<String>,
    /// Default timeout for every call; `None` or `<= 0` disables it
    pub timeout_ms: Option<i64>,
    pub hub_address: Address,
    pub hub_chain_id: u64,
    pub v2_tlds: Vec<String>,
    pub rules: NameRules,
}

impl Default for Web3NameConfig {
    fn default() -> Self {
        Self {
            is_dev: false,
            rpc_url: None,
            timeout_ms: None,
            hub_address: DEFAULT_HUB_ADDRESS,
            hub_chain_id: Chain::BscMainnet.chain_id(),
            v2_tlds: DEFAULT_V2_TLDS.iter().map(|tld| tld.to_string()).collect(),
            rules: NameRules::new(
                DEFAULT_SHORT_LABEL_EXEMPT_TLDS.iter().map(|tld| tld.to_string()),
                Vec::new(),
            ),
        }
    }
}

impl Web3NameConfig {
    pub fn dev() -> Self {
        Self {
            is_dev: true,
            hub_chain_id: Chain::BscTestnet.chain_id(),
            ..Self::default()
        }
    }

    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = Some(rpc_url.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_rules(mut self, rules: NameRules) -> Self {
        self.rules = rules;
        self
    }

    /// Load from `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let is_dev = lookup("WEB3NAME_DEV")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let mut config = if is_dev { Self::dev() } else { Self::default() };

        if let Some(url) = lookup("WEB3NAME_RPC_URL").filter(|v| !v.is_empty()) {
            config.rpc_url = Some(url);
        }
        if let Some(timeout) = lookup("WEB3NAME_TIMEOUT_MS") {
            let timeout = timeout
                .parse()
                .map_err(|e| Web3NameError::Config(format!("WEB3NAME_TIMEOUT_MS: {e}")))?;
            config.timeout_ms = Some(timeout);
        }
        if let Some(address) = lookup("WEB3NAME_HUB_ADDRESS") {
            config.hub_address = address
                .parse()
                .map_err(|e| Web3NameError::Config(format!("WEB3NAME_HUB_ADDRESS: {e}")))?;
        }
        if let Some(chain_id) = lookup("WEB3NAME_HUB_CHAIN_ID") {
            config.hub_chain_id = chain_id
                .parse()
                .map_err(|e| Web3NameError::Config(format!("WEB3NAME_HUB_CHAIN_ID: {e}")))?;
        }
        Ok(config)
    }

    /// Where to find the hub: the configured endpoint, or the public one of
    /// the hub chain.
    pub fn hub_config(&self) -> Result<HubConfig> {
        let rpc_url = match &self.rpc_url {
            Some(url) => url.clone(),
            None => Chain::from_id(self.hub_chain_id)
                .map(|chain| chain.rpc_url().to_string())
                .ok_or_else(|| {
                    Web3NameError::Config(format!(
                        "no default endpoint for hub chain {}, set an rpc url",
                        self.hub_chain_id
                    ))
                })?,
        };
        Ok(HubConfig {
            address: self.hub_address,
            chain_id: self.hub_chain_id,
            rpc_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Web3NameConfig::default();
        assert!(!config.is_dev);
        assert!(!config.hub_address.is_zero());
        let hub = config.hub_config().unwrap();
        assert_eq!(hub.chain_id, 56);
        assert_eq!(hub.rpc_url, Chain::BscMainnet.rpc_url());
    }

    #[test]
    fn test_hub_address_constant() {
        let expected: Address = "0x754D6827A57334143eD5fB58C5b1A4aAe4396ba5".parse().unwrap();
        assert_eq!(DEFAULT_HUB_ADDRESS, expected);
        assert_eq!(Web3NameConfig::dev().hub_address, expected);
    }

    #[test]
    fn test_from_lookup() {
        let config = Web3NameConfig::from_lookup(lookup(&[
            ("WEB3NAME_DEV", "true"),
            ("WEB3NAME_TIMEOUT_MS", "2500"),
            ("WEB3NAME_RPC_URL", "https://example.org/rpc"),
        ]))
        .unwrap();
        assert!(config.is_dev);
        assert_eq!(config.timeout_ms, Some(2500));
        let hub = config.hub_config().unwrap();
        assert_eq!(hub.chain_id, 97);
        assert_eq!(hub.rpc_url, "https://example.org/rpc");
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(Web3NameConfig::from_lookup(lookup(&[("WEB3NAME_TIMEOUT_MS", "soon")])).is_err());
        assert!(Web3NameConfig::from_lookup(lookup(&[("WEB3NAME_HUB_ADDRESS", "0x12")])).is_err());

        let config =
            Web3NameConfig::from_lookup(lookup(&[("WEB3NAME_HUB_CHAIN_ID", "424242")])).unwrap();
        assert!(config.hub_config().is_err());
    }
}
