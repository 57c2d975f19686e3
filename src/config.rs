/// Name service configuration
///
/// Everything the client needs to know about the deployed registry and the
/// chain it lives on. The compiled-in defaults target the `.hell` registry on
/// Polygon Mumbai; `from_env()` layers optional overrides on top.

use ethers::types::{Address, H160, H256};
use serde::Serialize;
use serde_json::{json, Value};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Deployed registry contract (0xf61942735c77021a06cF1587db9fa08474A65eb9)
pub const CONTRACT_ADDRESS: Address = H160([
    0xf6, 0x19, 0x42, 0x73, 0x5c, 0x77, 0x02, 0x1a, 0x06, 0xcf, 0x15, 0x87, 0xdb, 0x9f, 0xa0,
    0x84, 0x74, 0xa6, 0x5e, 0xb9,
]);

/// Display suffix appended to every label
pub const TLD: &str = ".hell";

/// Polygon Mumbai testnet (0x13881)
pub const MUMBAI_CHAIN_ID: u64 = 80001;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// The single chain the registry requires, with the metadata a wallet needs to add it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    pub block_explorer_urls: Vec<String>,
    /// NFT marketplace asset page prefix for minted names
    pub marketplace_url: Option<String>,
}

impl ChainConfig {
    pub fn mumbai() -> Self {
        Self {
            chain_id: MUMBAI_CHAIN_ID,
            chain_name: "Polygon Mumbai Testnet".to_string(),
            rpc_urls: vec!["https://rpc-mumbai.maticvigil.com/".to_string()],
            native_currency: NativeCurrency {
                name: "Mumbai Matic".to_string(),
                symbol: "MATIC".to_string(),
                decimals: 18,
            },
            block_explorer_urls: vec!["https://mumbai.polygonscan.com/".to_string()],
            marketplace_url: Some("https://testnets.opensea.io/assets/mumbai/".to_string()),
        }
    }

    /// Chain id in the `0x`-prefixed form wallets expect
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// Parameter object for `wallet_addEthereumChain`
    pub fn add_chain_params(&self) -> Value {
        json!({
            "chainId": self.chain_id_hex(),
            "chainName": self.chain_name,
            "rpcUrls": self.rpc_urls,
            "nativeCurrency": self.native_currency,
            "blockExplorerUrls": self.block_explorer_urls,
        })
    }

    /// Explorer link for a transaction, if an explorer is configured
    pub fn tx_url(&self, tx_hash: &H256) -> Option<String> {
        self.block_explorer_urls
            .first()
            .map(|base| format!("{}/tx/{:?}", base.trim_end_matches('/'), tx_hash))
    }

    /// Marketplace page for token `token_id` of `contract`
    ///
    /// The registry exposes no token id lookup, so callers pass the name's
    /// position in `getAllNames`. That only holds while the registry keeps
    /// mint order; treat the link as best-effort.
    pub fn asset_url(&self, contract: &Address, token_id: usize) -> Option<String> {
        self.marketplace_url.as_ref().map(|base| {
            format!("{}/{:?}/{}", base.trim_end_matches('/'), contract, token_id)
        })
    }
}

#[derive(Clone, Debug)]
pub struct NameServiceConfig {
    /// Registry contract address
    pub contract_address: Address,
    /// Display suffix for labels
    pub tld: String,
    /// Required chain
    pub chain: ChainConfig,
    /// JSON-RPC endpoint used by `HttpProvider`
    pub rpc_url: String,
    /// Pause between a confirmed mutation and the listing refresh
    pub refresh_delay: Duration,
    /// Interval between `eth_getTransactionReceipt` polls
    pub receipt_poll_interval: Duration,
    /// Receipt polls before giving up on inclusion
    pub receipt_max_attempts: u32,
}

impl NameServiceConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables (all optional):
    /// - `HNS_CONTRACT_ADDRESS`: registry contract address
    /// - `HNS_RPC_URL`: JSON-RPC endpoint for `HttpProvider`
    /// - `HNS_REFRESH_DELAY_MS`: delay before post-mutation listing refresh
    /// - `HNS_RECEIPT_POLL_MS`: receipt polling interval
    /// - `HNS_RECEIPT_MAX_ATTEMPTS`: receipt polling limit
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var("HNS_CONTRACT_ADDRESS") {
            match Address::from_str(raw.trim()) {
                Ok(address) => {
                    log::info!("📜 Registry contract: {:?}", address);
                    config.contract_address = address;
                }
                Err(e) => {
                    log::warn!("⚠️  Invalid HNS_CONTRACT_ADDRESS '{}' ({}), using default", raw, e);
                }
            }
        }

        if let Ok(url) = env::var("HNS_RPC_URL") {
            config.rpc_url = url;
        }
        log::info!("📡 RPC URL: {}", config.rpc_url);

        if let Some(ms) = env_u64("HNS_REFRESH_DELAY_MS") {
            config.refresh_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("HNS_RECEIPT_POLL_MS") {
            config.receipt_poll_interval = Duration::from_millis(ms);
        }
        if let Some(raw) = env_u64("HNS_RECEIPT_MAX_ATTEMPTS") {
            match receipt_attempts(raw) {
                Some(attempts) => config.receipt_max_attempts = attempts,
                None => log::warn!(
                    "⚠️  HNS_RECEIPT_MAX_ATTEMPTS={} is out of range, using {}",
                    raw,
                    config.receipt_max_attempts
                ),
            }
        }

        config
    }

    /// Label with the display suffix attached
    pub fn display_name(&self, label: &str) -> String {
        format!("{}{}", label, self.tld)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("⚠️  Ignoring non-numeric {}='{}'", key, raw);
            None
        }
    }
}

/// At least one poll; `None` if the value does not fit a `u32`
fn receipt_attempts(raw: u64) -> Option<u32> {
    u32::try_from(raw).ok().map(|attempts| attempts.max(1))
}

impl Default for NameServiceConfig {
    /// Compiled-in configuration (Polygon Mumbai)
    fn default() -> Self {
        let chain = ChainConfig::mumbai();
        Self {
            contract_address: CONTRACT_ADDRESS,
            tld: TLD.to_string(),
            rpc_url: chain.rpc_urls[0].clone(),
            chain,
            refresh_delay: Duration::from_secs(2),
            receipt_poll_interval: Duration::from_secs(2),
            receipt_max_attempts: 150,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_constant_matches_deployment() {
        let parsed = Address::from_str("0xf61942735c77021a06cF1587db9fa08474A65eb9").unwrap();
        assert_eq!(CONTRACT_ADDRESS, parsed);
    }

    #[test]
    fn test_default_is_mumbai() {
        let config = NameServiceConfig::default();
        assert_eq!(config.chain.chain_id_hex(), "0x13881");
        assert_eq!(config.chain.chain_name, "Polygon Mumbai Testnet");
        assert_eq!(config.display_name("abc"), "abc.hell");
    }

    #[test]
    fn test_add_chain_params() {
        let params = ChainConfig::mumbai().add_chain_params();
        assert_eq!(params["chainId"], "0x13881");
        assert_eq!(params["rpcUrls"][0], "https://rpc-mumbai.maticvigil.com/");
        assert_eq!(params["nativeCurrency"]["symbol"], "MATIC");
        assert_eq!(params["nativeCurrency"]["decimals"], 18);
        assert_eq!(params["blockExplorerUrls"][0], "https://mumbai.polygonscan.com/");
    }

    #[test]
    fn test_tx_url() {
        let url = ChainConfig::mumbai().tx_url(&H256::zero()).unwrap();
        assert!(url.starts_with("https://mumbai.polygonscan.com/tx/0x0000"));
    }

    #[test]
    fn test_receipt_attempts_out_of_range() {
        assert_eq!(receipt_attempts(0), Some(1));
        assert_eq!(receipt_attempts(10), Some(10));
        assert_eq!(receipt_attempts(u32::MAX as u64), Some(u32::MAX));
        // would wrap to 0 with a plain cast
        assert_eq!(receipt_attempts(4_294_967_296), None);
        assert_eq!(receipt_attempts(u64::MAX), None);
    }

    #[test]
    fn test_asset_url() {
        let url = ChainConfig::mumbai().asset_url(&CONTRACT_ADDRESS, 3).unwrap();
        assert_eq!(
            url,
            "https://testnets.opensea.io/assets/mumbai/0xf61942735c77021a06cf1587db9fa08474a65eb9/3"
        );

        let mut chain = ChainConfig::mumbai();
        chain.marketplace_url = None;
        assert_eq!(chain.asset_url(&CONTRACT_ADDRESS, 3), None);
    }
}
