//! Required-network enforcement
//!
//! The registry lives on exactly one chain. `NetworkGuard` checks the wallet
//! against it and drives the two-phase recovery: ask the wallet to switch,
//! and only if the wallet has never heard of the chain, ask it to add it.

use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::ChainConfig;
use crate::error::NameServiceError;
use crate::session::{NetworkInfo, WalletSession};

/// Blocking notice when a network switch is requested without a wallet
pub const INSTALL_WALLET_NOTICE: &str =
    "MetaMask is not installed. Please install it to use this app: https://metamask.io/download.html";

/// Parse a `0x`-prefixed (or bare) hex chain id
pub fn parse_chain_id(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u64::from_str_radix(digits, 16).ok()
}

/// Display names for chains a wallet commonly reports
pub fn network_name(chain_id: u64) -> Option<&'static str> {
    let name = match chain_id {
        0x1 => "Mainnet",
        0x3 => "Ropsten",
        0x2a => "Kovan",
        0x4 => "Rinkeby",
        0x5 => "Goerli",
        0x61 => "BSC Testnet",
        0x38 => "BSC Mainnet",
        0x89 => "Polygon Mainnet",
        0x13881 => "Polygon Mumbai Testnet",
        0xa86a => "AVAX Mainnet",
        _ => return None,
    };
    Some(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkOutcome {
    /// Wallet was already on the required chain
    AlreadyActive,
    /// Wallet switched to a chain it already knew
    Switched,
    /// Wallet had to add the chain first
    Added,
}

pub struct NetworkGuard {
    session: Arc<WalletSession>,
    chain: ChainConfig,
    active_chain_id: RwLock<Option<u64>>,
}

impl NetworkGuard {
    pub fn new(session: Arc<WalletSession>, chain: ChainConfig) -> Self {
        Self {
            session,
            chain,
            active_chain_id: RwLock::new(None),
        }
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub fn required_chain_id(&self) -> u64 {
        self.chain.chain_id
    }

    /// Last chain id observed from the wallet
    pub async fn active_chain_id(&self) -> Option<u64> {
        *self.active_chain_id.read().await
    }

    pub async fn is_on_required_chain(&self) -> bool {
        self.active_chain_id().await == Some(self.chain.chain_id)
    }

    /// Re-read the active chain from the wallet
    pub async fn refresh(&self) -> Result<NetworkInfo, NameServiceError> {
        let info = self.session.refresh_network().await?;
        *self.active_chain_id.write().await = info.chain_id_u64();
        Ok(info)
    }

    /// Fail with `UnsupportedChain` unless the wallet is on the required chain
    pub async fn verify(&self) -> Result<NetworkInfo, NameServiceError> {
        let info = self.refresh().await?;
        if info.chain_id_u64() == Some(self.chain.chain_id) {
            Ok(info)
        } else {
            Err(NameServiceError::UnsupportedChain(format!(
                "connected to {}, please connect to the {}",
                info.display_name, self.chain.chain_name
            )))
        }
    }

    /// Get the wallet onto the required chain
    pub async fn ensure_network(&self) -> Result<NetworkOutcome, NameServiceError> {
        let provider = self.session.provider_or(INSTALL_WALLET_NOTICE)?.clone();

        let info = self.refresh().await?;
        if info.chain_id_u64() == Some(self.chain.chain_id) {
            log::debug!("Already on {}", self.chain.chain_name);
            return Ok(NetworkOutcome::AlreadyActive);
        }

        let chain_id = self.chain.chain_id_hex();
        log::info!(
            "Switching wallet from {} to {} ({})",
            info.display_name,
            self.chain.chain_name,
            chain_id
        );

        match provider
            .request("wallet_switchEthereumChain", json!([{ "chainId": chain_id }]))
            .await
        {
            Ok(_) => Ok(NetworkOutcome::Switched),
            Err(e) if e.is_unrecognized_chain() => {
                log::info!(
                    "Wallet does not know {}, requesting it be added",
                    self.chain.chain_name
                );
                provider
                    .request(
                        "wallet_addEthereumChain",
                        json!([self.chain.add_chain_params()]),
                    )
                    .await
                    .map_err(|e| {
                        log::warn!("Adding {} failed: {}", self.chain.chain_name, e);
                        NameServiceError::from(e)
                    })?;
                Ok(NetworkOutcome::Added)
            }
            Err(e) => {
                log::warn!("Network switch failed: {}", e);
                Err(e.into())
            }
        }
    }

    pub async fn invalidate(&self) {
        *self.active_chain_id.write().await = None;
    }
}
