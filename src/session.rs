//! Wallet session
//!
//! Owns the connection to the injected provider together with the account and
//! network the wallet last reported. Nothing outside this module writes
//! either value.

use ethers::types::Address;
use serde_json::{json, Value};
use std::str::FromStr;
use tokio::sync::{broadcast, RwLock};

use crate::domain::short_address;
use crate::error::NameServiceError;
use crate::network::{network_name, parse_chain_id};
use crate::provider::{ProviderEvent, SharedProvider};

/// Blocking notice when the user asks to connect without a wallet
pub const GET_WALLET_NOTICE: &str = "Get MetaMask!";
/// Logged when a silent check finds no wallet
pub const NO_WALLET_NOTICE: &str = "Make sure you have MetaMask!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WalletAccount {
    pub address: Option<Address>,
    pub status: ConnectionStatus,
}

impl WalletAccount {
    pub fn connected(address: Address) -> Self {
        Self {
            address: Some(address),
            status: ConnectionStatus::Connected,
        }
    }

    fn connecting() -> Self {
        Self {
            address: None,
            status: ConnectionStatus::Connecting,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected && self.address.is_some()
    }

    /// Header text: `0x1234...abcd` or "Not connected"
    pub fn display(&self) -> String {
        match (&self.status, &self.address) {
            (ConnectionStatus::Connected, Some(address)) => {
                format!("Wallet: {}", short_address(address))
            }
            (ConnectionStatus::Connecting, _) => "Connecting...".to_string(),
            _ => "Not connected".to_string(),
        }
    }
}

/// Chain the wallet reported, with a human-readable name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub chain_id: String,
    pub display_name: String,
}

impl NetworkInfo {
    pub fn from_chain_id(chain_id: &str) -> Self {
        let display_name = parse_chain_id(chain_id)
            .and_then(network_name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Unknown network ({})", chain_id));
        Self {
            chain_id: chain_id.to_lowercase(),
            display_name,
        }
    }

    pub fn chain_id_u64(&self) -> Option<u64> {
        parse_chain_id(&self.chain_id)
    }
}

pub struct WalletSession {
    provider: Option<SharedProvider>,
    account: RwLock<WalletAccount>,
    network: RwLock<Option<NetworkInfo>>,
}

impl WalletSession {
    /// `provider` is `None` when no wallet is injected
    pub fn new(provider: Option<SharedProvider>) -> Self {
        Self {
            provider,
            account: RwLock::new(WalletAccount::default()),
            network: RwLock::new(None),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// The injected provider, or `ProviderUnavailable` carrying `notice`
    pub fn provider_or(&self, notice: &str) -> Result<&SharedProvider, NameServiceError> {
        self.provider
            .as_ref()
            .ok_or_else(|| NameServiceError::ProviderUnavailable(notice.to_string()))
    }

    pub fn provider(&self) -> Result<&SharedProvider, NameServiceError> {
        self.provider_or(NO_WALLET_NOTICE)
    }

    /// Request account access, prompting the user
    pub async fn connect(&self) -> Result<Address, NameServiceError> {
        let provider = self.provider_or(GET_WALLET_NOTICE)?;

        *self.account.write().await = WalletAccount::connecting();

        let accounts = match provider.request("eth_requestAccounts", json!([])).await {
            Ok(value) => parse_accounts(&value),
            Err(e) => Err(e.into()),
        };

        let result = accounts.and_then(|list| list.first().copied().ok_or(NameServiceError::NotConnected));
        match result {
            Ok(address) => {
                log::info!("Connected {:?}", address);
                *self.account.write().await = WalletAccount::connected(address);
                Ok(address)
            }
            Err(e) => {
                if e.is_user_rejection() {
                    log::info!("Wallet connection declined: {}", e);
                } else {
                    log::warn!("Wallet connection failed: {}", e);
                }
                *self.account.write().await = WalletAccount::default();
                Err(e)
            }
        }
    }

    /// Read already-authorized accounts without prompting
    ///
    /// An empty list leaves the session disconnected and is not an error.
    pub async fn get_active_account(&self) -> Result<Option<Address>, NameServiceError> {
        let provider = self.provider()?;
        let value = provider.request("eth_accounts", json!([])).await?;
        let accounts = parse_accounts(&value)?;
        Ok(self.adopt_accounts(&accounts).await)
    }

    /// Apply an `accountsChanged` notification
    pub async fn apply_accounts(&self, accounts: &[String]) -> Result<Option<Address>, NameServiceError> {
        let parsed = accounts
            .iter()
            .map(|a| parse_address(a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.adopt_accounts(&parsed).await)
    }

    async fn adopt_accounts(&self, accounts: &[Address]) -> Option<Address> {
        let mut account = self.account.write().await;
        match accounts.first() {
            Some(address) => {
                log::info!("Found an authorized account: {:?}", address);
                *account = WalletAccount::connected(*address);
                Some(*address)
            }
            None => {
                log::info!("No authorized account found");
                *account = WalletAccount::default();
                None
            }
        }
    }

    /// Read `eth_chainId` and record it as the current network
    pub async fn refresh_network(&self) -> Result<NetworkInfo, NameServiceError> {
        let provider = self.provider()?;
        let value = provider.request("eth_chainId", json!([])).await?;
        let chain_id = value
            .as_str()
            .ok_or_else(|| NameServiceError::invalid_response(format!("eth_chainId returned {}", value)))?;

        let info = NetworkInfo::from_chain_id(chain_id);
        log::debug!("Active network: {} ({})", info.display_name, info.chain_id);
        *self.network.write().await = Some(info.clone());
        Ok(info)
    }

    /// Chain and account notifications, if a provider is present
    pub fn subscribe(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        self.provider.as_ref().map(|p| p.subscribe())
    }

    pub async fn account(&self) -> WalletAccount {
        self.account.read().await.clone()
    }

    pub async fn active_address(&self) -> Option<Address> {
        let account = self.account.read().await;
        if account.is_connected() {
            account.address
        } else {
            None
        }
    }

    pub async fn network(&self) -> Option<NetworkInfo> {
        self.network.read().await.clone()
    }

    pub async fn disconnect(&self) {
        log::info!("Wallet session disconnected");
        *self.account.write().await = WalletAccount::default();
    }

    /// Forget everything derived from the provider
    pub async fn invalidate(&self) {
        *self.account.write().await = WalletAccount::default();
        *self.network.write().await = None;
    }
}

pub(crate) fn parse_address(raw: &str) -> Result<Address, NameServiceError> {
    Address::from_str(raw.trim())
        .map_err(|e| NameServiceError::invalid_response(format!("bad address '{}': {}", raw, e)))
}

pub(crate) fn parse_accounts(value: &Value) -> Result<Vec<Address>, NameServiceError> {
    let list = value
        .as_array()
        .ok_or_else(|| NameServiceError::invalid_response(format!("expected account list, got {}", value)))?;
    list.iter()
        .map(|entry| {
            entry
                .as_str()
                .ok_or_else(|| NameServiceError::invalid_response(format!("bad account entry {}", entry)))
                .and_then(parse_address)
        })
        .collect()
}
