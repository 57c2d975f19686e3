//! Wallet provider capability
//!
//! The wallet is never reached ambiently: every component that talks to it is
//! handed a [`SharedProvider`]. The surface mirrors EIP-1193, a single
//! `request(method, params)` call plus a notification stream.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

pub use http::HttpProvider;

/// EIP-1193: the user rejected the request
pub const USER_REJECTED_REQUEST: i64 = 4001;
/// EIP-1193: the requested account or method has not been authorized
pub const UNAUTHORIZED: i64 = 4100;
/// EIP-3085: the wallet does not know the requested chain
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// Capacity of provider notification channels
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Notification pushed by the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Active chain switched; carries the new hex chain id
    ChainChanged(String),
    /// Authorized account list changed
    AccountsChanged(Vec<String>),
}

/// Failure reported by a provider request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The wallet answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The request never got an answer
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl ProviderError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            Self::Transport(_) => None,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code() == Some(USER_REJECTED_REQUEST)
    }

    /// Raised by `wallet_switchEthereumChain` for chains the wallet has never seen
    pub fn is_unrecognized_chain(&self) -> bool {
        self.code() == Some(UNRECOGNIZED_CHAIN)
    }
}

/// Injected wallet capability
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Issue one request; resolves once the wallet (or the human behind it) answers
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Subscribe to chain and account notifications
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

pub type SharedProvider = Arc<dyn WalletProvider>;
