//! Error types for name service operations
//!
//! Every failure a pipeline can hit maps onto one of these variants. Whether
//! the user sees a blocking notice or the failure is only logged is decided
//! by [`NameServiceError::notice`].

use ethers::types::H256;
use thiserror::Error;

use crate::provider::{ProviderError, UNRECOGNIZED_CHAIN, USER_REJECTED_REQUEST};

/// Notice shown when a transaction receipt reports failure
pub const TRANSACTION_FAILED_NOTICE: &str = "Transaction failed, please try again.";

/// Core error type for wallet, network and registry operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameServiceError {
    /// No injected wallet provider; carries the instruction shown to the user
    #[error("Wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Input rejected before any chain interaction
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The human declined a wallet prompt
    #[error("Request rejected in wallet: {0}")]
    UserRejected(String),

    /// Wallet is on a chain other than the required one, or does not know it
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    /// Transaction was included but its receipt reports failure
    #[error("Transaction {tx_hash} failed")]
    TransactionFailed { tx_hash: String },

    /// RPC or network failure between us and the chain
    #[error("Transport error: {0}")]
    Transport(String),

    /// A mutation was requested without an authorized account
    #[error("No wallet account connected")]
    NotConnected,

    /// Another mutating pipeline holds the lock
    #[error("Another transaction is already in progress")]
    Busy,

    /// The mint transaction succeeded but attaching the record did not
    #[error("Domain {label} was minted but its record was not set: {source}")]
    RecordNotSet {
        label: String,
        source: Box<NameServiceError>,
    },

    /// Provider or contract returned a payload we could not decode
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NameServiceError {
    /// Text for a blocking user notice, or `None` when the failure is only logged
    ///
    /// Rejections are self-resolvable (the user just tries again), so they stay
    /// silent. Everything else blocks until the user acts on it.
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::UserRejected(_) => None,
            Self::ProviderUnavailable(msg) | Self::Validation(msg) => Some(msg.clone()),
            Self::TransactionFailed { .. } => Some(TRANSACTION_FAILED_NOTICE.to_string()),
            Self::Transport(msg) => Some(format!("Network request failed: {}", msg)),
            Self::NotConnected => Some("Connect your wallet first.".to_string()),
            Self::Busy => Some("Another transaction is already in progress.".to_string()),
            Self::UnsupportedChain(_) | Self::RecordNotSet { .. } | Self::InvalidResponse(_) => {
                Some(self.to_string())
            }
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected(_))
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn transaction_failed(tx_hash: &H256) -> Self {
        Self::TransactionFailed {
            tx_hash: format!("{:?}", tx_hash),
        }
    }
}

impl From<ProviderError> for NameServiceError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rpc { code, message } if code == USER_REJECTED_REQUEST => {
                Self::UserRejected(message)
            }
            ProviderError::Rpc { code, message } if code == UNRECOGNIZED_CHAIN => {
                Self::UnsupportedChain(message)
            }
            ProviderError::Rpc { code, message } => {
                Self::Transport(format!("RPC error {}: {}", code, message))
            }
            ProviderError::Transport(msg) => Self::Transport(msg),
        }
    }
}
