//! HNS Client: `.hell` name registry controller
//!
//! Client-side orchestration for a name registry contract deployed on Polygon
//! Mumbai. A wallet provider (EIP-1193 style) signs and relays everything;
//! this crate decides what to send, in which order, and what state to show
//! while it waits.
//!
//! # Architecture
//!
//! - **Wallet Session**: connected account and active network, read from the provider
//! - **Network Guard**: keeps the wallet on the registry's chain (switch, then add)
//! - **Registry Client**: typed calls to `register`, `setRecord` and the read views
//! - **Listing Cache**: ordered snapshot of every registered name with record and owner
//! - **Pipelines**: mint and record-edit state machines sharing one in-flight lock
//!
//! # Example
//!
//! ```ignore
//! use hns_client::{NameServiceConfig, NameServiceManager};
//!
//! let manager = NameServiceManager::new(Some(provider), NameServiceConfig::from_env());
//!
//! manager.connect_wallet().await?;
//! manager.ensure_network().await?;
//!
//! manager.set_domain_input("doom").await;
//! manager.set_record_input("my first hell name").await;
//! let outcome = manager.mint().await?;
//! println!("minted {} for {} MATIC", outcome.label, outcome.price.ether());
//! ```

// Public modules
pub mod config;
pub mod domain;
pub mod edit;
pub mod error;
pub mod listing;
pub mod manager;
pub mod mint;
pub mod network;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod session;

// Re-exports for convenience
pub use config::{ChainConfig, NameServiceConfig, CONTRACT_ADDRESS, MUMBAI_CHAIN_ID, TLD};
pub use domain::{DomainLabel, PriceTier};
pub use edit::{EditOutcome, RecordEditController};
pub use error::NameServiceError;
pub use listing::{ListingCache, MintRecord, RefreshOutcome};
pub use manager::{NameServiceManager, SyncReport};
pub use mint::{MintController, MintOutcome};
pub use network::{NetworkGuard, NetworkOutcome};
pub use pipeline::{DraftForm, EditState, MintState, PipelineLock};
pub use provider::{HttpProvider, ProviderError, ProviderEvent, SharedProvider, WalletProvider};
pub use registry::{ProviderRegistry, RegistryClient, TxReceipt};
pub use session::{ConnectionStatus, NetworkInfo, WalletAccount, WalletSession};

/// Result type for name service operations
pub type Result<T> = std::result::Result<T, NameServiceError>;
