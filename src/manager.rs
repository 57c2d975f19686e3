//! Name Service Manager - Orchestration Layer
//!
//! Wires session, network guard, listing and both pipelines together and
//! owns the resynchronization that follows a chain change.

use ethers::types::Address;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::config::NameServiceConfig;
use crate::edit::{EditOutcome, RecordEditController};
use crate::error::NameServiceError;
use crate::listing::{ListingCache, MintRecord, RefreshOutcome};
use crate::mint::{MintController, MintOutcome};
use crate::network::{NetworkGuard, NetworkOutcome};
use crate::pipeline::{DraftForm, PipelineLock, SharedDraft};
use crate::provider::{HttpProvider, ProviderEvent, SharedProvider};
use crate::registry::{ProviderRegistry, RegistryClient};
use crate::session::{NetworkInfo, WalletSession, NO_WALLET_NOTICE};

/// What a (re)synchronization derived from the wallet and chain
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub provider_available: bool,
    pub account: Option<Address>,
    pub network: Option<NetworkInfo>,
    /// Entries published, or `None` when the listing was not refreshed
    pub listing_entries: Option<usize>,
}

pub struct NameServiceManager {
    pub config: NameServiceConfig,
    session: Arc<WalletSession>,
    guard: Arc<NetworkGuard>,
    listing: Arc<ListingCache>,
    minter: MintController,
    editor: RecordEditController,
    draft: SharedDraft,
}

impl NameServiceManager {
    // ============================================================================
    // Constructors
    // ============================================================================

    /// Build against an injected provider (`None` when no wallet is present)
    pub fn new(provider: Option<SharedProvider>, config: NameServiceConfig) -> Self {
        let session = Arc::new(WalletSession::new(provider));
        let registry: Arc<dyn RegistryClient> =
            Arc::new(ProviderRegistry::new(session.clone(), &config));
        Self::with_registry(session, registry, config)
    }

    /// Build against the JSON-RPC endpoint in `config.rpc_url`
    pub fn over_http(config: NameServiceConfig) -> Self {
        let provider: SharedProvider = Arc::new(HttpProvider::new(config.rpc_url.clone()));
        Self::new(Some(provider), config)
    }

    /// Build with a custom registry binding
    pub fn with_registry(
        session: Arc<WalletSession>,
        registry: Arc<dyn RegistryClient>,
        config: NameServiceConfig,
    ) -> Self {
        let guard = Arc::new(NetworkGuard::new(session.clone(), config.chain.clone()));
        let listing = Arc::new(ListingCache::new(registry.clone()));
        let lock = PipelineLock::new();
        let draft: SharedDraft = Arc::default();

        let minter = MintController::new(
            registry.clone(),
            guard.clone(),
            listing.clone(),
            lock.clone(),
            draft.clone(),
            config.refresh_delay,
        );
        let editor = RecordEditController::new(
            registry,
            guard.clone(),
            listing.clone(),
            lock,
            draft.clone(),
            config.refresh_delay,
        );

        Self {
            config,
            session,
            guard,
            listing,
            minter,
            editor,
            draft,
        }
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    pub fn network_guard(&self) -> &Arc<NetworkGuard> {
        &self.guard
    }

    pub fn listing(&self) -> &Arc<ListingCache> {
        &self.listing
    }

    pub fn minter(&self) -> &MintController {
        &self.minter
    }

    pub fn editor(&self) -> &RecordEditController {
        &self.editor
    }

    // ============================================================================
    // Session & Network
    // ============================================================================

    pub async fn connect_wallet(&self) -> Result<Address, NameServiceError> {
        let address = self.session.connect().await?;
        if let Err(e) = self.guard.refresh().await {
            log::warn!("Could not read the active network: {}", e);
        }
        self.refresh_listing_if_ready().await;
        Ok(address)
    }

    pub async fn ensure_network(&self) -> Result<NetworkOutcome, NameServiceError> {
        self.guard.ensure_network().await
    }

    /// Derive account, network and listing from the wallet without prompting
    pub async fn synchronize(&self) -> Result<SyncReport, NameServiceError> {
        if !self.session.has_provider() {
            log::warn!("{}", NO_WALLET_NOTICE);
            return Ok(SyncReport::default());
        }

        let account = self.session.get_active_account().await?;
        let network = self.guard.refresh().await?;
        let listing_entries = self.refresh_listing_if_ready().await;

        Ok(SyncReport {
            provider_available: true,
            account,
            network: Some(network),
            listing_entries,
        })
    }

    /// Discard all derived state and rebuild it from the wallet and chain
    pub async fn resynchronize(&self) -> Result<SyncReport, NameServiceError> {
        log::info!("Resynchronizing wallet, network and listing");
        self.session.invalidate().await;
        self.guard.invalidate().await;
        self.listing.invalidate().await;
        self.editor.invalidate().await;
        if !self.minter.state().await.is_idle() {
            log::warn!("Resynchronizing while a mint is in flight; its result may predate the chain change");
        }
        self.draft.write().await.clear();

        self.synchronize().await
    }

    pub async fn handle_event(&self, event: ProviderEvent) -> Result<SyncReport, NameServiceError> {
        match event {
            ProviderEvent::ChainChanged(chain_id) => {
                log::info!("Chain changed to {}", chain_id);
                self.resynchronize().await
            }
            ProviderEvent::AccountsChanged(accounts) => {
                let account = self.session.apply_accounts(&accounts).await?;
                let listing_entries = self.refresh_listing_if_ready().await;
                Ok(SyncReport {
                    provider_available: true,
                    account,
                    network: self.session.network().await,
                    listing_entries,
                })
            }
        }
    }

    /// Apply provider notifications until the channel closes
    ///
    /// Runs on whatever task the host drives it from. A lagged receiver has
    /// missed events, so it falls back to a full resynchronization.
    pub async fn process_events(&self, mut events: broadcast::Receiver<ProviderEvent>) {
        loop {
            let result = match events.recv().await {
                Ok(event) => self.handle_event(event).await,
                Err(RecvError::Lagged(missed)) => {
                    log::warn!("Missed {} provider events", missed);
                    self.resynchronize().await
                }
                Err(RecvError::Closed) => break,
            };
            if let Err(e) = result {
                log::error!("Resynchronization failed: {}", e);
            }
        }
        log::debug!("Provider event stream closed");
    }

    /// Refresh the listing when the wallet is on the required chain
    async fn refresh_listing_if_ready(&self) -> Option<usize> {
        if !self.guard.is_on_required_chain().await {
            return None;
        }
        match self.listing.refresh().await {
            Ok(RefreshOutcome::Published(count)) => Some(count),
            Ok(RefreshOutcome::Discarded) => None,
            Err(e) => {
                log::warn!("Listing refresh failed: {}", e);
                None
            }
        }
    }

    // ============================================================================
    // Draft inputs
    // ============================================================================

    pub async fn draft(&self) -> DraftForm {
        self.draft.read().await.clone()
    }

    pub async fn set_domain_input(&self, domain: &str) {
        self.draft.write().await.domain = domain.to_string();
    }

    pub async fn set_record_input(&self, record: &str) {
        self.draft.write().await.record = record.to_string();
    }

    // ============================================================================
    // Pipelines
    // ============================================================================

    /// Mint the drafted domain with the drafted record
    pub async fn mint(&self) -> Result<MintOutcome, NameServiceError> {
        let draft = self.draft().await;
        self.minter.mint(&draft.domain, &draft.record).await
    }

    pub async fn begin_edit(&self, label: &str) -> Result<(), NameServiceError> {
        self.editor.begin_edit(label).await
    }

    /// Submit the drafted record for the domain being edited
    pub async fn submit_edit(&self) -> Result<EditOutcome, NameServiceError> {
        let record = self.draft.read().await.record.clone();
        self.editor.submit(&record).await
    }

    pub async fn cancel_edit(&self) -> bool {
        self.editor.cancel().await
    }

    /// Listing entries the active account may edit
    pub async fn editable_entries(&self) -> Vec<MintRecord> {
        match self.session.active_address().await {
            Some(account) => self.listing.owned_by(&account).await,
            None => Vec::new(),
        }
    }
}
