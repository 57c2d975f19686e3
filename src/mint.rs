//! Mint pipeline
//!
//! Validate → pay and register → confirm → attach the initial record →
//! confirm → refresh the listing. Two wallet prompts and two transactions per
//! successful mint; nothing is retried and nothing runs after a failed step.

use chrono::{DateTime, Utc};
use ethers::types::H256;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::ChainConfig;
use crate::domain::{DomainLabel, PriceTier};
use crate::error::NameServiceError;
use crate::listing::ListingCache;
use crate::network::NetworkGuard;
use crate::pipeline::{mint_transition, MintEvent, MintState, PipelineLock, SharedDraft};
use crate::registry::RegistryClient;

/// Result of a completed mint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintOutcome {
    pub label: DomainLabel,
    pub price: PriceTier,
    pub mint_tx: H256,
    pub record_tx: H256,
    /// False when the follow-up listing refresh failed or was superseded
    pub listing_refreshed: bool,
    pub completed_at: DateTime<Utc>,
}

pub struct MintController {
    registry: Arc<dyn RegistryClient>,
    guard: Arc<NetworkGuard>,
    listing: Arc<ListingCache>,
    lock: PipelineLock,
    draft: SharedDraft,
    state: RwLock<MintState>,
    refresh_delay: Duration,
}

impl MintController {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        guard: Arc<NetworkGuard>,
        listing: Arc<ListingCache>,
        lock: PipelineLock,
        draft: SharedDraft,
        refresh_delay: Duration,
    ) -> Self {
        Self {
            registry,
            guard,
            listing,
            lock,
            draft,
            state: RwLock::new(MintState::Idle),
            refresh_delay,
        }
    }

    pub async fn state(&self) -> MintState {
        self.state.read().await.clone()
    }

    async fn apply(&self, event: MintEvent) {
        let mut state = self.state.write().await;
        let next = mint_transition(&state, event);
        log::debug!("Mint: {} -> {}", state.step_name(), next.step_name());
        *state = next;
    }

    /// Report `err`, pass through `Error` back to `Idle`, and return it
    async fn fail<T>(&self, err: NameServiceError) -> Result<T, NameServiceError> {
        if err.is_user_rejection() {
            log::info!("Mint cancelled in wallet: {}", err);
        } else {
            log::error!("Mint failed: {}", err);
        }
        self.apply(MintEvent::Failed {
            message: err.to_string(),
        })
        .await;
        self.apply(MintEvent::Reset).await;
        Err(err)
    }

    /// Register `input` and attach `record` to it
    pub async fn mint(&self, input: &str, record: &str) -> Result<MintOutcome, NameServiceError> {
        let _permit = self.lock.try_acquire()?;

        self.apply(MintEvent::Start {
            input: input.to_string(),
        })
        .await;

        let label = match DomainLabel::parse(input) {
            Ok(label) => label,
            Err(e) => return self.fail(e).await,
        };
        if let Err(e) = self.guard.verify().await {
            return self.fail(e).await;
        }

        let price = label.price();
        self.apply(MintEvent::Validated {
            label: label.clone(),
            price,
        })
        .await;

        log::info!("Minting domain {} with price {}", label, price.ether());
        log::info!("Popping wallet now to pay for gas...");
        let mint_tx = match self.registry.register(label.as_str(), price.wei()).await {
            Ok(tx) => tx,
            Err(e) => return self.fail(e).await,
        };
        self.apply(MintEvent::MintSubmitted { tx_hash: mint_tx }).await;

        match self.registry.wait_for_receipt(mint_tx).await {
            Ok(receipt) if receipt.succeeded() => {}
            Ok(_) => return self.fail(NameServiceError::transaction_failed(&mint_tx)).await,
            Err(e) => return self.fail(e).await,
        }
        self.apply(MintEvent::MintConfirmed).await;
        log::info!("{} was minted! {}", label, self.tx_link(&mint_tx));

        let record_tx = match self.attach_record(&label, record).await {
            Ok(tx) => tx,
            Err(e) => {
                let err = NameServiceError::RecordNotSet {
                    label: label.to_string(),
                    source: Box::new(e),
                };
                log::error!("{}", err);
                self.apply(MintEvent::Failed {
                    message: err.to_string(),
                })
                .await;
                // the mint itself went through, so the listing is stale either way
                self.listing.refresh_after_mutation(self.refresh_delay).await;
                self.apply(MintEvent::Reset).await;
                return Err(err);
            }
        };
        self.apply(MintEvent::RecordConfirmed).await;
        log::info!("Record set! {}", self.tx_link(&record_tx));

        let listing_refreshed = self.listing.refresh_after_mutation(self.refresh_delay).await;
        self.apply(MintEvent::Refreshed).await;

        self.draft.write().await.clear();

        Ok(MintOutcome {
            label,
            price,
            mint_tx,
            record_tx,
            listing_refreshed,
            completed_at: Utc::now(),
        })
    }

    async fn attach_record(&self, label: &DomainLabel, record: &str) -> Result<H256, NameServiceError> {
        let tx_hash = self.registry.set_record(label.as_str(), record).await?;
        self.apply(MintEvent::RecordSubmitted { tx_hash }).await;

        let receipt = self.registry.wait_for_receipt(tx_hash).await?;
        if !receipt.succeeded() {
            return Err(NameServiceError::transaction_failed(&tx_hash));
        }
        Ok(tx_hash)
    }

    fn tx_link(&self, tx_hash: &H256) -> String {
        tx_link(self.guard.chain(), tx_hash)
    }
}

pub(crate) fn tx_link(chain: &ChainConfig, tx_hash: &H256) -> String {
    chain
        .tx_url(tx_hash)
        .unwrap_or_else(|| format!("{:?}", tx_hash))
}
