//! Record edit pipeline
//!
//! Edit mode is scoped to one label. Submitting runs a single transaction:
//! `setRecord`, wait for inclusion, refresh the listing, leave edit mode.
//! Whether the active account owns the label is a presentation concern
//! (see `ListingCache::can_edit`); the contract enforces it anyway.

use ethers::types::H256;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::NameServiceError;
use crate::listing::ListingCache;
use crate::mint::tx_link;
use crate::network::NetworkGuard;
use crate::pipeline::{edit_transition, EditEvent, EditState, PipelineLock, SharedDraft};
use crate::registry::RegistryClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub label: String,
    pub record_tx: H256,
    pub listing_refreshed: bool,
}

pub struct RecordEditController {
    registry: Arc<dyn RegistryClient>,
    guard: Arc<NetworkGuard>,
    listing: Arc<ListingCache>,
    lock: PipelineLock,
    draft: SharedDraft,
    state: RwLock<EditState>,
    refresh_delay: Duration,
}

impl RecordEditController {
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
            state: RwLock::new(EditState::Idle),
            refresh_delay,
        }
    }

    pub async fn state(&self) -> EditState {
        self.state.read().await.clone()
    }

    pub async fn editing_label(&self) -> Option<String> {
        self.state.read().await.label().map(str::to_string)
    }

    async fn apply(&self, event: EditEvent) -> EditState {
        let mut state = self.state.write().await;
        *state = edit_transition(&state, event);
        state.clone()
    }

    /// Enter edit mode for `label` and prefill it as the active domain
    pub async fn begin_edit(&self, label: &str) -> Result<(), NameServiceError> {
        let next = self
            .apply(EditEvent::Begin {
                label: label.to_string(),
            })
            .await;
        if next.label() != Some(label) || next.in_flight() {
            return Err(NameServiceError::Busy);
        }

        log::info!("Editing record for {}", label);
        self.draft.write().await.domain = label.to_string();
        Ok(())
    }

    /// Leave edit mode; returns false if a submission is in flight
    pub async fn cancel(&self) -> bool {
        let next = self.apply(EditEvent::Cancel).await;
        if next.in_flight() {
            log::warn!("Cannot cancel: record update already awaiting the wallet or chain");
            return false;
        }
        true
    }

    /// Write `text` as the record of the label being edited
    pub async fn submit(&self, text: &str) -> Result<EditOutcome, NameServiceError> {
        let label = match &*self.state.read().await {
            EditState::Editing { label } => label.clone(),
            EditState::Idle => {
                return Err(NameServiceError::Validation(
                    "No domain selected for editing".to_string(),
                ))
            }
            _ => return Err(NameServiceError::Busy),
        };
        if text.is_empty() {
            return Err(NameServiceError::Validation(
                "Record must not be empty".to_string(),
            ));
        }

        let _permit = self.lock.try_acquire()?;
        self.claim(&label).await?;

        if let Err(e) = self.guard.verify().await {
            self.apply(EditEvent::Failed).await;
            return Err(e);
        }
        log::info!("Updating domain {} with record {}", label, text);

        let record_tx = match self.write_record(&label, text).await {
            Ok(tx) => tx,
            Err(e) => {
                if e.is_user_rejection() {
                    log::info!("Record update cancelled in wallet: {}", e);
                } else {
                    log::error!("Record update for {} failed: {}", label, e);
                }
                self.apply(EditEvent::Failed).await;
                return Err(e);
            }
        };
        log::info!("Record set {}", tx_link(self.guard.chain(), &record_tx));

        let listing_refreshed = self.listing.refresh_after_mutation(self.refresh_delay).await;
        self.apply(EditEvent::Refreshed).await;

        self.draft.write().await.clear();

        Ok(EditOutcome {
            label,
            record_tx,
            listing_refreshed,
        })
    }

    /// Move `Editing { label }` to `Submitting` under one write lock
    ///
    /// From here on the submission is in flight and `cancel` no longer applies.
    async fn claim(&self, label: &str) -> Result<(), NameServiceError> {
        let mut state = self.state.write().await;
        match &*state {
            EditState::Editing { label: current } if current == label => {
                *state = edit_transition(&state, EditEvent::Submit);
                Ok(())
            }
            EditState::Idle | EditState::Editing { .. } => {
                log::info!("Edit of {} was cancelled before submission", label);
                Err(NameServiceError::Validation(
                    "No domain selected for editing".to_string(),
                ))
            }
            _ => Err(NameServiceError::Busy),
        }
    }

    async fn write_record(&self, label: &str, text: &str) -> Result<H256, NameServiceError> {
        let tx_hash = self.registry.set_record(label, text).await?;
        self.apply(EditEvent::Submitted { tx_hash }).await;

        let receipt = self.registry.wait_for_receipt(tx_hash).await?;
        if !receipt.succeeded() {
            return Err(NameServiceError::transaction_failed(&tx_hash));
        }
        self.apply(EditEvent::Confirmed).await;
        Ok(tx_hash)
    }

    /// Leave edit mode unless a submission is in flight
    pub async fn invalidate(&self) {
        self.cancel().await;
    }
}
