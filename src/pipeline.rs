//! Pipeline state machines
//!
//! Mint and record-edit progress is an explicit state value driven by pure
//! transition functions. Controllers feed events in; nothing else mutates
//! the state. Events that do not apply to the current state leave it
//! unchanged.

use ethers::types::H256;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::domain::{DomainLabel, PriceTier};
use crate::error::NameServiceError;

// ============================================================================
// Mint pipeline
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MintState {
    #[default]
    Idle,
    Validating {
        input: String,
    },
    SubmittingMint {
        label: DomainLabel,
        price: PriceTier,
    },
    ConfirmingMint {
        label: DomainLabel,
        tx_hash: H256,
    },
    SettingRecord {
        label: DomainLabel,
        mint_tx: H256,
    },
    ConfirmingRecord {
        label: DomainLabel,
        mint_tx: H256,
        record_tx: H256,
    },
    RefreshingListing {
        label: DomainLabel,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintEvent {
    Start { input: String },
    Validated { label: DomainLabel, price: PriceTier },
    MintSubmitted { tx_hash: H256 },
    MintConfirmed,
    RecordSubmitted { tx_hash: H256 },
    RecordConfirmed,
    Refreshed,
    Failed { message: String },
    Reset,
}

impl MintState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn step_name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating { .. } => "validating",
            Self::SubmittingMint { .. } => "submitting mint",
            Self::ConfirmingMint { .. } => "confirming mint",
            Self::SettingRecord { .. } => "setting record",
            Self::ConfirmingRecord { .. } => "confirming record",
            Self::RefreshingListing { .. } => "refreshing listing",
            Self::Error { .. } => "error",
        }
    }
}

/// Next mint state for `event`; inapplicable events return `state` unchanged
pub fn mint_transition(state: &MintState, event: MintEvent) -> MintState {
    use MintEvent as E;
    use MintState as S;

    match (state, event) {
        (S::Idle, E::Start { input }) => S::Validating { input },
        (S::Validating { .. }, E::Validated { label, price }) => S::SubmittingMint { label, price },
        (S::SubmittingMint { label, .. }, E::MintSubmitted { tx_hash }) => S::ConfirmingMint {
            label: label.clone(),
            tx_hash,
        },
        (S::ConfirmingMint { label, tx_hash }, E::MintConfirmed) => S::SettingRecord {
            label: label.clone(),
            mint_tx: *tx_hash,
        },
        (S::SettingRecord { label, mint_tx }, E::RecordSubmitted { tx_hash }) => {
            S::ConfirmingRecord {
                label: label.clone(),
                mint_tx: *mint_tx,
                record_tx: tx_hash,
            }
        }
        (S::ConfirmingRecord { label, .. }, E::RecordConfirmed) => S::RefreshingListing {
            label: label.clone(),
        },
        (S::RefreshingListing { .. }, E::Refreshed) => S::Idle,
        (_, E::Failed { message }) => S::Error { message },
        (_, E::Reset) => S::Idle,
        (current, _) => current.clone(),
    }
}

// ============================================================================
// Record edit pipeline
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Editing {
        label: String,
    },
    Submitting {
        label: String,
    },
    Confirming {
        label: String,
        tx_hash: H256,
    },
    Refreshing {
        label: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditEvent {
    Begin { label: String },
    Submit,
    Submitted { tx_hash: H256 },
    Confirmed,
    Refreshed,
    Failed,
    Cancel,
}

impl EditState {
    /// Label the user is editing, whether or not a submission is in flight
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Editing { label }
            | Self::Submitting { label }
            | Self::Confirming { label, .. }
            | Self::Refreshing { label } => Some(label),
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, Self::Editing { .. })
    }

    /// A submission is awaiting the wallet or the chain and cannot be cancelled
    pub fn in_flight(&self) -> bool {
        matches!(
            self,
            Self::Submitting { .. } | Self::Confirming { .. } | Self::Refreshing { .. }
        )
    }
}

/// Next edit state for `event`; inapplicable events return `state` unchanged
pub fn edit_transition(state: &EditState, event: EditEvent) -> EditState {
    use EditEvent as E;
    use EditState as S;

    match (state, event) {
        (S::Idle | S::Editing { .. }, E::Begin { label }) => S::Editing { label },
        (S::Editing { label }, E::Submit) => S::Submitting {
            label: label.clone(),
        },
        (S::Submitting { label }, E::Submitted { tx_hash }) => S::Confirming {
            label: label.clone(),
            tx_hash,
        },
        (S::Confirming { label, .. }, E::Confirmed) => S::Refreshing {
            label: label.clone(),
        },
        (S::Refreshing { .. }, E::Refreshed) => S::Idle,
        (S::Submitting { label } | S::Confirming { label, .. } | S::Refreshing { label }, E::Failed) => {
            S::Editing {
                label: label.clone(),
            }
        }
        (S::Editing { .. }, E::Cancel) => S::Idle,
        (current, _) => current.clone(),
    }
}

// ============================================================================
// Shared controller resources
// ============================================================================

/// At most one mutating pipeline in flight
///
/// Cloned into every controller; acquisition never waits, a second caller
/// gets `Busy` immediately.
#[derive(Clone, Default)]
pub struct PipelineLock {
    inner: Arc<Mutex<()>>,
}

impl PipelineLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<OwnedMutexGuard<()>, NameServiceError> {
        self.inner
            .clone()
            .try_lock_owned()
            .map_err(|_| NameServiceError::Busy)
    }

    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

/// Domain and record inputs as the user typed them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftForm {
    pub domain: String,
    pub record: String,
}

impl DraftForm {
    pub fn clear(&mut self) {
        self.domain.clear();
        self.record.clear();
    }
}

pub type SharedDraft = Arc<RwLock<DraftForm>>;
