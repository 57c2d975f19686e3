/// Listing Cache - in-memory view of every registered name
///
/// Repopulated from the registry on account/network change and after each
/// successful mutation. A refresh replaces the whole listing or nothing.
use chrono::{DateTime, Utc};
use ethers::types::Address;
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::NameServiceConfig;
use crate::error::NameServiceError;
use crate::registry::RegistryClient;

/// One registry entry as read back from the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintRecord {
    pub label: String,
    pub record: String,
    pub owner: Address,
    /// Index in the last `getAllNames` result; shifts if registry order changes
    pub position: usize,
}

impl MintRecord {
    /// Stable identifier (labels are unique in the registry)
    pub fn id(&self) -> &str {
        &self.label
    }

    pub fn is_owned_by(&self, account: &Address) -> bool {
        self.owner == *account
    }

    pub fn display_name(&self, tld: &str) -> String {
        format!("{}{}", self.label, tld)
    }

    /// Marketplace page for this name, using `position` as the token id
    ///
    /// Only as reliable as `position`: if registry order changes the link
    /// points at another name.
    pub fn asset_url(&self, config: &NameServiceConfig) -> Option<String> {
        config.chain.asset_url(&config.contract_address, self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New listing published with this many entries
    Published(usize),
    /// Cache was invalidated while the fetch ran; results dropped
    Discarded,
}

pub struct ListingCache {
    registry: Arc<dyn RegistryClient>,
    entries: RwLock<Arc<Vec<MintRecord>>>,
    /// Bumped on every invalidation
    epoch: AtomicU64,
    last_refreshed: RwLock<Option<DateTime<Utc>>>,
}

impl ListingCache {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            registry,
            entries: RwLock::new(Arc::new(Vec::new())),
            epoch: AtomicU64::new(0),
            last_refreshed: RwLock::new(None),
        }
    }

    /// Fetch every name, then each name's record and owner concurrently
    ///
    /// Entries keep `getAllNames` order regardless of which lookup finishes
    /// first. If any lookup fails the previous listing stays in place.
    pub async fn refresh(&self) -> Result<RefreshOutcome, NameServiceError> {
        let epoch = self.epoch.load(Ordering::SeqCst);

        let names = self.registry.get_all_names().await?;
        log::debug!("Fetching records for {} names", names.len());

        let registry = &self.registry;
        let lookups = names.into_iter().enumerate().map(|(position, label)| async move {
            let (record, owner) =
                tokio::try_join!(registry.records(&label), registry.domains(&label))?;
            Ok::<_, NameServiceError>(MintRecord {
                label,
                record,
                owner,
                position,
            })
        });
        let records = try_join_all(lookups).await?;

        let mut entries = self.entries.write().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            log::debug!("Listing invalidated during refresh, dropping {} fetched entries", records.len());
            return Ok(RefreshOutcome::Discarded);
        }

        let count = records.len();
        *entries = Arc::new(records);
        *self.last_refreshed.write().await = Some(Utc::now());
        log::info!("Listing refreshed: {} domains", count);
        Ok(RefreshOutcome::Published(count))
    }

    /// Refresh after a confirmed mutation; failures are logged, never returned
    pub async fn refresh_after_mutation(&self, delay: Duration) -> bool {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.refresh().await {
            Ok(RefreshOutcome::Published(_)) => true,
            Ok(RefreshOutcome::Discarded) => false,
            Err(e) => {
                log::warn!("Listing refresh failed: {}", e);
                false
            }
        }
    }

    /// Drop all entries; any refresh already in flight will not publish
    pub async fn invalidate(&self) {
        let mut entries = self.entries.write().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *entries = Arc::new(Vec::new());
        *self.last_refreshed.write().await = None;
    }

    pub async fn snapshot(&self) -> Arc<Vec<MintRecord>> {
        self.entries.read().await.clone()
    }

    pub async fn get(&self, label: &str) -> Option<MintRecord> {
        self.entries
            .read()
            .await
            .iter()
            .find(|entry| entry.label == label)
            .cloned()
    }

    /// Whether `account` may be offered the edit action for `label`
    pub async fn can_edit(&self, label: &str, account: &Address) -> bool {
        self.get(label)
            .await
            .is_some_and(|entry| entry.is_owned_by(account))
    }

    pub async fn owned_by(&self, account: &Address) -> Vec<MintRecord> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|entry| entry.is_owned_by(account))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        *self.last_refreshed.read().await
    }
}
