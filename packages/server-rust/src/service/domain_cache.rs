//! Domain metadata cache.
//!
//! The history host consults the cache for domain names and replication
//! settings. [`LocalDomainCache`] keeps entries in memory, indexed by ID and by
//! name, and is also the target domain replication tasks are applied to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use history_router_core::messages::{
    DomainCacheInfo, DomainConfiguration, DomainInfo, DomainReplicationConfiguration,
};
use tracing::info;

/// Domain cache contract consumed by the history service.
#[async_trait]
pub trait DomainCache: Send + Sync {
    /// Starts background refresh, if any.
    async fn start(&self) -> anyhow::Result<()>;

    /// Stops background refresh. Entries stay readable.
    async fn stop(&self) -> anyhow::Result<()>;

    /// Number of entries indexed by ID and by name.
    fn cache_size_stats(&self) -> DomainCacheInfo;
}

/// One cached domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEntry {
    pub id: String,
    pub info: DomainInfo,
    pub config: DomainConfiguration,
    pub replication_config: DomainReplicationConfiguration,
    pub config_version: i64,
    pub failover_version: i64,
}

impl DomainEntry {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }
}

// ---------------------------------------------------------------------------
// LocalDomainCache
// ---------------------------------------------------------------------------

/// Result of [`LocalDomainCache::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Inserted,
    Updated,
    Unchanged,
}

/// In-memory domain cache.
#[derive(Default)]
pub struct LocalDomainCache {
    by_id: DashMap<String, Arc<DomainEntry>>,
    /// Name to ID.
    by_name: DashMap<String, String>,
    running: AtomicBool,
}

impl LocalDomainCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Inserts or replaces an entry, re-indexing its name.
    pub fn upsert(&self, entry: DomainEntry) {
        let entry = Arc::new(entry);
        if let Some(previous) = self.by_id.insert(entry.id.clone(), Arc::clone(&entry)) {
            if previous.name() != entry.name() {
                self.by_name.remove(previous.name());
            }
        }
        self.by_name.insert(entry.name().to_string(), entry.id.clone());
    }

    /// Inserts `entry` unless its ID is already cached. Returns whether it
    /// was inserted.
    pub fn create(&self, entry: DomainEntry) -> bool {
        match self.by_id.entry(entry.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                self.by_name.insert(entry.name().to_string(), entry.id.clone());
                slot.insert(Arc::new(entry));
                true
            }
        }
    }

    /// Merges `incoming` into the cached entry with the same ID, inserting it
    /// if absent.
    ///
    /// Info and config move only with a higher config version; replication
    /// config moves only with a higher failover version. Both comparisons run
    /// under the entry lock, so concurrent merges never regress a version.
    pub fn merge(&self, incoming: DomainEntry) -> Merge {
        match self.by_id.entry(incoming.id.clone()) {
            Entry::Vacant(slot) => {
                self.by_name
                    .insert(incoming.name().to_string(), incoming.id.clone());
                slot.insert(Arc::new(incoming));
                Merge::Inserted
            }
            Entry::Occupied(mut slot) => {
                let current = Arc::clone(slot.get());
                let mut merged = (*current).clone();
                if incoming.config_version > current.config_version {
                    merged.info = incoming.info;
                    merged.config = incoming.config;
                    merged.config_version = incoming.config_version;
                }
                if incoming.failover_version > current.failover_version {
                    merged.replication_config = incoming.replication_config;
                    merged.failover_version = incoming.failover_version;
                }
                if merged == *current {
                    return Merge::Unchanged;
                }
                if merged.name() != current.name() {
                    self.by_name.remove(current.name());
                }
                self.by_name
                    .insert(merged.name().to_string(), merged.id.clone());
                slot.insert(Arc::new(merged));
                Merge::Updated
            }
        }
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<Arc<DomainEntry>> {
        self.by_id.get(id).map(|e| Arc::clone(e.value()))
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<Arc<DomainEntry>> {
        let id = self.by_name.get(name)?.value().clone();
        self.get_by_id(&id)
    }

    pub fn remove(&self, id: &str) -> Option<Arc<DomainEntry>> {
        let (_, entry) = self.by_id.remove(id)?;
        self.by_name.remove(entry.name());
        Some(entry)
    }
}

#[async_trait]
impl DomainCache for LocalDomainCache {
    async fn start(&self) -> anyhow::Result<()> {
        self.running.store(true, Ordering::Release);
        info!(domains = self.by_id.len(), "domain cache started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.running.store(false, Ordering::Release);
        info!("domain cache stopped");
        Ok(())
    }

    fn cache_size_stats(&self) -> DomainCacheInfo {
        DomainCacheInfo {
            num_of_items_in_cache_by_id: self.by_id.len() as u64,
            num_of_items_in_cache_by_name: self.by_name.len() as u64,
        }
    }
}
