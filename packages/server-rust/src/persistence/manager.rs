//! Handles to storage managers owned by the history service.
//!
//! The service closes every manager on stop, after all shard engines have been
//! released.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

/// A closeable storage manager (shard, execution, history, visibility, ...).
#[async_trait]
pub trait PersistenceManager: Send + Sync {
    /// Returns the manager's name for logging.
    fn name(&self) -> &'static str;

    /// Releases the manager's storage handles.
    async fn close(&self) -> anyhow::Result<()>;
}

/// Ordered set of storage managers closed together.
#[derive(Default, Clone)]
pub struct PersistenceManagers {
    managers: Vec<Arc<dyn PersistenceManager>>,
}

impl PersistenceManagers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a manager. Managers close in insertion order.
    pub fn push(&mut self, manager: Arc<dyn PersistenceManager>) {
        self.managers.push(manager);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// Closes every manager. Failures are logged and do not stop the rest.
    ///
    /// Returns the number of managers that failed to close.
    pub async fn close_all(&self) -> usize {
        let mut failures = 0;
        for manager in &self.managers {
            match manager.close().await {
                Ok(()) => info!(manager = manager.name(), "persistence manager closed"),
                Err(e) => {
                    failures += 1;
                    warn!(manager = manager.name(), error = %e, "failed to close persistence manager");
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct CountingManager {
        name: &'static str,
        fail: bool,
        closes: Arc<AtomicU32>,
    }

    #[async_trait]
    impl PersistenceManager for CountingManager {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn close(&self) -> anyhow::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("disk on fire");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn close_all_continues_past_failures() {
        let closes = Arc::new(AtomicU32::new(0));
        let mut managers = PersistenceManagers::new();
        for (name, fail) in [("shard", false), ("history", true), ("visibility", false)] {
            managers.push(Arc::new(CountingManager {
                name,
                fail,
                closes: Arc::clone(&closes),
            }));
        }

        assert_eq!(managers.close_all().await, 1);
        assert_eq!(closes.load(Ordering::SeqCst), 3);
    }
}
