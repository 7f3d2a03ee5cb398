//! Startup barrier.
//!
//! Calls arriving before the shard controller finishes its first acquisition
//! pass park here instead of failing with spurious ownership errors. Waiting
//! is cooperative: callers are woken through a `watch` channel, and a caller
//! whose deadline fires simply drops its wait.

use std::sync::Arc;

use tokio::sync::watch;

/// One-shot gate that opens once and stays open.
#[derive(Debug, Clone)]
pub struct StartupBarrier {
    tx: Arc<watch::Sender<bool>>,
}

impl StartupBarrier {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Releases every current and future waiter.
    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the barrier is open.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for StartupBarrier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn wait_returns_immediately_when_open() {
        let barrier = StartupBarrier::new();
        barrier.open();
        assert!(barrier.is_open());
        tokio::time::timeout(Duration::from_millis(50), barrier.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn waiters_park_until_opened() {
        let barrier = StartupBarrier::new();
        let waiter = tokio::spawn({
            let barrier = barrier.clone();
            async move { barrier.wait().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        barrier.open();
        tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn wait_can_be_abandoned_by_deadline() {
        let barrier = StartupBarrier::new();
        let result = tokio::time::timeout(Duration::from_millis(20), barrier.wait()).await;
        assert!(result.is_err());
    }
}
