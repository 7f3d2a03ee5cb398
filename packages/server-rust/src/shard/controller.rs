//! Shard lifecycle controller.
//!
//! Owns the [`ShardOwnershipTable`] and keeps it in line with the membership
//! ring: every shard whose ring owner is this host gets exactly one engine, and
//! every engine whose shard moved away is released.
//!
//! Reconciliation is single-writer. The initial pass runs inside `start()`;
//! later passes run on a background task woken by resolver version changes.
//! Lookups read the table concurrently and only ever see fully constructed
//! engines.

use std::sync::{Arc, Weak};

use history_router_core::shard::{all_shards, shard_key};
use history_router_core::{shard_of, ShardId};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::engine::{Engine, EngineFactory, ShardContext};
use super::table::ShardOwnershipTable;
use crate::cluster::{HostInfo, MembershipResolver};

// ---------------------------------------------------------------------------
// ControllerStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of the controller.
///
/// State machine: NotStarted -> Starting -> Started -> Stopping -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    NotStarted,
    /// Initial acquisition pass in progress.
    Starting,
    Started,
    Stopping,
    Stopped,
}

impl ControllerStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }

    /// Flag-style description, e.g. `"started,not stopped,not stopping"`.
    #[must_use]
    pub fn describe(self) -> String {
        let started = matches!(self, Self::Started | Self::Stopping | Self::Stopped);
        let stopped = self == Self::Stopped;
        let stopping = self == Self::Stopping;
        format!(
            "{},{},{}",
            if started { "started" } else { "not started" },
            if stopped { "stopped" } else { "not stopped" },
            if stopping { "stopping" } else { "not stopping" },
        )
    }
}

// ---------------------------------------------------------------------------
// ControllerError
// ---------------------------------------------------------------------------

/// Engine lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("shard controller not started")]
    NotStarted,

    /// No local engine. Who owns the shard instead is the resolver's call.
    #[error("shard {shard_id} is not owned by this host")]
    ShardNotOwned { shard_id: ShardId },

    #[error("invalid shard id {shard_id}, number of shards is {number_of_shards}")]
    InvalidShard { shard_id: i64, number_of_shards: u32 },

    #[error("shard controller stopped")]
    Stopped { shard_id: ShardId },
}

// ---------------------------------------------------------------------------
// ControllerDescription
// ---------------------------------------------------------------------------

/// Read-only controller snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerDescription {
    pub number_of_shards: u32,
    pub owned_shards: Vec<ShardId>,
    pub status: ControllerStatus,
}

// ---------------------------------------------------------------------------
// ShardController
// ---------------------------------------------------------------------------

pub struct ShardController {
    host: HostInfo,
    table: Arc<ShardOwnershipTable>,
    resolver: Arc<dyn MembershipResolver>,
    factory: Arc<dyn EngineFactory>,
    status: Mutex<ControllerStatus>,
    /// Serializes reconciliation passes and shutdown.
    writer: tokio::sync::Mutex<()>,
    stop_signal: watch::Sender<bool>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl ShardController {
    #[must_use]
    pub fn new(
        host: HostInfo,
        table: Arc<ShardOwnershipTable>,
        resolver: Arc<dyn MembershipResolver>,
        factory: Arc<dyn EngineFactory>,
    ) -> Self {
        let (stop_signal, _rx) = watch::channel(false);
        Self {
            host,
            table,
            resolver,
            factory,
            status: Mutex::new(ControllerStatus::NotStarted),
            writer: tokio::sync::Mutex::new(()),
            stop_signal,
            watcher: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn status(&self) -> ControllerStatus {
        *self.status.lock()
    }

    #[must_use]
    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    #[must_use]
    pub fn table(&self) -> Arc<ShardOwnershipTable> {
        Arc::clone(&self.table)
    }

    /// Runs the initial acquisition pass and starts watching membership.
    ///
    /// Returns once every shard this host owns at call time has an engine (or
    /// failed to get one). Calling it again while starting or started is a
    /// no-op.
    pub async fn start(self: &Arc<Self>) {
        {
            let mut status = self.status.lock();
            if *status != ControllerStatus::NotStarted {
                debug!(status = status.as_str(), "shard controller start ignored");
                return;
            }
            *status = ControllerStatus::Starting;
        }

        // Subscribe before the first pass so no change between the two is lost.
        let mut changes = self.resolver.subscribe();
        let _ = changes.borrow_and_update();

        self.reconcile().await;

        // The watcher is spawned under the status lock so a concurrent stop()
        // either sees it or sees `Started` never happen.
        let mut status = self.status.lock();
        if *status != ControllerStatus::Starting {
            debug!(status = status.as_str(), "stopped during initial shard acquisition");
            return;
        }
        *status = ControllerStatus::Started;
        let weak = Arc::downgrade(self);
        let stop = self.stop_signal.subscribe();
        *self.watcher.lock() = Some(tokio::spawn(watch_membership(weak, changes, stop)));
        drop(status);

        info!(
            host = %self.host.identity,
            owned = self.table.owned_count(),
            "shard controller started"
        );
    }

    /// Stops watching membership and releases every local engine.
    ///
    /// Every engine receives exactly one `stop()` call. Release failures and
    /// panics are logged and do not prevent the remaining releases.
    pub async fn stop(&self) {
        {
            let mut status = self.status.lock();
            if matches!(
                *status,
                ControllerStatus::Stopping | ControllerStatus::Stopped
            ) {
                return;
            }
            *status = ControllerStatus::Stopping;
        }
        self.stop_signal.send_replace(true);

        let watcher = self.watcher.lock().take();
        if let Some(handle) = watcher {
            if let Err(e) = handle.await {
                warn!(error = %e, "membership watcher ended abnormally");
            }
        }

        let _writer = self.writer.lock().await;
        let engines = self.table.drain();
        info!(count = engines.len(), "releasing shard engines");

        let releases: Vec<(ShardId, JoinHandle<anyhow::Result<()>>)> = engines
            .into_iter()
            .map(|(shard_id, engine)| (shard_id, spawn_release(engine)))
            .collect();
        for (shard_id, handle) in releases {
            metrics::counter!("history_shard_releases_total").increment(1);
            log_release(shard_id, handle.await);
        }

        metrics::gauge!("history_shards_owned").set(0.0);
        *self.status.lock() = ControllerStatus::Stopped;
        info!("shard controller stopped");
    }

    /// Returns the engine owning `workflow_id`.
    ///
    /// # Errors
    ///
    /// See [`Self::get_engine_for_shard`].
    pub fn get_engine(&self, workflow_id: &str) -> Result<Arc<dyn Engine>, ControllerError> {
        self.get_engine_for_shard(self.shard_for(workflow_id))
    }

    /// Shard a workflow belongs to.
    #[must_use]
    pub fn shard_for(&self, workflow_id: &str) -> ShardId {
        shard_of(workflow_id, self.table.number_of_shards())
    }

    /// Returns the engine for an explicit shard.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::NotStarted`] before the initial pass completes
    /// - [`ControllerError::Stopped`] once stopping has begun
    /// - [`ControllerError::InvalidShard`] for an out-of-range ID
    /// - [`ControllerError::ShardNotOwned`] when this host has no engine for it
    pub fn get_engine_for_shard(
        &self,
        shard_id: ShardId,
    ) -> Result<Arc<dyn Engine>, ControllerError> {
        match self.status() {
            ControllerStatus::NotStarted | ControllerStatus::Starting => {
                return Err(ControllerError::NotStarted)
            }
            ControllerStatus::Stopping | ControllerStatus::Stopped => {
                return Err(ControllerError::Stopped { shard_id })
            }
            ControllerStatus::Started => {}
        }

        let number_of_shards = self.table.number_of_shards();
        if shard_id >= number_of_shards {
            return Err(ControllerError::InvalidShard {
                shard_id: i64::from(shard_id),
                number_of_shards,
            });
        }

        self.table
            .engine(shard_id)
            .ok_or(ControllerError::ShardNotOwned { shard_id })
    }

    /// Converts a wire shard ID, rejecting negative or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidShard`] if the ID is not a valid shard.
    pub fn shard_id_from_wire(&self, shard_id: i64) -> Result<ShardId, ControllerError> {
        let number_of_shards = self.table.number_of_shards();
        ShardId::try_from(shard_id)
            .ok()
            .filter(|id| *id < number_of_shards)
            .ok_or(ControllerError::InvalidShard {
                shard_id,
                number_of_shards,
            })
    }

    #[must_use]
    pub fn describe(&self) -> ControllerDescription {
        ControllerDescription {
            number_of_shards: self.table.number_of_shards(),
            owned_shards: self.table.owned_shards(),
            status: self.status(),
        }
    }

    /// One acquisition/release pass over every shard.
    async fn reconcile(&self) {
        let _writer = self.writer.lock().await;
        if matches!(
            self.status(),
            ControllerStatus::Stopping | ControllerStatus::Stopped
        ) {
            return;
        }

        let number_of_shards = self.table.number_of_shards();
        for shard_id in all_shards(number_of_shards) {
            if self.status() == ControllerStatus::Stopping {
                debug!(shard_id, "stop requested, ending reconcile pass");
                break;
            }
            let owner = match self.resolver.lookup(&shard_key(shard_id)) {
                Ok(owner) => owner,
                Err(e) => {
                    // Ownership unknown: leave the shard as it is.
                    warn!(shard_id, error = %e, "shard owner lookup failed");
                    continue;
                }
            };
            if owner.identity == self.host.identity {
                if !self.table.has_engine(shard_id) {
                    self.acquire(shard_id, number_of_shards).await;
                }
            } else if let Some(engine) = self.table.take(shard_id) {
                info!(shard_id, "releasing shard");
                metrics::counter!("history_shard_releases_total").increment(1);
                log_release(shard_id, spawn_release(engine).await);
            }
        }

        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!("history_shards_owned").set(self.table.owned_count() as f64);
    }

    async fn acquire(&self, shard_id: ShardId, number_of_shards: u32) {
        let ctx = ShardContext {
            shard_id,
            host: self.host.clone(),
            number_of_shards,
        };
        match self.factory.create_engine(ctx).await {
            Ok(engine) => {
                if let Some(duplicate) = self.table.install(shard_id, engine) {
                    warn!(shard_id, "shard already has an engine, releasing duplicate");
                    log_release(shard_id, spawn_release(duplicate).await);
                } else {
                    info!(shard_id, "acquired shard");
                    metrics::counter!("history_shard_acquisitions_total").increment(1);
                }
            }
            Err(e) => error!(shard_id, error = %e, "failed to create shard engine"),
        }
    }
}

/// Background loop: one reconcile pass per membership change.
async fn watch_membership(
    controller: Weak<ShardController>,
    mut changes: watch::Receiver<u64>,
    mut stop: watch::Receiver<bool>,
) {
    if *stop.borrow_and_update() {
        return;
    }
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let version = *changes.borrow_and_update();
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                debug!(version, "membership changed, reconciling shards");
                controller.reconcile().await;
            }
            () = async {
                let _ = stop.wait_for(|stopping| *stopping).await;
            } => break,
        }
    }
}

/// Runs `stop()` on its own task so a panicking engine cannot take the caller
/// down with it.
fn spawn_release(engine: Arc<dyn Engine>) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { engine.stop().await })
}

fn log_release(shard_id: ShardId, result: Result<anyhow::Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => debug!(shard_id, "shard engine released"),
        Ok(Err(e)) => warn!(shard_id, error = %e, "shard engine release failed"),
        Err(e) => warn!(shard_id, error = %e, "shard engine release panicked"),
    }
}
