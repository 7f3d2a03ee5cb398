//! History service assembly and start/stop ordering.
//!
//! [`HistoryService`] wires the shard controller, the dispatch pipeline and
//! the gateway together and owns the startup barrier.
//!
//! **Start:** domain cache, shard controller (initial acquisition pass),
//! startup barrier, ready.
//!
//! **Stop:** domain cache, shard controller, persistence managers, then the
//! base service drains in-flight calls. Every step runs even if an earlier
//! one failed.

use std::sync::Arc;

use anyhow::{bail, Context};
use history_router_core::{JsonTaskTokenSerializer, TaskTokenSerializer};
use tracing::{info, warn};

use super::barrier::StartupBarrier;
use super::config::ServerConfig;
use super::domain_cache::DomainCache;
use super::gateway::HistoryHandler;
use super::middleware::build_history_pipeline;
use super::rate_limit::TokenBucket;
use super::router::ShardRouter;
use super::translate::ErrorTranslator;
use crate::cluster::MembershipResolver;
use crate::network::ShutdownController;
use crate::persistence::PersistenceManagers;
use crate::shard::{EngineFactory, ShardController, ShardOwnershipTable};

pub struct HistoryService {
    config: ServerConfig,
    controller: Arc<ShardController>,
    handler: Arc<HistoryHandler>,
    barrier: StartupBarrier,
    domain_cache: Arc<dyn DomainCache>,
    persistence: PersistenceManagers,
    shutdown: Arc<ShutdownController>,
}

impl HistoryService {
    /// Builds the service. Nothing runs until [`Self::start`].
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`ServerConfig::validate`].
    pub fn new(
        config: ServerConfig,
        resolver: Arc<dyn MembershipResolver>,
        factory: Arc<dyn EngineFactory>,
        domain_cache: Arc<dyn DomainCache>,
        persistence: PersistenceManagers,
    ) -> anyhow::Result<Self> {
        Self::with_token_serializer(
            config,
            resolver,
            factory,
            domain_cache,
            persistence,
            Arc::new(JsonTaskTokenSerializer),
        )
    }

    /// # Errors
    ///
    /// Returns an error if `config` fails [`ServerConfig::validate`].
    pub fn with_token_serializer(
        config: ServerConfig,
        resolver: Arc<dyn MembershipResolver>,
        factory: Arc<dyn EngineFactory>,
        domain_cache: Arc<dyn DomainCache>,
        persistence: PersistenceManagers,
        tokens: Arc<dyn TaskTokenSerializer>,
    ) -> anyhow::Result<Self> {
        config.validate().context("invalid history service config")?;
        let host = config.host();
        let controller = Arc::new(ShardController::new(
            host.clone(),
            Arc::new(ShardOwnershipTable::new(config.number_of_shards)),
            Arc::clone(&resolver),
            factory,
        ));
        let translator = Arc::new(ErrorTranslator::new(resolver, host.address));
        let router = ShardRouter::new(Arc::clone(&controller), translator, tokens);
        let barrier = StartupBarrier::new();
        let limiter = Arc::new(TokenBucket::per_second(config.rps, config.burst));
        let shutdown = Arc::new(ShutdownController::new());

        let handler = Arc::new(HistoryHandler::new(
            build_history_pipeline(router, barrier.clone(), limiter),
            Arc::clone(&controller),
            barrier.clone(),
            Arc::clone(&domain_cache),
            Arc::clone(&shutdown),
            config.default_call_timeout,
        ));

        Ok(Self {
            config,
            controller,
            handler,
            barrier,
            domain_cache,
            persistence,
            shutdown,
        })
    }

    #[must_use]
    pub fn handler(&self) -> Arc<HistoryHandler> {
        Arc::clone(&self.handler)
    }

    #[must_use]
    pub fn controller(&self) -> Arc<ShardController> {
        Arc::clone(&self.controller)
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    #[must_use]
    pub fn barrier(&self) -> StartupBarrier {
        self.barrier.clone()
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Starts the domain cache and the shard controller, then admits traffic.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain cache fails to start. The barrier stays
    /// closed in that case.
    pub async fn start(&self) -> anyhow::Result<()> {
        self.domain_cache.start().await?;
        self.controller.start().await;
        self.barrier.open();
        self.shutdown.set_ready();
        info!(
            host = %self.config.host_identity,
            address = %self.config.host_address,
            shards = self.config.number_of_shards,
            "history service started"
        );
        Ok(())
    }

    /// Stops every component in order.
    ///
    /// # Errors
    ///
    /// Returns an error naming how many steps failed. All steps have run by
    /// then.
    pub async fn stop(&self) -> anyhow::Result<()> {
        let mut failures = 0;

        if let Err(e) = self.domain_cache.stop().await {
            failures += 1;
            warn!(error = %e, "domain cache failed to stop");
        }

        self.controller.stop().await;

        let failed_closes = self.persistence.close_all().await;
        failures += failed_closes;

        self.shutdown.trigger_shutdown();
        if !self.shutdown.wait_for_drain(self.config.drain_timeout).await {
            failures += 1;
            warn!(
                in_flight = self.shutdown.in_flight_count(),
                "in-flight calls did not drain before timeout"
            );
        }

        if failures > 0 {
            bail!("history service stopped with {failures} failed step(s)");
        }
        info!("history service stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use history_router_core::messages::{DomainCacheInfo, GetMutableStateRequest, WorkflowExecution};

    use super::*;
    use crate::cluster::HostInfo;
    use crate::network::HealthState;
    use crate::service::domain_cache::LocalDomainCache;
    use crate::shard::ControllerStatus;
    use crate::testing::{FailingPersistenceManager, RecordingEngineFactory, StaticResolver};

    const DOMAIN: &str = "3c4a1b43-5d2e-4b8f-9a60-2f1c9e3d7b11";

    fn config() -> ServerConfig {
        ServerConfig {
            host_identity: "self".to_string(),
            host_address: "self:7934".to_string(),
            number_of_shards: 4,
            drain_timeout: Duration::from_millis(200),
            ..ServerConfig::default()
        }
    }

    fn service(
        persistence: PersistenceManagers,
        domain_cache: Arc<dyn DomainCache>,
    ) -> (HistoryService, Arc<RecordingEngineFactory>) {
        let factory = Arc::new(RecordingEngineFactory::new());
        let service = HistoryService::new(
            config(),
            Arc::new(StaticResolver::new(HostInfo::new("self", "self:7934"))),
            factory.clone(),
            domain_cache,
            persistence,
        )
        .unwrap();
        (service, factory)
    }

    #[derive(Default)]
    struct BrokenCache {
        stopped: AtomicBool,
    }

    #[async_trait]
    impl DomainCache for BrokenCache {
        async fn start(&self) -> anyhow::Result<()> {
            bail!("metadata store unreachable")
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.stopped.store(true, Ordering::SeqCst);
            bail!("refresh loop wedged")
        }

        fn cache_size_stats(&self) -> DomainCacheInfo {
            DomainCacheInfo::default()
        }
    }

    #[test]
    fn zero_shards_is_refused_at_construction() {
        let result = HistoryService::new(
            ServerConfig {
                number_of_shards: 0,
                ..config()
            },
            Arc::new(StaticResolver::new(HostInfo::new("self", "self:7934"))),
            Arc::new(RecordingEngineFactory::new()),
            Arc::new(LocalDomainCache::new()),
            PersistenceManagers::new(),
        );
        let err = result.err().unwrap();
        assert!(format!("{err:#}").contains("number_of_shards must be at least 1"));
    }

    #[tokio::test]
    async fn start_opens_barrier_and_serves() {
        let (service, factory) =
            service(PersistenceManagers::new(), Arc::new(LocalDomainCache::new()));
        assert!(!service.barrier().is_open());

        service.start().await.unwrap();
        assert!(service.barrier().is_open());
        assert_eq!(service.controller().status(), ControllerStatus::Started);
        assert_eq!(
            service.shutdown_controller().health_state(),
            HealthState::Ready
        );
        assert_eq!(factory.created_count(), 4);

        service
            .handler()
            .get_mutable_state(GetMutableStateRequest {
                domain_uuid: DOMAIN.to_string(),
                execution: WorkflowExecution::current("wf"),
                ..GetMutableStateRequest::default()
            })
            .await
            .unwrap();
        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_releases_every_engine_then_closes_storage() {
        let failing = Arc::new(FailingPersistenceManager::default());
        let mut persistence = PersistenceManagers::new();
        persistence.push(failing.clone());
        let (service, factory) = service(persistence, Arc::new(LocalDomainCache::new()));
        service.start().await.unwrap();

        let err = service.stop().await.unwrap_err();
        assert!(err.to_string().contains("1 failed step"));

        for shard in 0..4 {
            assert_eq!(factory.stop_calls(shard), 1);
        }
        assert_eq!(failing.close_count(), 1);
        assert_eq!(service.controller().status(), ControllerStatus::Stopped);
        assert_eq!(
            service.shutdown_controller().health_state(),
            HealthState::Stopped
        );
    }

    #[tokio::test]
    async fn failed_domain_cache_start_keeps_barrier_closed() {
        let (service, factory) = service(PersistenceManagers::new(), Arc::new(BrokenCache::default()));

        assert!(service.start().await.is_err());
        assert!(!service.barrier().is_open());
        assert_eq!(factory.created_count(), 0);
    }

    #[tokio::test]
    async fn stop_continues_past_domain_cache_failure() {
        let cache = Arc::new(BrokenCache::default());
        let (service, _factory) = service(PersistenceManagers::new(), cache.clone());

        assert!(service.stop().await.is_err());
        assert!(cache.stopped.load(Ordering::SeqCst));
        assert_eq!(service.controller().status(), ControllerStatus::Stopped);
        assert_eq!(
            service.shutdown_controller().health_state(),
            HealthState::Stopped
        );
    }
}
