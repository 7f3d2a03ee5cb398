//! Replication task ingestion.
//!
//! Tasks consumed from a remote (active) cluster arrive here. History tasks
//! become `ReplicateEvents` calls routed through the gateway like any other
//! RPC, so they are throttled, validated and redirected the same way. Domain
//! tasks go to a [`DomainReplicator`].

use std::sync::Arc;

use async_trait::async_trait;
use history_router_core::messages::{
    DomainOperation, DomainTaskAttributes, HistoryTaskAttributes, ReplicateEventsRequest,
    ReplicationTask, ReplicationTaskType, WorkflowExecution,
};
use tracing::{debug, info};

use super::domain_cache::{DomainEntry, LocalDomainCache, Merge};
use super::error::ServiceError;
use super::gateway::HistoryHandler;

pub const UNKNOWN_TASK_TYPE: &str = "Unknown replication task type.";
pub const HISTORY_ATTRIBUTES_NOT_SET: &str = "History task attributes not set.";
pub const DOMAIN_ATTRIBUTES_NOT_SET: &str = "Domain task attributes not set.";
pub const INVALID_DOMAIN_TASK: &str = "Invalid domain replication task.";

/// Applies domain metadata changes replicated from the active cluster.
#[async_trait]
pub trait DomainReplicator: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] for a task that cannot be applied.
    async fn handle_domain_task(&self, task: DomainTaskAttributes) -> Result<(), ServiceError>;
}

// ---------------------------------------------------------------------------
// ReplicationTaskHandler
// ---------------------------------------------------------------------------

/// Dispatches replication tasks from one source cluster.
pub struct ReplicationTaskHandler {
    source_cluster: String,
    handler: Arc<HistoryHandler>,
    domains: Arc<dyn DomainReplicator>,
}

impl ReplicationTaskHandler {
    #[must_use]
    pub fn new(
        source_cluster: impl Into<String>,
        handler: Arc<HistoryHandler>,
        domains: Arc<dyn DomainReplicator>,
    ) -> Self {
        Self {
            source_cluster: source_cluster.into(),
            handler,
            domains,
        }
    }

    /// Applies one task.
    ///
    /// # Errors
    ///
    /// Malformed tasks fail with [`ServiceError::BadRequest`]. History tasks
    /// otherwise fail with whatever fault the gateway returns.
    pub async fn process(&self, task: ReplicationTask) -> Result<(), ServiceError> {
        match task.task_type {
            Some(ReplicationTaskType::History) => {
                let attrs = task
                    .history_task_attributes
                    .ok_or_else(|| ServiceError::bad_request(HISTORY_ATTRIBUTES_NOT_SET))?;
                let request = self.replicate_events_request(attrs)?;
                debug!(
                    workflow_id = %request.workflow_execution.workflow_id,
                    first_event_id = request.first_event_id,
                    next_event_id = request.next_event_id,
                    "applying history replication task"
                );
                self.handler.replicate_events(request).await
            }
            Some(ReplicationTaskType::Domain) => {
                let attrs = task
                    .domain_task_attributes
                    .ok_or_else(|| ServiceError::bad_request(DOMAIN_ATTRIBUTES_NOT_SET))?;
                self.domains.handle_domain_task(attrs).await
            }
            None => Err(ServiceError::bad_request(UNKNOWN_TASK_TYPE)),
        }
    }

    fn replicate_events_request(
        &self,
        attrs: HistoryTaskAttributes,
    ) -> Result<ReplicateEventsRequest, ServiceError> {
        let HistoryTaskAttributes {
            domain_id,
            workflow_id,
            run_id,
            first_event_id,
            next_event_id,
            version,
            history,
            new_run_history,
        } = attrs;

        let (Some(workflow_id), Some(run_id), Some(first_event_id), Some(next_event_id), Some(version)) =
            (workflow_id, run_id, first_event_id, next_event_id, version)
        else {
            return Err(ServiceError::bad_request(HISTORY_ATTRIBUTES_NOT_SET));
        };

        Ok(ReplicateEventsRequest {
            source_cluster: self.source_cluster.clone(),
            // An empty domain is rejected by gateway validation.
            domain_uuid: domain_id.unwrap_or_default(),
            workflow_execution: WorkflowExecution::new(workflow_id, run_id),
            first_event_id,
            next_event_id,
            version,
            history,
            new_run_history,
            ..ReplicateEventsRequest::default()
        })
    }
}

// ---------------------------------------------------------------------------
// LocalDomainCache as a replicator
// ---------------------------------------------------------------------------

#[async_trait]
impl DomainReplicator for LocalDomainCache {
    async fn handle_domain_task(&self, task: DomainTaskAttributes) -> Result<(), ServiceError> {
        let DomainTaskAttributes {
            domain_operation: Some(operation),
            id: Some(id),
            info: Some(info),
            config: Some(config),
            replication_config: Some(replication_config),
            config_version,
            failover_version,
        } = task
        else {
            return Err(ServiceError::bad_request(INVALID_DOMAIN_TASK));
        };
        let incoming = DomainEntry {
            id,
            info,
            config,
            replication_config,
            config_version: config_version.unwrap_or_default(),
            failover_version: failover_version.unwrap_or_default(),
        };

        let id = incoming.id.clone();
        match operation {
            DomainOperation::Create => {
                let name = incoming.name().to_string();
                if !self.create(incoming) {
                    return Err(ServiceError::bad_request(format!(
                        "Domain {id} already exists."
                    )));
                }
                info!(domain_id = %id, name = name.as_str(), "replicated domain created");
            }
            DomainOperation::Update => match self.merge(incoming) {
                Merge::Inserted => info!(domain_id = %id, "replicated domain created"),
                Merge::Updated => info!(domain_id = %id, "replicated domain updated"),
                Merge::Unchanged => {}
            },
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use history_router_core::messages::{
        DomainConfiguration, DomainInfo, DomainReplicationConfiguration,
    };
    use history_router_core::{shard_of, JsonTaskTokenSerializer};

    use super::*;
    use crate::cluster::HostInfo;
    use crate::network::ShutdownController;
    use crate::service::barrier::StartupBarrier;
    use crate::service::error::ErrorKind;
    use crate::service::middleware::build_history_pipeline;
    use crate::service::operation::RpcMethod;
    use crate::service::rate_limit::TokenBucket;
    use crate::service::router::ShardRouter;
    use crate::service::translate::ErrorTranslator;
    use crate::shard::{ShardController, ShardOwnershipTable};
    use crate::testing::{RecordingEngineFactory, StaticResolver};

    const SHARDS: u32 = 4;
    const DOMAIN: &str = "3c4a1b43-5d2e-4b8f-9a60-2f1c9e3d7b11";
    const RUN: &str = "9b2d3f6e-1c4a-4e8b-8d7f-5a6b7c8d9e0f";

    async fn setup() -> (
        ReplicationTaskHandler,
        Arc<LocalDomainCache>,
        Arc<RecordingEngineFactory>,
        Arc<ShardController>,
    ) {
        let local = HostInfo::new("self", "self:7934");
        let resolver = Arc::new(StaticResolver::new(local.clone()));
        let factory = Arc::new(RecordingEngineFactory::new());
        let controller = Arc::new(ShardController::new(
            local.clone(),
            Arc::new(ShardOwnershipTable::new(SHARDS)),
            resolver.clone(),
            factory.clone(),
        ));
        controller.start().await;
        let router = ShardRouter::new(
            Arc::clone(&controller),
            Arc::new(ErrorTranslator::new(resolver, local.address)),
            Arc::new(JsonTaskTokenSerializer),
        );
        let barrier = StartupBarrier::new();
        barrier.open();
        let domains = Arc::new(LocalDomainCache::new());
        let handler = Arc::new(HistoryHandler::new(
            build_history_pipeline(router, barrier.clone(), Arc::new(TokenBucket::new(100, 0))),
            Arc::clone(&controller),
            barrier,
            domains.clone(),
            Arc::new(ShutdownController::new()),
            Duration::from_secs(5),
        ));
        let tasks = ReplicationTaskHandler::new("east", handler, domains.clone());
        (tasks, domains, factory, controller)
    }

    fn history_task(domain_id: Option<&str>) -> ReplicationTask {
        ReplicationTask {
            task_type: Some(ReplicationTaskType::History),
            history_task_attributes: Some(HistoryTaskAttributes {
                domain_id: domain_id.map(str::to_string),
                workflow_id: Some("order-9".to_string()),
                run_id: Some(RUN.to_string()),
                first_event_id: Some(1),
                next_event_id: Some(5),
                version: Some(10),
                ..HistoryTaskAttributes::default()
            }),
            ..ReplicationTask::default()
        }
    }

    fn domain_task(operation: DomainOperation, config_version: i64, active: &str) -> ReplicationTask {
        ReplicationTask {
            task_type: Some(ReplicationTaskType::Domain),
            domain_task_attributes: Some(DomainTaskAttributes {
                domain_operation: Some(operation),
                id: Some(DOMAIN.to_string()),
                info: Some(DomainInfo {
                    name: "orders".to_string(),
                    ..DomainInfo::default()
                }),
                config: Some(DomainConfiguration::default()),
                replication_config: Some(DomainReplicationConfiguration {
                    active_cluster_name: active.to_string(),
                    clusters: vec!["east".to_string(), "west".to_string()],
                }),
                config_version: Some(config_version),
                failover_version: Some(config_version),
            }),
            ..ReplicationTask::default()
        }
    }

    #[tokio::test]
    async fn history_task_becomes_replicate_events_call() {
        let (tasks, _domains, factory, controller) = setup().await;

        tasks.process(history_task(Some(DOMAIN))).await.unwrap();

        let engine = factory.engine_for(shard_of("order-9", SHARDS)).unwrap();
        assert_eq!(engine.calls(), vec![RpcMethod::ReplicateEvents]);
        controller.stop().await;
    }

    #[tokio::test]
    async fn history_task_without_domain_is_rejected() {
        let (tasks, _domains, factory, controller) = setup().await;

        let err = tasks.process(history_task(None)).await.unwrap_err();
        assert_eq!(err, ServiceError::bad_request("Domain not set on request."));
        assert!(factory.all_calls().is_empty());
        controller.stop().await;
    }

    #[tokio::test]
    async fn malformed_tasks_are_caller_faults() {
        let (tasks, _domains, _factory, controller) = setup().await;

        let err = tasks.process(ReplicationTask::default()).await.unwrap_err();
        assert_eq!(err, ServiceError::bad_request(UNKNOWN_TASK_TYPE));

        let err = tasks
            .process(ReplicationTask {
                task_type: Some(ReplicationTaskType::History),
                ..ReplicationTask::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::bad_request(HISTORY_ATTRIBUTES_NOT_SET));

        let mut partial = history_task(Some(DOMAIN));
        if let Some(attrs) = partial.history_task_attributes.as_mut() {
            attrs.version = None;
        }
        let err = tasks.process(partial).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        controller.stop().await;
    }

    #[tokio::test]
    async fn domain_tasks_update_the_cache() {
        let (tasks, domains, _factory, controller) = setup().await;

        tasks
            .process(domain_task(DomainOperation::Create, 1, "east"))
            .await
            .unwrap();
        assert_eq!(
            domains.get_by_name("orders").unwrap().replication_config.active_cluster_name,
            "east"
        );

        let err = tasks
            .process(domain_task(DomainOperation::Create, 1, "east"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        // Stale update is ignored.
        tasks
            .process(domain_task(DomainOperation::Update, 0, "west"))
            .await
            .unwrap();
        assert_eq!(
            domains.get_by_id(DOMAIN).unwrap().replication_config.active_cluster_name,
            "east"
        );

        tasks
            .process(domain_task(DomainOperation::Update, 2, "west"))
            .await
            .unwrap();
        let entry = domains.get_by_id(DOMAIN).unwrap();
        assert_eq!(entry.replication_config.active_cluster_name, "west");
        assert_eq!(entry.failover_version, 2);
        controller.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_domain_tasks_settle_on_the_newest_version() {
        let (tasks, domains, _factory, controller) = setup().await;
        let tasks = Arc::new(tasks);

        let creates: Vec<_> = (0..8)
            .map(|_| {
                let tasks = Arc::clone(&tasks);
                tokio::spawn(async move {
                    tasks
                        .process(domain_task(DomainOperation::Create, 1, "east"))
                        .await
                        .is_ok()
                })
            })
            .collect();
        let mut created = 0;
        for create in creates {
            if create.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);

        let updates: Vec<_> = (2..=33i64)
            .rev()
            .map(|version| {
                let tasks = Arc::clone(&tasks);
                tokio::spawn(async move {
                    let active = format!("c{version}");
                    tasks
                        .process(domain_task(DomainOperation::Update, version, &active))
                        .await
                })
            })
            .collect();
        for update in updates {
            update.await.unwrap().unwrap();
        }

        let entry = domains.get_by_id(DOMAIN).unwrap();
        assert_eq!(entry.failover_version, 33);
        assert_eq!(entry.config_version, 33);
        assert_eq!(entry.replication_config.active_cluster_name, "c33");
        controller.stop().await;
    }

    #[tokio::test]
    async fn domain_task_missing_fields_is_rejected() {
        let (tasks, domains, _factory, controller) = setup().await;
        let err = tasks
            .process(ReplicationTask {
                task_type: Some(ReplicationTaskType::Domain),
                domain_task_attributes: Some(DomainTaskAttributes::default()),
                ..ReplicationTask::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::bad_request(INVALID_DOMAIN_TASK));
        assert!(domains.get_by_id(DOMAIN).is_none());
        controller.stop().await;
    }
}
