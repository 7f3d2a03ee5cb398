//! Standalone history host for integration testing.
//!
//! Runs the full history service with recording engines and serves the health
//! and introspection endpoints. Peers listed with `--peers` share the shard
//! space through the membership ring, so several instances started with the
//! same peer list split the shards between them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Parser;
use history_router_server::cluster::{MemberInfo, MembersView, RingResolver};
use history_router_server::network::{NetworkConfig, NetworkModule};
use history_router_server::persistence::PersistenceManagers;
use history_router_server::service::{HistoryService, LocalDomainCache, ServerConfig};
use history_router_server::testing::RecordingEngineFactory;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "test-server", about = "History host with in-memory engines")]
struct Args {
    /// Identity of this host on the membership ring.
    #[arg(long, env = "HISTORY_HOST_ID", default_value = "history-0")]
    host_id: String,

    /// Address advertised to callers in shard redirects.
    #[arg(long, env = "HISTORY_HOST_ADDRESS", default_value = "127.0.0.1:7934")]
    host_address: String,

    /// Other ring members, as `id@address` separated by commas.
    #[arg(long, env = "HISTORY_PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    #[arg(
        long,
        env = "HISTORY_NUM_SHARDS",
        default_value_t = 16,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    num_shards: u32,

    #[arg(long, env = "HISTORY_RPS", default_value_t = 3000)]
    rps: u32,

    #[arg(long, env = "HISTORY_BURST", default_value_t = 0)]
    burst: u32,

    /// Default per-call deadline in milliseconds.
    #[arg(long, env = "HISTORY_CALL_TIMEOUT_MS", default_value_t = 30_000)]
    call_timeout_ms: u64,

    /// How long stop waits for in-flight calls, in milliseconds.
    #[arg(long, env = "HISTORY_DRAIN_TIMEOUT_MS", default_value_t = 10_000)]
    drain_timeout_ms: u64,

    #[arg(
        long,
        env = "HISTORY_RING_VNODES",
        default_value_t = 64,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    ring_vnodes: u32,

    /// Bind host for the health/introspection server.
    #[arg(long, env = "HISTORY_HTTP_HOST", default_value = "0.0.0.0")]
    http_host: String,

    /// Bind port for the health/introspection server. 0 picks a free port.
    #[arg(long, env = "HISTORY_HTTP_PORT", default_value_t = 0)]
    http_port: u16,

    /// Prometheus scrape endpoint. Metrics are not exported when unset.
    #[arg(long, env = "HISTORY_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "HISTORY_LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host_identity: self.host_id.clone(),
            host_address: self.host_address.clone(),
            number_of_shards: self.num_shards,
            rps: self.rps,
            burst: self.burst,
            default_call_timeout: Duration::from_millis(self.call_timeout_ms),
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
            ring_vnodes: self.ring_vnodes,
        }
    }

    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.http_host.clone(),
            port: self.http_port,
            ..NetworkConfig::default()
        }
    }

    fn members(&self) -> anyhow::Result<Vec<MemberInfo>> {
        let mut members = vec![MemberInfo::active(
            self.host_id.clone(),
            self.host_address.clone(),
        )];
        for peer in self.peers.iter().filter(|p| !p.is_empty()) {
            let (id, address) = peer
                .split_once('@')
                .ok_or_else(|| anyhow!("peer `{peer}` is not in id@address form"))?;
            members.push(MemberInfo::active(id, address));
        }
        Ok(members)
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("install prometheus exporter")?;
        info!(%addr, "prometheus exporter listening");
    }

    let config = args.server_config();
    let view = MembersView::new(1, args.members()?);
    let resolver = Arc::new(RingResolver::new(&view, config.ring_vnodes));

    let service = Arc::new(HistoryService::new(
        config,
        resolver,
        Arc::new(RecordingEngineFactory::new()),
        Arc::new(LocalDomainCache::new()),
        PersistenceManagers::new(),
    )?);

    let mut network = NetworkModule::new(args.network_config(), Arc::clone(&service));
    let port = network.start().await?;
    info!(port, "health server bound");

    let mut http_shutdown = service.shutdown_controller().shutdown_receiver();
    let server = tokio::spawn(network.serve(async move {
        let _ = http_shutdown.wait_for(|stopping| *stopping).await;
    }));

    service.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("listen for shutdown signal")?;
    info!("shutdown signal received");

    let stopped = service.stop().await;
    server.await.context("health server task")??;
    stopped
}
