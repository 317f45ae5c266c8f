//! keyviz server
//!
//! Samples region statistics from PD on a fixed interval, keeps a bounded
//! history in memory and serves keyspace heatmaps over HTTP.
//!
//! Run with: cargo run --bin keyviz -- --pd http://127.0.0.1:2379
//!
//! Settings are read from the config file, then `KEYVIZ_*` environment
//! variables, then command-line flags.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keyviz::api::{serve, window::parse_offset, AppState};
use keyviz::catalog::TableCatalog;
use keyviz::collector::{Collector, PdClient, SchemaRefresher, TidbSchemaClient};
use keyviz::config::{Config, LoggingConfig};
use keyviz::history::SnapshotHistory;
use keyviz::keyspace::HeatmapBuilder;

#[derive(Parser)]
#[command(name = "keyviz")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Key visualizer: keyspace read/write heatmaps from region statistics")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, host:port
    #[arg(long)]
    addr: Option<String>,

    /// PD URL
    #[arg(long)]
    pd: Option<String>,

    /// TiDB status URL
    #[arg(long)]
    tidb: Option<String>,

    /// Maximum key buckets per heatmap
    #[arg(short = 'N', long)]
    max_buckets: Option<usize>,

    /// Sampling interval, e.g. 60, 30s or 1m
    #[arg(short = 'I', long, value_parser = parse_interval)]
    interval: Option<Duration>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    apply_args(&mut config, &args)?;
    config.validate()?;

    init_tracing(&config.logging);

    tracing::info!("Starting keyviz v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        pd = %config.pd.url,
        interval_secs = config.collector.interval_secs,
        history_capacity = config.collector.history_capacity,
        max_buckets = config.heatmap.max_buckets,
        "Configuration loaded"
    );

    let history = Arc::new(SnapshotHistory::new(
        config.collector.history_capacity,
        config.interval(),
    ));
    let catalog = Arc::new(TableCatalog::new());

    let pd = PdClient::new(config.pd_config()).context("failed to build PD client")?;
    let collector = Arc::new(Collector::new(
        Arc::new(pd),
        Arc::clone(&history),
        config.interval(),
    ));
    let collector_handle = Arc::clone(&collector).start();

    let refresher = if config.tidb.enabled {
        tracing::info!(tidb = %config.tidb.url, "Table catalog enabled");
        let tidb =
            TidbSchemaClient::new(config.tidb_config()).context("failed to build TiDB client")?;
        let refresher = Arc::new(SchemaRefresher::new(
            Arc::new(tidb),
            Arc::clone(&catalog),
            Duration::from_secs(config.tidb.refresh_interval_secs),
        ));
        let handle = Arc::clone(&refresher).start();
        Some((refresher, handle))
    } else {
        tracing::info!("Table catalog disabled, serving keyspace heatmaps only");
        None
    };

    let api_config = config.api_config();
    let mut state = AppState::new(
        history,
        catalog,
        HeatmapBuilder::new(config.heatmap.max_buckets),
        api_config.clone(),
    )
    .with_collector(Arc::clone(&collector));
    if let Some((refresher, _)) = &refresher {
        state = state.with_schema(Arc::clone(refresher));
    }

    serve(state, &api_config).await?;

    tracing::info!("Stopping background loops...");
    collector.stop().await;
    collector_handle.abort();
    if let Some((refresher, handle)) = refresher {
        refresher.stop().await;
        handle.abort();
    }

    tracing::info!("keyviz stopped");
    Ok(())
}

/// Command-line flags win over file and environment settings
fn apply_args(config: &mut Config, args: &Args) -> anyhow::Result<()> {
    if let Some(addr) = &args.addr {
        let (host, port) = addr
            .rsplit_once(':')
            .with_context(|| format!("invalid listen address {addr:?}, expected host:port"))?;
        config.server.host = host.to_string();
        config.server.port = port
            .parse()
            .with_context(|| format!("invalid port in listen address {addr:?}"))?;
    }
    if let Some(pd) = &args.pd {
        config.pd.url = pd.clone();
    }
    if let Some(tidb) = &args.tidb {
        config.tidb.url = tidb.clone();
    }
    if let Some(max_buckets) = args.max_buckets {
        config.heatmap.max_buckets = max_buckets;
    }
    if let Some(interval) = args.interval {
        config.collector.interval_secs = interval.as_secs();
    }
    Ok(())
}

/// Accepts bare seconds or a duration such as `30s` or `1m30s`
fn parse_interval(s: &str) -> Result<Duration, String> {
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    let offset = parse_offset(s)?;
    offset
        .to_std()
        .map_err(|_| format!("interval must not be negative: {s}"))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("keyviz={},tower_http=info", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
