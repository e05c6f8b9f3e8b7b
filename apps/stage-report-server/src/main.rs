use anyhow::{Context, Result};
use clap::Parser;
use stage_report_server::config::ReportConfig;
use stage_report_server::services::report::ReportService;
use stage_report_server::store::{DocumentStore, MemoryDocumentStore, PgDocumentStore, StoreBackend};
use stage_report_server::{cli, db, routes, state};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn bind_listener(addr: &str) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Failed to bind stage-report-server listener on {addr}: port already in use. Stop the other service using this port or re-run with --port to choose another port.",
            );
        }
        Err(err) => Err(err)
            .with_context(|| format!("failed to bind stage-report-server listener on {addr}")),
    }
}

fn build_store(config: &ReportConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("CORE_DATABASE_URL must be set for the postgres store")?;
            let pool = db::connect_lazy(database_url)?;
            Ok(Arc::new(PgDocumentStore::new(pool, config.store_schema.clone())))
        }
        StoreBackend::Memory => match config.fixture_path.as_deref() {
            Some(path) => Ok(Arc::new(MemoryDocumentStore::from_fixture_path(path)?)),
            None => {
                tracing::warn!("no fixture configured for the memory store; serving empty reports");
                Ok(Arc::new(MemoryDocumentStore::new()))
            }
        },
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {err}");
        return;
    }
    tracing::info!("shutdown requested; cancelling in-flight scans");
    cancel.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ReportConfig::from_env(args.fixture.clone())?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config.summary())?);
        return Ok(());
    }

    let store = build_store(&config)?;
    let groups = config.stage_group_table()?;
    let cancel = CancellationToken::new();
    let reports = ReportService::new(
        store,
        Arc::new(groups),
        config.report_settings()?,
        cancel.clone(),
    );
    tracing::info!(
        backend = config.store_backend.as_str(),
        shape = config.report_shape.as_str(),
        utc_offset_minutes = config.utc_offset_minutes,
        scan_timeout_secs = config.scan_timeout_seconds,
        "stage report service ready"
    );

    let state = state::AppState {
        reports: Arc::new(reports),
    };

    let app = routes::router(state);
    let addr = format!("{}:{}", args.host, args.port);
    let listener = bind_listener(&addr).await?;
    tracing::info!(addr = %addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;
    cancel.cancel();
    Ok(())
}
