//! Cotacao Quote Server Binary
//!
//! Serves `GET /cotacao` by fetching a quote from the remote source and
//! optionally persisting it, each stage under its own deadline.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cotacao_server::config::ServerConfig;
use cotacao_server::fetcher::HttpQuoteFetcher;
use cotacao_server::http::{self, AppState};
use cotacao_server::persister::{QuotePersister, SqliteQuotePersister};
use cotacao_server::pipeline::QuotePipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting cotacao quote server");

    // Load configuration
    let config = ServerConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    // Collaborator handles, created once and injected into the pipeline.
    let client = reqwest::Client::new();
    let fetcher = Arc::new(HttpQuoteFetcher::new(
        client,
        config.quote_url.clone(),
        config.pair.clone(),
    ));

    let persister: Option<Arc<dyn QuotePersister>> = match &config.database_url {
        Some(url) => {
            let persister = SqliteQuotePersister::connect(url).await?;
            info!("Persistence enabled");
            Some(Arc::new(persister))
        }
        None => {
            info!("Persistence disabled, running fetch-only");
            None
        }
    };

    let pipeline = QuotePipeline::new(fetcher, persister, config.budgets.clone());

    let state = Arc::new(AppState {
        pipeline,
        response_format: config.response_format,
        request_timeout: config.request_timeout,
    });

    let addr = format!("{}:{}", config.listen_addr, config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        listen_addr = %addr,
        quote_url = %config.quote_url,
        pair = %config.pair,
        fetch_budget_ms = config.budgets.fetch.as_millis() as u64,
        persist_budget_ms = config.budgets.persist.as_millis() as u64,
        "Quote server listening"
    );

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Quote server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
