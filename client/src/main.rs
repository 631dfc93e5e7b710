//! Cotacao Client
//!
//! Fetches the current bid from the quote server under one overall deadline
//! and writes `"<label>: <bid>"` to a local file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cotacao_common::Deadline;

/// Cotacao client CLI
#[derive(Parser, Debug)]
#[command(name = "cotacao-client")]
#[command(about = "Fetch the current quote bid and store it locally")]
struct Args {
    /// Quote server endpoint
    #[arg(long, default_value = "http://localhost:8080/cotacao")]
    url: String,

    /// Overall deadline in milliseconds for the whole run
    #[arg(long, default_value = "300")]
    timeout_ms: u64,

    /// File the bid is written to
    #[arg(short, long, default_value = "cotacao.txt")]
    output: PathBuf,

    /// Label prefixed to the stored bid
    #[arg(long, default_value = "Dólar")]
    label: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let deadline = Deadline::after(Duration::from_millis(args.timeout_ms));
    let client = reqwest::Client::new();

    let bid = fetch_bid(&client, &args.url, deadline).await?;
    info!(bid = %bid, "Quote received");

    let artifact = format_artifact(&args.label, &bid);
    let write = tokio::fs::write(&args.output, artifact);
    match deadline.remaining() {
        Some(remaining) => tokio::time::timeout(remaining, write)
            .await
            .context("deadline elapsed while writing the bid")?,
        None => write.await,
    }
    .with_context(|| format!("failed to write {}", args.output.display()))?;

    info!(path = %args.output.display(), "Bid written");
    Ok(())
}

/// One GET against the quote server, bounded by the deadline.
async fn fetch_bid(
    client: &reqwest::Client,
    url: &str,
    deadline: Deadline,
) -> anyhow::Result<String> {
    anyhow::ensure!(
        !deadline.is_expired(),
        "deadline elapsed before the request started"
    );

    let mut request = client.get(url);
    if let Some(remaining) = deadline.remaining() {
        request = request.timeout(remaining);
    }

    let response = request
        .send()
        .await
        .context("quote request failed")?
        .error_for_status()
        .context("quote server returned an error")?;

    response.text().await.context("failed to read the bid")
}

fn format_artifact(label: &str, bid: &str) -> String {
    format!("{label}: {bid}")
}
