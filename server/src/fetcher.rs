//! Remote quote fetching.

use async_trait::async_trait;
use tracing::debug;

use cotacao_common::{Deadline, Quote, RawQuoteEnvelope, StageError};

/// Trait for quote fetchers.
///
/// Implementations issue exactly one fetch attempt per invocation; a
/// retrying decorator could wrap the trait without modifying it.
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    /// Fetch one quote, bounded by the given deadline.
    async fn fetch(&self, deadline: Deadline) -> Result<Quote, StageError>;
}

/// Fetches quotes from a remote HTTP source with the single-key envelope
/// wire format.
pub struct HttpQuoteFetcher {
    client: reqwest::Client,
    url: String,
    pair: String,
}

impl HttpQuoteFetcher {
    /// Create a fetcher against the given source URL and envelope pair key.
    pub fn new(client: reqwest::Client, url: impl Into<String>, pair: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            pair: pair.into(),
        }
    }
}

#[async_trait]
impl QuoteFetcher for HttpQuoteFetcher {
    async fn fetch(&self, deadline: Deadline) -> Result<Quote, StageError> {
        // An already-expired deadline short-circuits without attempting the
        // request.
        if deadline.is_expired() {
            return Err(StageError::TimedOut);
        }

        let mut request = self.client.get(&self.url);
        if let Some(remaining) = deadline.remaining() {
            // Applies from connect until the body is fully received.
            request = request.timeout(remaining);
        }

        debug!(url = %self.url, "Fetching quote");

        let response = request.send().await.map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StageError::Transport(format!(
                "upstream returned HTTP {status}"
            )));
        }

        let body = response.text().await.map_err(classify_transport)?;

        let envelope: RawQuoteEnvelope =
            serde_json::from_str(&body).map_err(|e| StageError::Decode(e.to_string()))?;

        envelope
            .into_quote(&self.pair)
            .ok_or_else(|| StageError::Decode(format!("pair {} missing from envelope", self.pair)))
    }
}

fn classify_transport(err: reqwest::Error) -> StageError {
    if err.is_timeout() {
        StageError::TimedOut
    } else {
        StageError::Transport(err.to_string())
    }
}

/// Scripted fetcher for tests: optional delay, then a fixed outcome.
#[cfg(test)]
pub(crate) struct ScriptedFetcher {
    delay: std::time::Duration,
    outcome: Result<Quote, StageError>,
    unique_bids: bool,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl ScriptedFetcher {
    pub(crate) fn ok(quote: Quote) -> Self {
        Self {
            delay: std::time::Duration::ZERO,
            outcome: Ok(quote),
            unique_bids: false,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(err: StageError) -> Self {
        Self {
            delay: std::time::Duration::ZERO,
            outcome: Err(err),
            unique_bids: false,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Reply after the given delay (still honoring the deadline check on entry).
    pub(crate) fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Stamp each fetched quote with a bid unique to the call, for
    /// cross-contamination checks.
    pub(crate) fn with_unique_bids(mut self) -> Self {
        self.unique_bids = true;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl QuoteFetcher for ScriptedFetcher {
    async fn fetch(&self, deadline: Deadline) -> Result<Quote, StageError> {
        if deadline.is_expired() {
            return Err(StageError::TimedOut);
        }

        let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let mut outcome = self.outcome.clone();
        if self.unique_bids {
            if let Ok(quote) = &mut outcome {
                quote.bid = format!("5.{call:04}");
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const USDBRL_BODY: &str = r#"{
        "USDBRL": {
            "code": "USD",
            "codein": "BRL",
            "name": "Dólar Americano/Real Brasileiro",
            "high": "5.45",
            "low": "5.38",
            "varBid": "0.02",
            "pctChange": "0.37",
            "bid": "5.43",
            "ask": "5.44",
            "timestamp": "1717782000",
            "create_date": "2024-06-07 14:00:00"
        }
    }"#;

    /// Spawn a local quote source that replies with `body` after `delay`,
    /// counting the requests it receives.
    async fn spawn_source(body: &'static str, delay: Duration) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();

        let app = axum::Router::new().route(
            "/",
            axum::routing::get(move || {
                let hits = hits_clone.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    body
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/"), hits)
    }

    fn fetcher(url: String) -> HttpQuoteFetcher {
        HttpQuoteFetcher::new(reqwest::Client::new(), url, "USDBRL")
    }

    #[tokio::test]
    async fn test_fetch_within_budget_decodes_quote() {
        let (url, _) = spawn_source(USDBRL_BODY, Duration::ZERO).await;

        let quote = fetcher(url)
            .fetch(Deadline::after(Duration::from_secs(2)))
            .await
            .unwrap();

        assert_eq!(quote.bid, "5.43");
        assert_eq!(quote.code, "USD");
        assert_eq!(quote.codein, "BRL");
    }

    #[tokio::test]
    async fn test_slow_source_classifies_timed_out() {
        let (url, _) = spawn_source(USDBRL_BODY, Duration::from_millis(500)).await;

        let started = Instant::now();
        let err = fetcher(url)
            .fetch(Deadline::after(Duration::from_millis(50)))
            .await
            .unwrap_err();

        assert!(matches!(err, StageError::TimedOut));
        // Returns within the budget plus bounded slack, never the source delay.
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_expired_deadline_attempts_no_request() {
        let (url, hits) = spawn_source(USDBRL_BODY, Duration::ZERO).await;

        let expired = Deadline::at(Instant::now() - Duration::from_millis(1));
        let err = fetcher(url).fetch(expired).await.unwrap_err();

        assert!(matches!(err, StageError::TimedOut));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_body_classifies_decode() {
        let (url, _) = spawn_source("not a quote", Duration::ZERO).await;

        let err = fetcher(url)
            .fetch(Deadline::after(Duration::from_secs(2)))
            .await
            .unwrap_err();

        assert!(matches!(err, StageError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_pair_key_classifies_decode() {
        let (url, _) = spawn_source(USDBRL_BODY, Duration::ZERO).await;

        let fetcher = HttpQuoteFetcher::new(reqwest::Client::new(), url, "EURBRL");
        let err = fetcher
            .fetch(Deadline::after(Duration::from_secs(2)))
            .await
            .unwrap_err();

        assert!(matches!(err, StageError::Decode(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_classifies_transport() {
        // Bind then drop to find a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher(format!("http://{addr}/"))
            .fetch(Deadline::after(Duration::from_secs(2)))
            .await
            .unwrap_err();

        assert!(matches!(err, StageError::Transport(_)));
    }

    #[tokio::test]
    async fn test_upstream_error_status_classifies_transport() {
        let app = axum::Router::new().route(
            "/",
            axum::routing::get(|| async {
                (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom")
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let err = fetcher(format!("http://{addr}/"))
            .fetch(Deadline::after(Duration::from_secs(2)))
            .await
            .unwrap_err();

        assert!(matches!(err, StageError::Transport(_)));
    }
}
