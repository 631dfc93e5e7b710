//! Per-request pipeline: fetch, then optionally persist, under nested
//! deadlines.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use cotacao_common::{Deadline, PipelineError, PipelineResult, Quote, Stage, StageError};

use crate::config::StageBudgets;
use crate::fetcher::QuoteFetcher;
use crate::persister::QuotePersister;

/// Outcome of the optional persist stage.
#[derive(Debug)]
pub enum PersistStatus {
    /// No persister configured (fetch-only mode).
    Disabled,
    /// The quote was durably stored.
    Stored,
    /// The write failed; the fetched quote is still usable.
    Failed(StageError),
}

impl PersistStatus {
    /// Whether a configured persist attempt failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, PersistStatus::Failed(_))
    }
}

/// Result of one pipeline run: the fetched quote plus the persist outcome
/// and per-stage wall times.
///
/// A persist failure does not discard the quote; the caller decides whether
/// a fetched-but-unpersisted quote is usable.
#[derive(Debug)]
pub struct PipelineReport {
    /// The fetched quote.
    pub quote: Quote,
    /// Persist stage outcome.
    pub persistence: PersistStatus,
    /// Wall time of the fetch stage.
    pub fetch_elapsed: Duration,
    /// Wall time of the persist stage, when attempted.
    pub persist_elapsed: Option<Duration>,
}

/// Sequences the fetch and persist stages for one request.
///
/// Collaborator handles are injected once at startup and shared by
/// reference across concurrent requests; the pipeline itself holds no
/// per-request state and no locks.
pub struct QuotePipeline {
    fetcher: Arc<dyn QuoteFetcher>,
    persister: Option<Arc<dyn QuotePersister>>,
    budgets: StageBudgets,
}

impl QuotePipeline {
    /// Create a pipeline. A `None` persister selects fetch-only mode.
    pub fn new(
        fetcher: Arc<dyn QuoteFetcher>,
        persister: Option<Arc<dyn QuotePersister>>,
        budgets: StageBudgets,
    ) -> Self {
        Self {
            fetcher,
            persister,
            budgets,
        }
    }

    /// Run the pipeline under the inbound deadline.
    ///
    /// Any fetch failure terminates the run with its classification surfaced
    /// unchanged. The persist deadline is derived from the original inbound
    /// deadline, not from the time left after the fetch: persistence gets a
    /// fixed small slice regardless of how fast or slow the fetch was.
    #[instrument(skip(self, inbound))]
    pub async fn run(&self, inbound: Deadline) -> PipelineResult<PipelineReport> {
        let fetch_deadline = inbound.derive(self.budgets.fetch);

        let fetch_started = Instant::now();
        let quote = self
            .fetcher
            .fetch(fetch_deadline)
            .await
            .map_err(|source| PipelineError::new(Stage::Fetch, source))?;
        let fetch_elapsed = fetch_started.elapsed();

        info!(
            stage = %Stage::Fetch,
            pair = %quote.pair(),
            bid = %quote.bid,
            elapsed_ms = fetch_elapsed.as_millis() as u64,
            "Quote fetched"
        );

        let (persistence, persist_elapsed) = match &self.persister {
            None => (PersistStatus::Disabled, None),
            Some(persister) => {
                let persist_deadline = inbound.derive(self.budgets.persist);

                let persist_started = Instant::now();
                let status = match persister.persist(&quote, persist_deadline).await {
                    Ok(()) => PersistStatus::Stored,
                    Err(source) => {
                        warn!(
                            stage = %Stage::Persist,
                            code = source.code(),
                            error = %source,
                            "Quote fetched but not persisted"
                        );
                        PersistStatus::Failed(source)
                    }
                };
                let persist_elapsed = persist_started.elapsed();

                info!(
                    stage = %Stage::Persist,
                    failed = status.is_failed(),
                    elapsed_ms = persist_elapsed.as_millis() as u64,
                    "Persist stage finished"
                );

                (status, Some(persist_elapsed))
            }
        };

        Ok(PipelineReport {
            quote,
            persistence,
            fetch_elapsed,
            persist_elapsed,
        })
    }
}
