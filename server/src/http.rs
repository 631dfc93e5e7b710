//! Inbound HTTP endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::error;

use cotacao_common::{Deadline, PipelineError, StageError};

use crate::config::ResponseFormat;
use crate::pipeline::QuotePipeline;

/// Collaborator handles shared by all requests, injected once at startup.
pub struct AppState {
    /// The per-request pipeline.
    pub pipeline: QuotePipeline,
    /// Response body shape.
    pub response_format: ResponseFormat,
    /// Overall deadline per inbound request; `None` is unbounded.
    pub request_timeout: Option<Duration>,
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/cotacao", get(get_cotacao))
        .with_state(state)
}

async fn get_cotacao(State(state): State<Arc<AppState>>) -> Response {
    let inbound = match state.request_timeout {
        Some(timeout) => Deadline::after(timeout),
        None => Deadline::unbounded(),
    };

    match state.pipeline.run(inbound).await {
        // Persist failure is partial success: the quote was obtained, the
        // pipeline has already logged the failure distinctly, and the
        // response stays a 200.
        Ok(report) => match state.response_format {
            ResponseFormat::BidText => report.quote.bid.into_response(),
            ResponseFormat::QuoteJson => Json(report.quote).into_response(),
        },
        Err(err) => {
            error!(
                stage = %err.stage,
                code = err.source.code(),
                error = %err,
                "Request failed"
            );
            error_status(&err).into_response()
        }
    }
}

fn error_status(err: &PipelineError) -> StatusCode {
    match err.source {
        StageError::TimedOut => StatusCode::GATEWAY_TIMEOUT,
        StageError::Transport(_) | StageError::Decode(_) => StatusCode::BAD_GATEWAY,
        StageError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
