//! HTTP API for the padel bracket server.
//!
//! This module exposes bracket generation, result recording and the ranking
//! read model as a JSON REST API.
//!
//! # Modules
//!
//! - [`brackets`]: Bracket generation, match listing, result recording, reconciliation
//! - [`ranking`]: Ranking table, member standings and points history
//! - [`request_id`]: Request correlation middleware
//!
//! # Errors
//!
//! Failed operations answer with `{"error": "<message>"}`. Storage failures
//! are reported as a generic message; the details only go to the log.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use pb_server::api::{create_router, AppState};
//! use padel_bracket::{BracketManager, RankingManager};
//! use padel_bracket::db::InMemoryBracketRepository;
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = Arc::new(InMemoryBracketRepository::new());
//!
//! let state = AppState {
//!     bracket_manager: Arc::new(BracketManager::new(repo.clone())),
//!     ranking_manager: Arc::new(RankingManager::new(repo)),
//!     ranking_default_limit: 50,
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod brackets;
pub mod ranking;
pub mod request_id;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post, put},
};
use padel_bracket::{BracketError, BracketManager, RankingManager};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::metrics;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; the managers sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub bracket_manager: Arc<BracketManager>,
    pub ranking_manager: Arc<RankingManager>,
    /// Page size used when a ranking query has no `limit`
    pub ranking_default_limit: i64,
}

/// Error body of every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Rejection type shared by the handlers
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a bracket error to its HTTP status and client-safe body
pub fn error_response(err: BracketError) -> ApiError {
    let status = status_for(&err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "Bracket operation failed");
    } else {
        tracing::debug!(error = %err, status = %status, "Bracket operation rejected");
    }
    metrics::bracket_errors_total(error_kind(&err));

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

/// Reject a request before it reaches the engine
pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn status_for(err: &BracketError) -> StatusCode {
    match err {
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        BracketError::InvalidState { .. }
        | BracketError::ResultsAlreadyRecorded(_)
        | BracketError::SuccessorDecided(_)
        | BracketError::Conflict(_) => StatusCode::CONFLICT,
        BracketError::InsufficientEntrants { .. }
        | BracketError::UnsupportedSize { .. }
        | BracketError::InvalidWinner { .. }
        | BracketError::InvalidSets(_)
        | BracketError::MatchNotPlayable(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_kind(err: &BracketError) -> &'static str {
    match err {
        BracketError::TournamentNotFound(_) => "tournament_not_found",
        BracketError::MatchNotFound(_) => "match_not_found",
        BracketError::MemberNotFound(_) => "member_not_found",
        BracketError::InvalidState { .. } => "invalid_state",
        BracketError::ResultsAlreadyRecorded(_) => "results_already_recorded",
        BracketError::InsufficientEntrants { .. } => "insufficient_entrants",
        BracketError::UnsupportedSize { .. } => "unsupported_size",
        BracketError::InvalidWinner { .. } => "invalid_winner",
        BracketError::InvalidSets(_) => "invalid_sets",
        BracketError::MatchNotPlayable(_) => "match_not_playable",
        BracketError::SuccessorDecided(_) => "successor_decided",
        BracketError::Conflict(_) => "conflict",
        BracketError::UnknownValue { .. } => "unknown_value",
        BracketError::Database(_) => "database",
        BracketError::Serialization(_) => "serialization",
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET  /health                                    - Liveness check
/// POST /api/v1/tournaments/{id}/generate-bracket  - Generate the bracket
/// GET  /api/v1/tournaments/{id}/matches           - Matches grouped by round
/// POST /api/v1/tournaments/{id}/reconcile         - Replay advancement and completion
/// PUT  /api/v1/matches/{id}/result                - Record a match result
/// GET  /api/v1/ranking?limit=&category=           - Ranking table
/// GET  /api/v1/members/{id}                       - Member standing
/// GET  /api/v1/members/{id}/points-history?limit= - Points history, newest first
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/tournaments/{tournament_id}/generate-bracket",
            post(brackets::generate_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/matches",
            get(brackets::get_matches),
        )
        .route(
            "/tournaments/{tournament_id}/reconcile",
            post(brackets::reconcile_tournament),
        )
        .route("/matches/{match_id}/result", put(brackets::record_result))
        .route("/ranking", get(ranking::get_ranking))
        .route("/members/{member_id}", get(ranking::get_member))
        .route(
            "/members/{member_id}/points-history",
            get(ranking::get_points_history),
        )
}

/// Health check endpoint for monitoring and load balancers.
async fn health_check() -> &'static str {
    "OK"
}
