//! Bracket API handlers.
//!
//! # Examples
//!
//! Generate the bracket of tournament 4:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/4/generate-bracket
//! ```
//!
//! Record a result:
//! ```bash
//! curl -X PUT http://localhost:8080/api/v1/matches/17/result \
//!   -H "Content-Type: application/json" \
//!   -d '{"sets": [{"slot1": 6, "slot2": 4}, {"slot1": 7, "slot2": 5}], "winner_id": 9}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
};
use padel_bracket::bracket::{
    BracketView, CompletionSummary, EntrantId, GeneratedBracket, MatchId, RecordedResult,
    SetScore, TournamentId,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState, error_response, request_id::RequestId};
use crate::{logging, metrics};

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResultRequest {
    pub sets: Vec<SetScore>,
    pub winner_id: EntrantId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub tournament_id: TournamentId,
    /// This call finished the tournament and allocated its points
    pub finished: bool,
    pub summary: Option<CompletionSummary>,
}

/// Generate the bracket of an open tournament
///
/// # Errors
///
/// - `404 Not Found`: Unknown tournament
/// - `409 Conflict`: Tournament is not open, or results are already recorded
/// - `400 Bad Request`: Fewer than 2 or more than 32 entrants
pub async fn generate_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<GeneratedBracket>, ApiError> {
    let generated = state
        .bracket_manager
        .generate_bracket(tournament_id)
        .await
        .map_err(error_response)?;

    metrics::brackets_generated(generated.bracket_size, generated.byes_resolved);
    logging::log_bracket_event(
        "bracket_generated",
        tournament_id,
        &format!(
            "{} matches from {}, {} BYEs resolved",
            generated.match_count, generated.starting_round, generated.byes_resolved
        ),
    );

    Ok(Json(generated))
}

/// List the matches of a tournament grouped by round
pub async fn get_matches(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<BracketView>, ApiError> {
    state
        .bracket_manager
        .get_matches(tournament_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Record the result of a match
///
/// # Errors
///
/// - `404 Not Found`: Unknown match
/// - `400 Bad Request`: Winner not in the match, wrong set count, or match not playable
/// - `409 Conflict`: Concurrent submission, tournament not in progress, or
///   the successor match was already played
pub async fn record_result(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    request_id: RequestId,
    Json(request): Json<RecordResultRequest>,
) -> Result<Json<RecordedResult>, ApiError> {
    tracing::debug!(
        request_id = %request_id.as_str(),
        match_id = match_id,
        winner_id = request.winner_id,
        sets = request.sets.len(),
        "Recording match result"
    );

    let recorded = state
        .bracket_manager
        .record_result(match_id, request.sets, request.winner_id)
        .await
        .map_err(error_response)?;

    metrics::results_recorded(recorded.tournament_finished);

    Ok(Json(recorded))
}

/// Replay advancement and the completion check of a tournament
pub async fn reconcile_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let summary = state
        .bracket_manager
        .reconcile_tournament(tournament_id)
        .await
        .map_err(error_response)?;

    if summary.is_some() {
        metrics::tournaments_finished();
        logging::log_bracket_event(
            "tournament_reconciled",
            tournament_id,
            "finished by reconciliation",
        );
    }

    Ok(Json(ReconcileResponse {
        tournament_id,
        finished: summary.is_some(),
        summary,
    }))
}
