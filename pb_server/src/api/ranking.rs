//! Ranking API handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use padel_bracket::bracket::{Category, MemberId};
use padel_bracket::ranking::{MemberStanding, PointsHistoryEntry, RankingEntry};
use serde::Deserialize;

use super::{ApiError, AppState, bad_request, error_response};

/// Default page size of a points history query
const DEFAULT_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub limit: Option<i64>,
    /// Category label such as `4ta`; the global table when absent
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// Ranking table, best first
pub async fn get_ranking(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<Vec<RankingEntry>>, ApiError> {
    let category = query
        .category
        .as_deref()
        .map(|label| {
            label
                .parse::<Category>()
                .map_err(|_| bad_request(format!("Unknown category: {label}")))
        })
        .transpose()?;

    state
        .ranking_manager
        .ranking(query.limit.unwrap_or(state.ranking_default_limit), category)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Cumulative standing of a member
pub async fn get_member(
    State(state): State<AppState>,
    Path(member_id): Path<MemberId>,
) -> Result<Json<MemberStanding>, ApiError> {
    state
        .ranking_manager
        .member_standing(member_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Points history of a member, newest first
pub async fn get_points_history(
    State(state): State<AppState>,
    Path(member_id): Path<MemberId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PointsHistoryEntry>>, ApiError> {
    state
        .ranking_manager
        .points_history(member_id, query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await
        .map(Json)
        .map_err(error_response)
}
