//! Integration tests for the HTTP API.
//!
//! Drives the router with `oneshot` over the in-memory store, so no
//! database is needed.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use padel_bracket::bracket::{
    BracketView, Category, EntrantId, GeneratedBracket, Match, MemberId, RecordedResult, Round,
    TournamentId, TournamentStatus,
};
use padel_bracket::db::{BracketRepository, InMemoryBracketRepository};
use padel_bracket::ranking::{MemberStanding, PointsHistoryEntry, RankingEntry};
use padel_bracket::{BracketManager, RankingManager};
use pb_server::api::brackets::ReconcileResponse;
use pb_server::api::{AppState, ErrorResponse, create_router};
use pb_server::api::request_id::REQUEST_ID_HEADER;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

struct TestServer {
    app: axum::Router,
    repo: Arc<InMemoryBracketRepository>,
    tournament_id: TournamentId,
    /// Member behind each single-player entrant
    members: HashMap<EntrantId, MemberId>,
}

/// Create a test server with one open tournament of `count` single entrants
fn create_test_server(count: usize) -> TestServer {
    let repo = Arc::new(InMemoryBracketRepository::new());
    let tournament_id = repo.add_tournament("Copa Invierno", Category::Third);

    let members = (0..count)
        .map(|i| {
            let member = repo.add_member(&format!("Player {i}"));
            let entrant = repo.add_entrant(tournament_id, &format!("Player {i}"), &[member]);
            (entrant, member)
        })
        .collect();

    let state = AppState {
        bracket_manager: Arc::new(BracketManager::with_seed(repo.clone(), 7)),
        ranking_manager: Arc::new(RankingManager::new(repo.clone())),
        ranking_default_limit: 50,
    };

    TestServer {
        app: create_router(state),
        repo,
        tournament_id,
        members,
    }
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn post(app: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn put_json(app: &axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap()
}

fn lower_id(m: &Match) -> EntrantId {
    let a = m.slot1.entrant().unwrap().entrant_id;
    let b = m.slot2.entrant().unwrap().entrant_id;
    a.min(b)
}

fn result_body(winner_id: EntrantId) -> serde_json::Value {
    json!({
        "sets": [{"slot1": 6, "slot2": 3}, {"slot1": 6, "slot2": 4}],
        "winner_id": winner_id,
    })
}

impl TestServer {
    async fn generate(&self) -> (StatusCode, Vec<u8>) {
        post(
            &self.app,
            &format!("/api/v1/tournaments/{}/generate-bracket", self.tournament_id),
        )
        .await
    }

    async fn view(&self) -> BracketView {
        let (status, body) = get(
            &self.app,
            &format!("/api/v1/tournaments/{}/matches", self.tournament_id),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        parse(&body)
    }

    async fn next_playable(&self) -> Option<Match> {
        self.view()
            .await
            .rounds
            .values()
            .flatten()
            .find(|m| m.is_playable() && !m.is_completed())
            .cloned()
    }
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(2);
    let response = server
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server(2);
    let response = server
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/ranking")
                .header(REQUEST_ID_HEADER, "trace-abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(REQUEST_ID_HEADER).unwrap(),
        "trace-abc-123"
    );
}

#[tokio::test]
async fn test_generate_bracket_with_bye() {
    let server = create_test_server(3);

    let (status, body) = server.generate().await;
    assert_eq!(status, StatusCode::OK);

    let generated: GeneratedBracket = parse(&body);
    assert_eq!(generated.bracket_size, 4);
    assert_eq!(generated.starting_round, Round::Semifinals);
    assert_eq!(generated.match_count, 3);
    assert_eq!(generated.byes_resolved, 1);
    assert!(generated.unplaced.is_empty());

    let view = server.view().await;
    assert_eq!(view.rounds.len(), 4);
    assert!(view.round(Round::RoundOf16).is_empty());
    assert!(view.round(Round::Quarterfinals).is_empty());
    assert_eq!(view.round(Round::Semifinals).len(), 2);

    // The BYE winner already waits in the final
    let final_match = &view.round(Round::Final)[0];
    assert!(final_match.slot1.entrant().is_some() || final_match.slot2.entrant().is_some());
}

#[tokio::test]
async fn test_generate_twice_conflicts() {
    let server = create_test_server(4);
    assert_eq!(server.generate().await.0, StatusCode::OK);

    let (status, body) = server.generate().await;
    assert_eq!(status, StatusCode::CONFLICT);
    let error: ErrorResponse = parse(&body);
    assert!(error.error.contains("expected open"));
}

#[tokio::test]
async fn test_generate_unknown_tournament() {
    let server = create_test_server(2);
    let (status, body) = post(&server.app, "/api/v1/tournaments/9999/generate-bracket").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.error, "Tournament not found: 9999");
}

#[tokio::test]
async fn test_generate_with_single_entrant() {
    let server = create_test_server(1);
    let (status, body) = server.generate().await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = parse(&body);
    assert!(error.error.contains("need 2, have 1"));

    // Nothing was stored
    let view = server.view().await;
    assert_eq!(view.match_count(), 0);
}

#[tokio::test]
async fn test_record_result_validation() {
    let server = create_test_server(4);
    server.generate().await;

    let m = server.next_playable().await.unwrap();
    let uri = format!("/api/v1/matches/{}/result", m.id);

    // Winner not in the match
    let (status, _) = put_json(&server.app, &uri, result_body(424_242)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // One set only
    let body = json!({"sets": [{"slot1": 6, "slot2": 0}], "winner_id": lower_id(&m)});
    let (status, body) = put_json(&server.app, &uri, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = parse(&body);
    assert!(error.error.contains("2 or 3 sets"));

    // The match is untouched
    let view = server.view().await;
    let stored = view.find(m.round, m.match_number).unwrap();
    assert!(!stored.is_completed());
    assert!(stored.sets.is_empty());
    assert_eq!(stored.version, m.version);
}

#[tokio::test]
async fn test_record_result_unknown_match() {
    let server = create_test_server(2);
    let (status, _) = put_json(&server.app, "/api/v1/matches/31337/result", result_body(1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_final_not_playable_before_semifinals() {
    let server = create_test_server(3);
    server.generate().await;

    let view = server.view().await;
    let final_match = &view.round(Round::Final)[0];
    let uri = format!("/api/v1/matches/{}/result", final_match.id);

    // The BYE winner is seated but the other semifinal is still open
    let seated = final_match
        .slot1
        .entrant()
        .or(final_match.slot2.entrant())
        .unwrap()
        .entrant_id;
    let (status, body) = put_json(&server.app, &uri, result_body(seated)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = parse(&body);
    assert!(error.error.contains("does not have two entrants"));

    // Someone outside the match is an invalid winner
    let (status, body) = put_json(&server.app, &uri, result_body(424_242)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = parse(&body);
    assert!(error.error.contains("is not playing in match"));
}

#[tokio::test]
async fn test_full_tournament_over_http() {
    let server = create_test_server(3);
    server.generate().await;

    let mut last: Option<RecordedResult> = None;
    while let Some(m) = server.next_playable().await {
        let (status, body) = put_json(
            &server.app,
            &format!("/api/v1/matches/{}/result", m.id),
            result_body(lower_id(&m)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        last = Some(parse(&body));
    }

    let last = last.unwrap();
    assert!(last.tournament_finished);
    let champion_member = server.members[&last.winner_id];

    // Ranking, best first
    let (status, body) = get(&server.app, "/api/v1/ranking").await;
    assert_eq!(status, StatusCode::OK);
    let ranking: Vec<RankingEntry> = parse(&body);
    let points: Vec<i64> = ranking.iter().map(|r| r.points).collect();
    assert_eq!(points, vec![1000, 600, 360]);
    assert_eq!(ranking[0].member_id, champion_member);
    assert_eq!(ranking[0].position, 1);

    // Category ranking uses the tournament category
    let (_, body) = get(&server.app, "/api/v1/ranking?category=3ra&limit=2").await;
    let ranking: Vec<RankingEntry> = parse(&body);
    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0].points, 1000);

    let (_, body) = get(&server.app, "/api/v1/ranking?category=7ma").await;
    let ranking: Vec<RankingEntry> = parse(&body);
    assert!(ranking.is_empty());

    // Member standing and history
    let (status, body) = get(&server.app, &format!("/api/v1/members/{champion_member}")).await;
    assert_eq!(status, StatusCode::OK);
    let standing: MemberStanding = parse(&body);
    assert_eq!(standing.total_points, 1000);
    assert_eq!(standing.points_by_category.get(Category::Third), 1000);
    assert_eq!(standing.tournaments_played, 1);

    let (status, body) = get(
        &server.app,
        &format!("/api/v1/members/{champion_member}/points-history"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history: Vec<PointsHistoryEntry> = parse(&body);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].tournament_id, server.tournament_id);
    assert_eq!(history[0].points, 1000);

    // Reconciling a finished tournament is a no-op
    let (status, body) = post(
        &server.app,
        &format!("/api/v1/tournaments/{}/reconcile", server.tournament_id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reconciled: ReconcileResponse = parse(&body);
    assert!(!reconciled.finished);
    assert!(reconciled.summary.is_none());

    // Finished tournaments take no further results
    let view = server.view().await;
    let final_match = &view.round(Round::Final)[0];
    let (status, _) = put_json(
        &server.app,
        &format!("/api/v1/matches/{}/result", final_match.id),
        result_body(final_match.winner_id.unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let tournament = server.repo.get_tournament(server.tournament_id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Finished);
}

#[tokio::test]
async fn test_ranking_rejects_unknown_category() {
    let server = create_test_server(2);
    let (status, body) = get(&server.app, "/api/v1/ranking?category=9na").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = parse(&body);
    assert_eq!(error.error, "Unknown category: 9na");
}

#[tokio::test]
async fn test_unknown_member() {
    let server = create_test_server(2);

    let (status, _) = get(&server.app, "/api/v1/members/777").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&server.app, "/api/v1/members/777/points-history").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
