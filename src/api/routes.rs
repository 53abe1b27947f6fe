use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::api::health::HealthReport;
use crate::api::latency::LatencySnapshot;
use crate::error::AppError;
use crate::service::{BetService, OddsReport};
use crate::state::history::UserSummary;
use crate::types::{BetRecord, BetSuggestionResult, BetSummary, BetType, PlacedLeg, RosterEntry};

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<BetService>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .route("/api/get_player_id/", get(get_player_id))
        .route("/api/async_get_team_data/", get(get_team_data))
        .route("/api/generate_bet_suggestions/", get(get_bet_suggestions))
        .route("/api/adjust_odds/", get(get_bet_suggestions))
        .route("/api/place_bet/", post(place_bet))
        .route("/api/user_history/", get(get_user_history))
        .route("/api/debug_user_history/", get(get_debug_user_history))
        .route("/api/debug_ml_calculations/", get(get_debug_calculations))
        .route("/api/bet_types/", get(get_bet_types))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerQuery {
    pub player_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionQuery {
    pub player_id: Option<String>,
    pub luck_level: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupQuery {
    pub player_name: Option<String>,
    pub team_name: Option<String>,
}

#[derive(Deserialize)]
pub struct DebugHistoryQuery {
    #[serde(default)]
    pub reload: bool,
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetRequest {
    /// The web client sends this as a string, older clients as a number.
    pub player_id: Option<serde_json::Value>,
    #[serde(default)]
    pub legs: Vec<PlacedLeg>,
    #[serde(default = "neutral_odds")]
    pub total_odds: f64,
    #[serde(default)]
    pub total_stake: f64,
    #[serde(default)]
    pub potential_win: f64,
    #[serde(default)]
    pub luck_level: i32,
    pub bet_id: Option<String>,
}

fn neutral_odds() -> f64 {
    1.0
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetReceipt {
    pub success: bool,
    pub bet_id: String,
    pub player_id: String,
    #[serde(serialize_with = "crate::types::iso_micros::serialize")]
    pub timestamp: NaiveDateTime,
    pub total_odds: f64,
    pub total_stake: f64,
    pub potential_win: f64,
    pub luck_level: i32,
    pub legs_count: usize,
    /// Bets on record for the user after this one.
    pub bet_count: usize,
    pub baseline_odds: f64,
}

#[derive(Serialize)]
pub struct PlayerIdResponse {
    pub player_id: u64,
}

#[derive(Serialize)]
pub struct UserHistoryResponse {
    pub player_id: String,
    pub bet_count: usize,
    pub baseline_odds: f64,
    pub history: Vec<BetRecord>,
}

#[derive(Serialize)]
pub struct DebugHistoryResponse {
    pub store: String,
    pub reloaded: bool,
    pub total_users: usize,
    pub users: Vec<UserSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetTypeResponse {
    pub bet_type: BetType,
    pub base_odds: f64,
}

// ---------------------------------------------------------------------------
// Param helpers
// ---------------------------------------------------------------------------

fn require_player_id(raw: Option<String>) -> Result<String, AppError> {
    match raw.map(|s| s.trim().to_string()) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(AppError::BadRequest("Player ID missing.".to_string())),
    }
}

/// Absent or blank means neutral.
fn parse_luck_level(raw: Option<&str>) -> Result<i32, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(s) => s
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid luckLevel: {s:?}"))),
    }
}

fn player_id_string(raw: Option<&serde_json::Value>) -> Option<String> {
    match raw? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn home() -> &'static str {
    "Welcome to the FPL API!"
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthReport> {
    Json(HealthReport::collect(&state.service))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.service.latency().snapshot())
}

async fn get_player_id(
    State(state): State<ApiState>,
    Query(params): Query<LookupQuery>,
) -> Result<Json<PlayerIdResponse>, AppError> {
    let (Some(player_name), Some(team_name)) = (params.player_name, params.team_name) else {
        return Err(AppError::BadRequest("Missing playerName or teamName".to_string()));
    };
    let player_id = state.service.lookup_player(&player_name, &team_name).await?;
    Ok(Json(PlayerIdResponse { player_id }))
}

async fn get_team_data(
    State(state): State<ApiState>,
    Query(params): Query<PlayerQuery>,
) -> Result<Json<Vec<RosterEntry>>, AppError> {
    let player_id = require_player_id(params.player_id)?;
    let roster = state.service.team_for(&player_id).await?;
    if roster.is_empty() {
        return Err(AppError::NotFound("Team data not found.".to_string()));
    }
    Ok(Json(roster))
}

async fn get_bet_suggestions(
    State(state): State<ApiState>,
    Query(params): Query<SuggestionQuery>,
) -> Result<Json<BetSuggestionResult>, AppError> {
    let player_id = require_player_id(params.player_id)?;
    let luck_level = parse_luck_level(params.luck_level.as_deref())?;
    let result = state.service.suggestions_for(&player_id, luck_level).await?;
    Ok(Json(result))
}

async fn place_bet(
    State(state): State<ApiState>,
    payload: Result<Json<PlaceBetRequest>, JsonRejection>,
) -> Result<Json<BetReceipt>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let player_id = require_player_id(player_id_string(req.player_id.as_ref()))?;
    let summary = BetSummary {
        bet_id: req.bet_id,
        legs: req.legs,
        total_odds: req.total_odds,
        total_stake: req.total_stake,
        potential_win: req.potential_win,
        luck_level: req.luck_level,
    };

    let record = state.service.record_bet(&player_id, summary).await;
    Ok(Json(BetReceipt {
        success: true,
        bet_id: record.bet_id,
        bet_count: state.service.history_tracker().bet_count(&player_id),
        baseline_odds: state.service.baseline_odds(&player_id),
        player_id,
        timestamp: record.timestamp,
        total_odds: record.total_odds,
        total_stake: record.stake,
        potential_win: record.potential_win,
        luck_level: record.luck_level,
        legs_count: record.legs_count,
    }))
}

async fn get_user_history(
    State(state): State<ApiState>,
    Query(params): Query<PlayerQuery>,
) -> Result<Json<UserHistoryResponse>, AppError> {
    let player_id = require_player_id(params.player_id)?;
    let history = state.service.history(&player_id);
    Ok(Json(UserHistoryResponse {
        bet_count: history.len(),
        baseline_odds: state.service.baseline_odds(&player_id),
        player_id,
        history,
    }))
}

async fn get_debug_user_history(
    State(state): State<ApiState>,
    Query(params): Query<DebugHistoryQuery>,
) -> Json<DebugHistoryResponse> {
    if params.reload {
        state.service.reload_history().await;
    }
    let users = state.service.history_summaries();
    Json(DebugHistoryResponse {
        store: state.service.history_tracker().store_label(),
        reloaded: params.reload,
        total_users: users.len(),
        users,
    })
}

async fn get_debug_calculations(
    State(state): State<ApiState>,
    Query(params): Query<SuggestionQuery>,
) -> Result<Json<OddsReport>, AppError> {
    let player_id = require_player_id(params.player_id)?;
    let luck_level = parse_luck_level(params.luck_level.as_deref())?;
    let report = state.service.odds_breakdown(&player_id, luck_level).await?;
    Ok(Json(report))
}

async fn get_bet_types() -> Json<Vec<BetTypeResponse>> {
    Json(
        BetType::ALL
            .iter()
            .map(|&bet_type| BetTypeResponse {
                bet_type,
                base_odds: bet_type.catalogue_odds(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::service_in;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app(dir: &std::path::Path) -> Router {
        router(ApiState {
            service: Arc::new(service_in(dir).await),
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(payload) => builder
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).to_string())
        });
        (status, body)
    }

    #[tokio::test]
    async fn home_is_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(&app(dir.path()).await, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("Welcome to the FPL API!"));
    }

    #[tokio::test]
    async fn suggestions_serialize_for_the_client() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let (status, body) = send(
            &app,
            Method::GET,
            "/api/generate_bet_suggestions/?playerId=1234&luckLevel=0",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let legs = body["bet_legs"].as_array().unwrap();
        assert_eq!(legs.len(), 4);
        assert_eq!(legs[0]["id"], "captain_3");
        assert_eq!(legs[0]["betType"], "Goal Scorer (Captain)");
        assert_eq!(legs[0]["confidence"], "High");
        assert_eq!(legs[1]["confidence"], "Medium-High");
        assert!(legs[0].get("base_odds").is_none());
        assert_eq!(body["luck_level"], 0);
        assert_eq!(body["team_analysis"]["captain"]["name"], "salah");
    }

    #[tokio::test]
    async fn adjust_odds_requotes_for_new_luck() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let (_, neutral) = send(&app, Method::GET, "/api/adjust_odds/?playerId=1234&luckLevel=0", None).await;
        let (status, lucky) = send(&app, Method::GET, "/api/adjust_odds/?playerId=1234&luckLevel=3", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(lucky["luck_level"], 3);
        assert!(lucky["total_odds"].as_f64().unwrap() > neutral["total_odds"].as_f64().unwrap());
    }

    #[tokio::test]
    async fn missing_player_id_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        for uri in [
            "/api/generate_bet_suggestions/?luckLevel=1",
            "/api/async_get_team_data/",
            "/api/user_history/?playerId=",
            "/api/debug_ml_calculations/",
        ] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "Player ID missing.");
        }
    }

    #[tokio::test]
    async fn bad_luck_level_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            &app(dir.path()).await,
            Method::GET,
            "/api/generate_bet_suggestions/?playerId=1234&luckLevel=lots",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("luckLevel"));
    }

    #[tokio::test]
    async fn non_numeric_player_id_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = send(
            &app(dir.path()).await,
            Method::GET,
            "/api/async_get_team_data/?playerId=abc",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_team_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            &app(dir.path()).await,
            Method::GET,
            "/api/async_get_team_data/?playerId=404",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Team data not found.");
    }

    #[tokio::test]
    async fn place_bet_then_read_history() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let (status, receipt) = send(
            &app,
            Method::POST,
            "/api/place_bet/",
            Some(json!({
                "playerId": 1234,
                "legs": [{"id": "captain_3", "player": "salah", "team": "LIV",
                          "betType": "Goal Scorer (Captain)", "odds": 1.8}],
                "totalOdds": 1.8,
                "totalStake": 10.0,
                "potentialWin": 18.0,
                "luckLevel": 2
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["success"], true);
        assert_eq!(receipt["playerId"], "1234");
        assert_eq!(receipt["legsCount"], 1);
        assert_eq!(receipt["betCount"], 1);
        assert_eq!(receipt["betId"].as_str().unwrap().len(), 36);

        let (status, history) = send(&app, Method::GET, "/api/user_history/?playerId=1234", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["bet_count"], 1);
        assert_eq!(history["history"][0]["stake"], 10.0);
        assert_eq!(history["history"][0]["luck_level"], 2);
        assert!((history["baseline_odds"].as_f64().unwrap() - 1.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn place_bet_without_player_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = send(
            &app(dir.path()).await,
            Method::POST,
            "/api/place_bet/",
            Some(json!({"totalOdds": 2.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_bet_body_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/place_bet/",
            Some(json!({"playerId": "7", "luckLevel": 1.5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string(), "{body}");

        let (_, history) = send(&app, Method::GET, "/api/user_history/?playerId=7", None).await;
        assert_eq!(history["bet_count"], 0);
    }

    #[tokio::test]
    async fn receipt_timestamp_has_microseconds() {
        let dir = tempfile::tempdir().unwrap();
        let (_, receipt) = send(
            &app(dir.path()).await,
            Method::POST,
            "/api/place_bet/",
            Some(json!({"playerId": "7"})),
        )
        .await;
        let ts = receipt["timestamp"].as_str().unwrap();
        assert_eq!(ts.split_once('.').unwrap().1.len(), 6, "{ts}");
    }

    #[tokio::test]
    async fn debug_history_lists_users() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        send(&app, Method::POST, "/api/place_bet/", Some(json!({"playerId": "7"}))).await;

        let (status, body) = send(&app, Method::GET, "/api/debug_user_history/?reload=true", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reloaded"], true);
        assert_eq!(body["total_users"], 1);
        assert_eq!(body["users"][0]["player_id"], "7");
        assert_eq!(body["users"][0]["bet_count"], 1);
    }

    #[tokio::test]
    async fn debug_calculations_report_each_leg() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            &app(dir.path()).await,
            Method::GET,
            "/api/debug_ml_calculations/?playerId=1234&luckLevel=-2",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let legs = body["legs"].as_array().unwrap();
        assert_eq!(legs.len(), 4);
        assert_eq!(legs[0]["slot"], "captain");
        assert_eq!(legs[0]["max_odds"], 5.0);
        assert_eq!(body["baseline_odds"], 1.2);
        assert!(body["recent_luck_average"].is_null());
    }

    #[tokio::test]
    async fn player_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let (status, body) =
            send(&app, Method::GET, "/api/get_player_id/?playerName=Alex&teamName=Alex%20FC", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["player_id"], 1234);

        let (status, _) =
            send(&app, Method::GET, "/api/get_player_id/?playerName=Sam&teamName=X", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, Method::GET, "/api/get_player_id/?playerName=Alex", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing playerName or teamName");
    }

    #[tokio::test]
    async fn bet_type_catalogue() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(&app(dir.path()).await, Method::GET, "/api/bet_types/", None).await;
        assert_eq!(status, StatusCode::OK);
        let types = body.as_array().unwrap();
        assert_eq!(types.len(), 9);
        assert_eq!(types[0], json!({"betType": "Goal Scorer", "baseOdds": 2.0}));
    }

    #[tokio::test]
    async fn health_turns_ok_once_gameweek_known() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let (_, cold) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(cold["status"], "degraded");
        assert!(cold["current_gameweek"].is_null());

        send(&app, Method::GET, "/api/generate_bet_suggestions/?playerId=1234", None).await;
        let (status, warm) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(warm["status"], "ok");
        assert_eq!(warm["current_gameweek"], 5);
        assert_eq!(warm["suggestion_requests"], 1);

        let (_, latency) = send(&app, Method::GET, "/stats/latency", None).await;
        assert_eq!(latency["samples"], 1);
    }
}
