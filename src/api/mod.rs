use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::{create_pool, get_all_leagues, init_database_with_pool, register_league, require_league};
use crate::error::OutlookError;
use crate::models::{
    Analysis, ApiResponse, LeagueSnapshot, NewLeagueRequest, PlayerAnalysis, PlayerRecommendations, PlayerSummaryRow,
    PowerRankingRow, RecommendationRow, RegisteredLeague, TeamReport, TopPositionsMode, TopPositionsRow,
};
use crate::services::player_analysis::build_player_analysis;
use crate::services::recommendations::recommendations_table;
use crate::services::snapshot::{load_snapshot, recommend_for_team, team_report};
use crate::services::summaries::{build_player_summary, build_top_positions};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
}

type ApiError = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub async fn serve(config: Config, port: u16) -> anyhow::Result<()> {
    let pool = create_pool(&config.database_url).await?;
    init_database_with_pool(&pool).await?;

    let state = AppState {
        pool,
        config: Arc::new(config),
    };
    let app = create_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Outlook API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/leagues", get(list_leagues_handler).post(create_league_handler))
        .route("/leagues/{name}/{year}/snapshot", get(snapshot_handler))
        .route("/leagues/{name}/{year}/power-rankings", get(power_rankings_handler))
        .route("/leagues/{name}/{year}/top-positions", get(top_positions_handler))
        .route("/leagues/{name}/{year}/player-summary", get(player_summary_handler))
        .route("/leagues/{name}/{year}/teams/{team}", get(team_report_handler))
        .route("/leagues/{name}/{year}/teams/{team}/recommendations", get(recommendations_handler))
        .route("/leagues/{name}/{year}/players/{player}", get(player_analysis_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// ── Error mapping ────────────────────────────────────────────

/// Domain rejections become 4xx with their message; anything else is logged and hidden behind a 500.
fn status_for(error: &anyhow::Error) -> StatusCode {
    match error.downcast_ref::<OutlookError>() {
        Some(OutlookError::UnknownLeague(_)) | Some(OutlookError::UnknownPlayer(_)) => StatusCode::NOT_FOUND,
        Some(OutlookError::DuplicateLeague(_)) | Some(OutlookError::DuplicateLeagueId { .. }) => StatusCode::CONFLICT,
        Some(OutlookError::AnalysisDisabled(_)) => StatusCode::FORBIDDEN,
        Some(_) => StatusCode::BAD_REQUEST,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(context: &str, error: anyhow::Error) -> ApiError {
    let status = status_for(&error);
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("{}: {:#}", context, error);
        format!("{} failed", context)
    } else {
        error.to_string()
    };
    (status, Json(ApiResponse::error(message)))
}

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
}

/// The registered league, rejected up front when it has switched `analysis` off.
async fn league_for(state: &AppState, name: &str, analysis: Option<Analysis>) -> Result<RegisteredLeague, ApiError> {
    let league = require_league(&state.pool, name)
        .await
        .map_err(|e| reject("League lookup", e))?;
    if let Some(analysis) = analysis {
        league
            .analyses
            .require(analysis)
            .map_err(|e| reject("League lookup", e.into()))?;
    }
    Ok(league)
}

async fn snapshot_for(
    state: &AppState,
    league: &RegisteredLeague,
    year: i32,
    week: Option<u32>,
) -> Result<LeagueSnapshot, ApiError> {
    load_snapshot(&state.config, league, year, week)
        .await
        .map_err(|e| reject("Snapshot build", e))
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("Outlook API is running"))
}

// ── League registry ──────────────────────────────────────────

// GET /leagues
async fn list_leagues_handler(State(state): State<AppState>) -> ApiResult<Vec<RegisteredLeague>> {
    match get_all_leagues(&state.pool).await {
        Ok(leagues) => Ok(Json(ApiResponse::success(leagues))),
        Err(e) => Err(reject("League listing", e)),
    }
}

// POST /leagues
async fn create_league_handler(
    State(state): State<AppState>,
    Json(request): Json<NewLeagueRequest>,
) -> ApiResult<RegisteredLeague> {
    match register_league(&state.pool, request).await {
        Ok(league) => Ok(Json(ApiResponse::success(league))),
        Err(e) => Err(reject("League registration", e)),
    }
}

// ── League tables ────────────────────────────────────────────

#[derive(Deserialize)]
struct WeekQuery {
    week: Option<u32>,
}

// GET /leagues/{name}/{year}/snapshot
async fn snapshot_handler(
    State(state): State<AppState>,
    Path((name, year)): Path<(String, i32)>,
    Query(params): Query<WeekQuery>,
) -> ApiResult<LeagueSnapshot> {
    let league = league_for(&state, &name, None).await?;
    let snapshot = snapshot_for(&state, &league, year, params.week).await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

// GET /leagues/{name}/{year}/power-rankings
async fn power_rankings_handler(
    State(state): State<AppState>,
    Path((name, year)): Path<(String, i32)>,
    Query(params): Query<WeekQuery>,
) -> ApiResult<Vec<PowerRankingRow>> {
    let league = league_for(&state, &name, Some(Analysis::PowerRankings)).await?;
    let snapshot = snapshot_for(&state, &league, year, params.week).await?;
    Ok(Json(ApiResponse::success(snapshot.power_rankings)))
}

#[derive(Deserialize)]
struct TopPositionsQuery {
    week: Option<u32>,
    mode: Option<String>,
}

// GET /leagues/{name}/{year}/top-positions
async fn top_positions_handler(
    State(state): State<AppState>,
    Path((name, year)): Path<(String, i32)>,
    Query(params): Query<TopPositionsQuery>,
) -> ApiResult<Vec<TopPositionsRow>> {
    let mode = match params.mode.as_deref() {
        Some(raw) => raw.parse::<TopPositionsMode>().map_err(|e| bad_request(e.to_string()))?,
        None => TopPositionsMode::default(),
    };

    let league = league_for(&state, &name, Some(Analysis::PlayerPositionStats)).await?;
    let snapshot = snapshot_for(&state, &league, year, params.week).await?;
    if mode == TopPositionsMode::MostPoints {
        return Ok(Json(ApiResponse::success(snapshot.top_positions)));
    }

    let rows = build_top_positions(&snapshot.players, 5, Some((1, snapshot.week)), mode);
    Ok(Json(ApiResponse::success(rows)))
}

#[derive(Deserialize)]
struct PlayerSummaryQuery {
    week: Option<u32>,
    teams: Option<String>,
}

// GET /leagues/{name}/{year}/player-summary
async fn player_summary_handler(
    State(state): State<AppState>,
    Path((name, year)): Path<(String, i32)>,
    Query(params): Query<PlayerSummaryQuery>,
) -> ApiResult<Vec<PlayerSummaryRow>> {
    let league = league_for(&state, &name, Some(Analysis::PlayerLevelStats)).await?;
    let snapshot = snapshot_for(&state, &league, year, params.week).await?;

    let teams: Vec<String> = match params.teams.as_deref() {
        Some(raw) => raw.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect(),
        None => snapshot.teams.iter().map(|t| t.name.clone()).collect(),
    };

    if let Some(unknown) = teams.iter().find(|t| !snapshot.teams.iter().any(|lt| &lt.name == *t)) {
        let error = OutlookError::UnknownTeam {
            given: unknown.clone(),
            valid: snapshot.teams.iter().map(|t| t.name.clone()).collect(),
        };
        return Err(bad_request(error.to_string()));
    }

    let rows = build_player_summary(&snapshot.players, 10, Some((1, snapshot.week)), Some(teams.as_slice()));
    Ok(Json(ApiResponse::success(rows)))
}

// ── Teams and players ────────────────────────────────────────

// GET /leagues/{name}/{year}/teams/{team}
async fn team_report_handler(
    State(state): State<AppState>,
    Path((name, year, team)): Path<(String, i32, String)>,
    Query(params): Query<WeekQuery>,
) -> ApiResult<TeamReport> {
    let league = league_for(&state, &name, None).await?;
    let snapshot = snapshot_for(&state, &league, year, params.week).await?;
    match team_report(&snapshot, &team, &league.analyses) {
        Ok(report) => Ok(Json(ApiResponse::success(report))),
        Err(e) => Err(reject("Team report", e.into())),
    }
}

#[derive(Serialize)]
struct RecommendationsResponse {
    swaps: Vec<PlayerRecommendations>,
    table: Vec<RecommendationRow>,
}

// GET /leagues/{name}/{year}/teams/{team}/recommendations
async fn recommendations_handler(
    State(state): State<AppState>,
    Path((name, year, team)): Path<(String, i32, String)>,
) -> ApiResult<RecommendationsResponse> {
    let league = league_for(&state, &name, Some(Analysis::FreeAgentRecs)).await?;

    match recommend_for_team(&state.config, &league, year, &team).await {
        Ok(swaps) => {
            let table = recommendations_table(&swaps);
            Ok(Json(ApiResponse::success(RecommendationsResponse { swaps, table })))
        }
        Err(e) => Err(reject("Recommendations", e)),
    }
}

// GET /leagues/{name}/{year}/players/{player}
async fn player_analysis_handler(
    State(state): State<AppState>,
    Path((name, year, player)): Path<(String, i32, String)>,
    Query(params): Query<WeekQuery>,
) -> ApiResult<PlayerAnalysis> {
    let league = league_for(&state, &name, Some(Analysis::PlayerLevelStats)).await?;
    let snapshot = snapshot_for(&state, &league, year, params.week).await?;
    match build_player_analysis(&snapshot.players, &player) {
        Ok(analysis) => Ok(Json(ApiResponse::success(analysis))),
        Err(e) => Err(reject("Player analysis", e.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let unknown = anyhow::Error::from(OutlookError::UnknownLeague("x".into()));
        assert_eq!(status_for(&unknown), StatusCode::NOT_FOUND);

        let team = anyhow::Error::from(OutlookError::UnknownTeam {
            given: "x".into(),
            valid: vec!["A".into()],
        });
        assert_eq!(status_for(&team), StatusCode::BAD_REQUEST);

        let disabled = anyhow::Error::from(OutlookError::AnalysisDisabled("free_agent_recs".into()));
        assert_eq!(status_for(&disabled), StatusCode::FORBIDDEN);

        let taken = anyhow::Error::from(OutlookError::DuplicateLeagueId {
            league_id: 1,
            name: "work".into(),
        });
        assert_eq!(status_for(&taken), StatusCode::CONFLICT);

        let upstream = anyhow::anyhow!("ESPN API error 503");
        assert_eq!(status_for(&upstream), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rejections_carry_domain_messages_only() {
        let (status, Json(body)) = reject(
            "Snapshot build",
            OutlookError::InvalidWeek { week: 9, max: 4 }.into(),
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("Week 9 is out of range (1..=4)"));

        let (status, Json(body)) = reject("Snapshot build", anyhow::anyhow!("secret token in body"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.as_deref(), Some("Snapshot build failed"));
    }
}
