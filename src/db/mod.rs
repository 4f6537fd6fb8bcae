use anyhow::Result;
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;

use crate::error::OutlookError;
use crate::models::*;
use crate::utils::validate_league_name;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if !file_path.starts_with(":memory:") {
        if let Some(parent) = std::path::Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database(database_url: &str) -> Result<()> {
    let pool = create_pool(database_url).await?;
    init_database_with_pool(&pool).await
}

/// Called from the server so schema creation shares the main pool.
pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leagues (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            platform TEXT NOT NULL,
            league_id INTEGER NOT NULL UNIQUE,
            secret_name TEXT NOT NULL,
            power_rankings INTEGER NOT NULL DEFAULT 1,
            team_level_stats INTEGER NOT NULL DEFAULT 1,
            player_level_stats INTEGER NOT NULL DEFAULT 1,
            player_position_stats INTEGER NOT NULL DEFAULT 1,
            unexpected_outcomes INTEGER NOT NULL DEFAULT 1,
            mvp_analysis INTEGER NOT NULL DEFAULT 1,
            free_agent_recs INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

fn league_from_row(row: &SqliteRow) -> Result<RegisteredLeague> {
    Ok(RegisteredLeague {
        id: row.get("id"),
        name: row.get("name"),
        platform: row.get("platform"),
        league_id: row.get("league_id"),
        secret_name: row.get("secret_name"),
        analyses: EnabledAnalyses {
            power_rankings: row.get("power_rankings"),
            team_level_stats: row.get("team_level_stats"),
            player_level_stats: row.get("player_level_stats"),
            player_position_stats: row.get("player_position_stats"),
            unexpected_outcomes: row.get("unexpected_outcomes"),
            mvp_analysis: row.get("mvp_analysis"),
            free_agent_recs: row.get("free_agent_recs"),
        },
        created_at: chrono::DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))?.with_timezone(&Utc),
    })
}

// League registry operations
pub async fn insert_league(pool: &SqlitePool, league: &RegisteredLeague) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO leagues (
            id, name, platform, league_id, secret_name,
            power_rankings, team_level_stats, player_level_stats, player_position_stats,
            unexpected_outcomes, mvp_analysis, free_agent_recs, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&league.id)
    .bind(&league.name)
    .bind(&league.platform)
    .bind(league.league_id)
    .bind(&league.secret_name)
    .bind(league.analyses.power_rankings)
    .bind(league.analyses.team_level_stats)
    .bind(league.analyses.player_level_stats)
    .bind(league.analyses.player_position_stats)
    .bind(league.analyses.unexpected_outcomes)
    .bind(league.analyses.mvp_analysis)
    .bind(league.analyses.free_agent_recs)
    .bind(league.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_league_by_name(pool: &SqlitePool, name: &str) -> Result<Option<RegisteredLeague>> {
    let row = sqlx::query("SELECT * FROM leagues WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(league_from_row).transpose()
}

pub async fn get_league_by_league_id(pool: &SqlitePool, league_id: i64) -> Result<Option<RegisteredLeague>> {
    let row = sqlx::query("SELECT * FROM leagues WHERE league_id = ?")
        .bind(league_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(league_from_row).transpose()
}

pub async fn get_all_leagues(pool: &SqlitePool) -> Result<Vec<RegisteredLeague>> {
    let rows = sqlx::query("SELECT * FROM leagues ORDER BY name")
        .fetch_all(pool)
        .await?;

    rows.iter().map(league_from_row).collect()
}

/// Validate and store a new league. The platform defaults to ESPN.
pub async fn register_league(pool: &SqlitePool, request: NewLeagueRequest) -> Result<RegisteredLeague> {
    let name = request.name.trim().to_string();
    if !validate_league_name(&name) {
        return Err(OutlookError::InvalidLeagueName(request.name).into());
    }

    let platform: Platform = request.platform.as_deref().unwrap_or(Platform::Espn.as_str()).parse()?;

    if get_league_by_name(pool, &name).await?.is_some() {
        return Err(OutlookError::DuplicateLeague(name).into());
    }
    if let Some(existing) = get_league_by_league_id(pool, request.league_id).await? {
        return Err(OutlookError::DuplicateLeagueId {
            league_id: request.league_id,
            name: existing.name,
        }
        .into());
    }

    let league = RegisteredLeague {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        platform: platform.as_str().to_string(),
        league_id: request.league_id,
        secret_name: request.secret_name,
        analyses: request.analyses,
        created_at: Utc::now(),
    };
    insert_league(pool, &league).await?;

    tracing::info!("Registered league '{}' ({} #{})", league.name, league.platform, league.league_id);
    let disabled = league.analyses.disabled();
    if !disabled.is_empty() {
        tracing::info!("League '{}' has {} analyses disabled: {:?}", league.name, disabled.len(), disabled);
    }
    Ok(league)
}

/// Look up a league by name, rejecting unknown names.
pub async fn require_league(pool: &SqlitePool, name: &str) -> Result<RegisteredLeague> {
    get_league_by_name(pool, name)
        .await?
        .ok_or_else(|| OutlookError::UnknownLeague(name.to_string()).into())
}
