use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

use crate::models::{BoxScore, BoxScoreSide, LeagueInfo, LeagueTeam, LineupPlayer, RosterPlayer, WeekBoxScores};
use crate::services::secrets::{AuthMode, EspnCredentials};

// ── ESPN fantasy API structures ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnLeagueResponse {
    pub settings: Option<EspnSettings>,
    pub status: Option<EspnStatus>,
    pub scoring_period_id: Option<u32>,
    #[serde(default)]
    pub teams: Vec<EspnTeam>,
    #[serde(default)]
    pub schedule: Vec<EspnMatchup>,
}

#[derive(Debug, Deserialize)]
pub struct EspnSettings {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnStatus {
    pub current_matchup_period: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnTeam {
    pub id: u32,
    pub name: Option<String>,
    pub location: Option<String>,
    pub nickname: Option<String>,
    pub record: Option<EspnRecord>,
    pub playoff_seed: Option<u32>,
    pub roster: Option<EspnRoster>,
}

#[derive(Debug, Deserialize)]
pub struct EspnRecord {
    pub overall: EspnRecordLine,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnRecordLine {
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub ties: u32,
    #[serde(default)]
    pub points_for: f64,
    #[serde(default)]
    pub points_against: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnMatchup {
    pub matchup_period_id: u32,
    pub home: Option<EspnMatchupSide>,
    pub away: Option<EspnMatchupSide>,
    /// `"HOME"`, `"AWAY"`, `"TIE"` or `"UNDECIDED"` while the week is in progress.
    pub winner: Option<String>,
}

impl EspnMatchup {
    /// Older seasons omit `winner`; those matchups are final.
    pub fn is_decided(&self) -> bool {
        self.winner.as_deref() != Some("UNDECIDED")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnMatchupSide {
    pub team_id: u32,
    pub roster_for_current_scoring_period: Option<EspnRoster>,
}

#[derive(Debug, Deserialize)]
pub struct EspnRoster {
    #[serde(default)]
    pub entries: Vec<EspnRosterEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnRosterEntry {
    pub lineup_slot_id: u32,
    pub player_pool_entry: EspnPlayerEntry,
}

#[derive(Debug, Deserialize)]
pub struct EspnPlayerEntry {
    pub player: EspnPlayer,
    pub ratings: Option<HashMap<String, EspnRating>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnPlayer {
    pub full_name: String,
    pub default_position_id: u32,
    #[serde(default)]
    pub stats: Vec<EspnStatLine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnStatLine {
    pub scoring_period_id: u32,
    pub stat_source_id: u32,
    pub applied_total: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspnRating {
    pub positional_ranking: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct EspnPlayersResponse {
    #[serde(default)]
    pub players: Vec<EspnPlayerEntry>,
}

// ── Id mappings ─────────────────────────────────────────────────────────────

const ACTUAL_STATS: u32 = 0;
const PROJECTED_STATS: u32 = 1;
const SEASON_PERIOD: u32 = 0;

pub fn position_name(position_id: u32) -> &'static str {
    match position_id {
        1 => "QB",
        2 => "RB",
        3 => "WR",
        4 => "TE",
        5 => "K",
        16 => "D/ST",
        _ => "?",
    }
}

pub fn slot_name(slot_id: u32) -> &'static str {
    match slot_id {
        0 => "QB",
        2 => "RB",
        3 => "RB/WR",
        4 => "WR",
        5 => "WR/TE",
        6 => "TE",
        7 => "OP",
        16 => "D/ST",
        17 => "K",
        20 => "BE",
        21 => "IR",
        23 => "FLEX",
        _ => "?",
    }
}

impl EspnPlayer {
    fn stat(&self, scoring_period: u32, source: u32) -> Option<f64> {
        self.stats
            .iter()
            .find(|s| s.scoring_period_id == scoring_period && s.stat_source_id == source)
            .and_then(|s| s.applied_total)
    }
}

impl EspnPlayerEntry {
    fn position_rank(&self) -> u32 {
        self.ratings
            .as_ref()
            .and_then(|r| r.get("0"))
            .and_then(|r| r.positional_ranking)
            .unwrap_or(0)
    }

    fn to_roster_player(&self, week: u32) -> RosterPlayer {
        RosterPlayer {
            name: self.player.full_name.clone(),
            position: position_name(self.player.default_position_id).to_string(),
            position_rank: self.position_rank(),
            projected_points: self.player.stat(week, PROJECTED_STATS),
            season_projected: self.player.stat(SEASON_PERIOD, PROJECTED_STATS),
        }
    }
}

impl EspnTeam {
    fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => format!(
                "{} {}",
                self.location.as_deref().unwrap_or("").trim(),
                self.nickname.as_deref().unwrap_or("").trim()
            )
            .trim()
            .to_string(),
        }
    }
}

// ── Response → model conversion ─────────────────────────────────────────────

pub fn parse_league(resp: &EspnLeagueResponse) -> LeagueInfo {
    let current_week = resp
        .status
        .as_ref()
        .and_then(|s| s.current_matchup_period)
        .or(resp.scoring_period_id)
        .unwrap_or(1);

    let mut teams: Vec<LeagueTeam> = resp
        .teams
        .iter()
        .map(|t| {
            let record = t.record.as_ref().map(|r| &r.overall);
            LeagueTeam {
                id: t.id,
                name: t.display_name(),
                wins: record.map_or(0, |r| r.wins),
                losses: record.map_or(0, |r| r.losses),
                ties: record.map_or(0, |r| r.ties),
                points_for: record.map_or(0.0, |r| r.points_for),
                points_against: record.map_or(0.0, |r| r.points_against),
                standing: t.playoff_seed.unwrap_or(0),
            }
        })
        .collect();
    teams.sort_by_key(|t| t.id);

    LeagueInfo {
        name: resp
            .settings
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "Unnamed League".to_string()),
        current_week,
        teams,
    }
}

pub fn parse_box_scores(resp: &EspnLeagueResponse, week: u32, teams: &[LeagueTeam]) -> WeekBoxScores {
    let team_name = |id: u32| {
        teams
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("Team {}", id))
    };

    let side = |s: &EspnMatchupSide| BoxScoreSide {
        team_id: s.team_id,
        team_name: team_name(s.team_id),
        lineup: s
            .roster_for_current_scoring_period
            .as_ref()
            .map(|r| {
                r.entries
                    .iter()
                    .map(|e| {
                        let p = &e.player_pool_entry.player;
                        LineupPlayer {
                            name: p.full_name.clone(),
                            position: position_name(p.default_position_id).to_string(),
                            slot: slot_name(e.lineup_slot_id).to_string(),
                            points: p.stat(week, ACTUAL_STATS).unwrap_or(0.0),
                            projected_points: p.stat(week, PROJECTED_STATS).unwrap_or(0.0),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default(),
    };

    let box_scores = resp
        .schedule
        .iter()
        .filter(|m| m.matchup_period_id == week)
        .map(|m| BoxScore {
            home: m.home.as_ref().map(&side),
            away: m.away.as_ref().map(&side),
            decided: m.is_decided(),
        })
        .collect();

    WeekBoxScores { week, box_scores }
}

pub fn parse_roster(resp: &EspnLeagueResponse, team_id: u32, week: u32) -> Vec<RosterPlayer> {
    resp.teams
        .iter()
        .find(|t| t.id == team_id)
        .and_then(|t| t.roster.as_ref())
        .map(|r| {
            r.entries
                .iter()
                .map(|e| e.player_pool_entry.to_roster_player(week))
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_free_agents(resp: &EspnPlayersResponse, week: u32) -> Vec<RosterPlayer> {
    resp.players.iter().map(|p| p.to_roster_player(week)).collect()
}

// ── EspnClient ──────────────────────────────────────────────────────────────

const MAX_RATE_LIMIT_ATTEMPTS: u32 = 3;

/// Seconds to wait after the `attempt`-th rate-limited response, or `None` once retries are spent.
pub fn rate_limit_backoff(attempt: u32) -> Option<u64> {
    if attempt >= MAX_RATE_LIMIT_ATTEMPTS {
        return None;
    }
    Some(2u64.pow(attempt) * 5) // 10s, 20s
}

pub struct EspnClient {
    client: Client,
    base_url: String,
    league_id: i64,
    year: i32,
    credentials: EspnCredentials,
}

impl EspnClient {
    pub fn new(base_url: &str, league_id: i64, year: i32, credentials: EspnCredentials) -> Self {
        match credentials.auth_mode() {
            AuthMode::Cookies => tracing::debug!("ESPN league {} ({}): cookie auth", league_id, year),
            AuthMode::LoginWithoutCookies => tracing::warn!(
                "ESPN league {}: username/password given without espn_s2/SWID cookies, requesting as a public league",
                league_id
            ),
            AuthMode::Public => tracing::debug!("ESPN league {} ({}): public access", league_id, year),
        }

        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            league_id,
            year,
            credentials,
        }
    }

    fn league_url(&self) -> String {
        format!("{}/seasons/{}/segments/0/leagues/{}", self.base_url, self.year, self.league_id)
    }

    fn headers(&self, fantasy_filter: Option<&serde_json::Value>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let (Some(s2), Some(swid)) = (&self.credentials.espn_s2, &self.credentials.swid) {
            headers.insert(COOKIE, HeaderValue::from_str(&format!("espn_s2={}; SWID={}", s2, swid))?);
        }
        if let Some(filter) = fantasy_filter {
            headers.insert("x-fantasy-filter", HeaderValue::from_str(&filter.to_string())?);
        }
        Ok(headers)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        params: &[(&str, String)],
        fantasy_filter: Option<&serde_json::Value>,
    ) -> Result<T> {
        let url = self.league_url();
        let headers = self.headers(fantasy_filter)?;

        // Retry up to 3 times on 429 with exponential backoff
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let resp = self
                .client
                .get(&url)
                .query(params)
                .headers(headers.clone())
                .send()
                .await?;

            if resp.status() == 429 {
                let Some(wait) = rate_limit_backoff(attempts) else {
                    return Err(anyhow!("ESPN API rate limit exceeded after {} attempts", attempts));
                };
                tracing::warn!("ESPN 429 rate-limited, waiting {}s (attempt {})", wait, attempts);
                tokio::time::sleep(tokio::time::Duration::from_secs(wait)).await;
                continue;
            }

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(anyhow!("ESPN API error {} for league {}: {}", status, self.league_id, body));
            }

            return Ok(resp.json().await?);
        }
    }

    pub async fn fetch_league(&self) -> Result<LeagueInfo> {
        tracing::info!("Fetching league {} ({}) from ESPN…", self.league_id, self.year);

        let params = [
            ("view", "mTeam".to_string()),
            ("view", "mSettings".to_string()),
            ("view", "mStatus".to_string()),
        ];
        let resp: EspnLeagueResponse = self.get_json(&params, None).await?;
        let league = parse_league(&resp);

        tracing::info!("League '{}' has {} teams, current week {}", league.name, league.teams.len(), league.current_week);
        Ok(league)
    }

    pub async fn fetch_box_scores(&self, week: u32, teams: &[LeagueTeam]) -> Result<WeekBoxScores> {
        tracing::info!("Fetching box scores for week {}…", week);

        let params = [
            ("view", "mMatchupScore".to_string()),
            ("view", "mBoxscore".to_string()),
            ("scoringPeriodId", week.to_string()),
        ];
        let resp: EspnLeagueResponse = self.get_json(&params, None).await?;
        Ok(parse_box_scores(&resp, week, teams))
    }

    /// Box scores for weeks 1..=through, fetched one week at a time.
    pub async fn fetch_season_box_scores(&self, through: u32, teams: &[LeagueTeam]) -> Result<Vec<WeekBoxScores>> {
        let mut weeks = Vec::with_capacity(through as usize);
        for week in 1..=through {
            weeks.push(self.fetch_box_scores(week, teams).await?);
        }
        Ok(weeks)
    }

    pub async fn fetch_roster(&self, team_id: u32, week: u32) -> Result<Vec<RosterPlayer>> {
        tracing::info!("Fetching roster for team {} (week {})…", team_id, week);

        let params = [("view", "mRoster".to_string()), ("scoringPeriodId", week.to_string())];
        let resp: EspnLeagueResponse = self.get_json(&params, None).await?;
        Ok(parse_roster(&resp, team_id, week))
    }

    pub async fn fetch_free_agents(&self, week: u32, size: u32) -> Result<Vec<RosterPlayer>> {
        tracing::info!("Fetching top {} free agents (week {})…", size, week);

        let filter = serde_json::json!({
            "players": {
                "filterStatus": { "value": ["FREEAGENT", "WAIVERS"] },
                "limit": size,
                "sortPercOwned": { "sortPriority": 1, "sortAsc": false }
            }
        });
        let params = [("view", "kona_player_info".to_string()), ("scoringPeriodId", week.to_string())];
        let resp: EspnPlayersResponse = self.get_json(&params, Some(&filter)).await?;
        let agents = parse_free_agents(&resp, week);

        tracing::info!("Received {} free agents", agents.len());
        Ok(agents)
    }
}
