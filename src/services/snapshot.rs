//! Assembles every table for one (league, year, week) and serves it through the session cache.

use anyhow::Result;

use crate::config::Config;
use crate::error::OutlookError;
use crate::models::{
    Analysis, EnabledAnalyses, LeagueInfo, LeagueSnapshot, Platform, PlayerRecommendations, RegisteredLeague,
    TeamReport, TopPositionsMode, WeekBoxScores,
};
use crate::services::espn_client::EspnClient;
use crate::services::fantasy_pros::FantasyProsClient;
use crate::services::mvp::build_mvp_analysis;
use crate::services::outcomes::{build_luck_table, classify_team_outcomes, summarize_unexpected, team_luck};
use crate::services::overrides::{load_overrides, ManualOverride};
use crate::services::player_scores::build_player_records;
use crate::services::power_rankings::{build_power_rankings_table, compute_power_rankings};
use crate::services::recommendations::recommend_swaps;
use crate::services::secrets::{EspnCredentials, SecretStore};
use crate::services::session_cache::SessionCache;
use crate::services::summaries::{build_player_summary, build_team_summary, build_top_positions};
use crate::services::team_results::{build_team_weeks, team_record};
use crate::utils::format_record;

const TEAM_SUMMARY_TOP: usize = 3;
const PLAYER_SUMMARY_TOP: usize = 10;
const TOP_POSITIONS_TOP: usize = 5;
const FREE_AGENT_POOL: u32 = 200;

/// The week to analyse: the requested one, or the league's current week.
pub fn resolve_week(requested: Option<u32>, current_week: u32) -> Result<u32, OutlookError> {
    match requested {
        None => Ok(current_week),
        Some(week) if week == 0 || week > current_week => Err(OutlookError::InvalidWeek {
            week,
            max: current_week,
        }),
        Some(week) => Ok(week),
    }
}

/// Build every table from already-fetched league data. `box_scores` should cover weeks 1..=week.
pub fn assemble_snapshot(
    league_id: i64,
    year: i32,
    week: u32,
    league: &LeagueInfo,
    box_scores: &[WeekBoxScores],
    overrides: &[ManualOverride],
) -> LeagueSnapshot {
    let players = build_player_records(box_scores);
    let team_weeks = build_team_weeks(&players);

    let rankings = compute_power_rankings(&league.teams, &team_weeks, week);
    let power_rankings = build_power_rankings_table(&rankings, &league.teams, &team_weeks, overrides, year, week);

    let team_names: Vec<String> = league.teams.iter().map(|t| t.name.clone()).collect();
    let week_range = Some((1, week));

    LeagueSnapshot {
        league_id,
        year,
        week,
        league_name: league.name.clone(),
        teams: league.teams.clone(),
        team_summary: build_team_summary(&players, TEAM_SUMMARY_TOP, week_range),
        player_summary: build_player_summary(&players, PLAYER_SUMMARY_TOP, week_range, Some(team_names.as_slice())),
        top_positions: build_top_positions(&players, TOP_POSITIONS_TOP, week_range, TopPositionsMode::MostPoints),
        power_rankings,
        players,
        team_weeks,
    }
}

pub struct SnapshotBuilder {
    client: EspnClient,
    league_id: i64,
    year: i32,
    overrides: Vec<ManualOverride>,
}

impl SnapshotBuilder {
    pub fn new(client: EspnClient, league_id: i64, year: i32, overrides: Vec<ManualOverride>) -> Self {
        Self {
            client,
            league_id,
            year,
            overrides,
        }
    }

    pub async fn build(&self, week: Option<u32>) -> Result<LeagueSnapshot> {
        let league = self.client.fetch_league().await?;
        let week = resolve_week(week, league.current_week)?;

        tracing::info!("Building snapshot for '{}' through week {}…", league.name, week);
        let box_scores = self.client.fetch_season_box_scores(week, &league.teams).await?;
        let snapshot = assemble_snapshot(self.league_id, self.year, week, &league, &box_scores, &self.overrides);

        tracing::info!(
            "Snapshot ready: {} player-weeks, {} team-weeks",
            snapshot.players.len(),
            snapshot.team_weeks.len()
        );
        Ok(snapshot)
    }
}

// ── Team report ──────────────────────────────────────────────

/// Outcomes, MVP and luck for one team. Unknown names are rejected with the valid ones listed.
///
/// Outcomes and luck follow the unexpected-outcomes switch; the MVP section follows its own.
pub fn team_report(
    snapshot: &LeagueSnapshot,
    team_name: &str,
    analyses: &EnabledAnalyses,
) -> Result<TeamReport, OutlookError> {
    if !analyses.unexpected_outcomes && !analyses.mvp_analysis {
        return Err(OutlookError::AnalysisDisabled(format!(
            "{} and {}",
            Analysis::UnexpectedOutcomes,
            Analysis::MvpAnalysis
        )));
    }

    let team = snapshot
        .teams
        .iter()
        .find(|t| t.name == team_name)
        .ok_or_else(|| OutlookError::UnknownTeam {
            given: team_name.to_string(),
            valid: snapshot.teams.iter().map(|t| t.name.clone()).collect(),
        })?;

    let record = team_record(&snapshot.team_weeks, team.id, snapshot.week);
    let mut report = TeamReport {
        team: team.name.clone(),
        record: format_record(record.wins, record.losses, record.ties),
        outcomes: Vec::new(),
        unexpected: None,
        mvp: None,
        luck: Vec::new(),
        luck_summary: None,
    };

    if analyses.unexpected_outcomes {
        let outcomes = classify_team_outcomes(&snapshot.team_weeks, &team.name);
        report.unexpected = Some(summarize_unexpected(&team.name, &outcomes, &record));
        report.outcomes = outcomes;

        let luck: Vec<_> = build_luck_table(&snapshot.team_weeks)
            .into_iter()
            .filter(|row| row.team == team.name)
            .collect();
        report.luck_summary = Some(team_luck(&luck, &team.name));
        report.luck = luck;
    }

    if analyses.mvp_analysis {
        // MVP shares use every starter point through the week, settled or not, like the player rows
        let team_points: f64 = snapshot
            .team_weeks
            .iter()
            .filter(|tw| tw.team_id == team.id && tw.week <= snapshot.week)
            .map(|tw| tw.points)
            .sum();
        report.mvp = Some(build_mvp_analysis(&snapshot.players, &team.name, team_points));
    }

    Ok(report)
}

// ── Registered leagues ───────────────────────────────────────

async fn espn_client(config: &Config, league: &RegisteredLeague, year: i32) -> Result<EspnClient> {
    let platform: Platform = league.platform.parse()?;
    match platform {
        Platform::Espn => {
            let secrets = SecretStore::new(&config.secrets_dir).load(&league.secret_name).await?;
            let credentials = EspnCredentials::from(&secrets);
            Ok(EspnClient::new(&config.espn_base_url, league.league_id, year, credentials))
        }
    }
}

/// Snapshot for a registered league, from the session cache when fresh.
pub async fn load_snapshot(
    config: &Config,
    league: &RegisteredLeague,
    year: i32,
    week: Option<u32>,
) -> Result<LeagueSnapshot> {
    let cache = SessionCache::new(&config.cache_dir, config.cache_timeout_secs);

    cache
        .get_or_compute(league.league_id, year, week, move || async move {
            let client = espn_client(config, league, year).await?;
            let overrides = match &config.overrides_path {
                Some(path) => load_overrides(path)?,
                None => Vec::new(),
            };
            SnapshotBuilder::new(client, league.league_id, year, overrides).build(week).await
        })
        .await
        .map(|mut snapshot| {
            league.analyses.redact(&mut snapshot);
            snapshot
        })
}

/// Free-agent swaps for one team at the league's current week.
pub async fn recommend_for_team(
    config: &Config,
    league: &RegisteredLeague,
    year: i32,
    team_name: &str,
) -> Result<Vec<PlayerRecommendations>> {
    league.analyses.require(Analysis::FreeAgentRecs)?;
    let client = espn_client(config, league, year).await?;
    let info = client.fetch_league().await?;

    let team = info
        .teams
        .iter()
        .find(|t| t.name == team_name)
        .ok_or_else(|| OutlookError::UnknownTeam {
            given: team_name.to_string(),
            valid: info.teams.iter().map(|t| t.name.clone()).collect(),
        })?;

    let roster = client.fetch_roster(team.id, info.current_week).await?;
    let free_agents = client.fetch_free_agents(info.current_week, FREE_AGENT_POOL).await?;
    let fantasy_pros = FantasyProsClient::new(&config.fantasy_pros_base_url);
    let fantasy_pros = &fantasy_pros;

    let recommendations = recommend_swaps(&roster, &free_agents, move |candidate, player| async move {
        fantasy_pros.compare(&candidate, &player).await
    })
    .await;

    tracing::info!("{} roster players have swap suggestions for {}", recommendations.len(), team.name);
    Ok(recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeagueTeam;
    use crate::services::player_scores::fixtures::{season_with_week_in_progress, two_team_season};

    fn league() -> LeagueInfo {
        let team = |id: u32, name: &str, standing: u32| LeagueTeam {
            id,
            name: name.to_string(),
            wins: 1,
            losses: 1,
            ties: 0,
            points_for: 0.0,
            points_against: 0.0,
            standing,
        };
        LeagueInfo {
            name: "Test League".to_string(),
            current_week: 2,
            teams: vec![team(1, "Alpha", 2), team(2, "Beta", 1)],
        }
    }

    #[test]
    fn test_resolve_week() {
        assert_eq!(resolve_week(None, 5).unwrap(), 5);
        assert_eq!(resolve_week(Some(3), 5).unwrap(), 3);
        assert!(matches!(resolve_week(Some(0), 5), Err(OutlookError::InvalidWeek { .. })));
        assert!(matches!(resolve_week(Some(6), 5), Err(OutlookError::InvalidWeek { week: 6, max: 5 })));
    }

    #[test]
    fn test_assemble_snapshot_tables() {
        let snapshot = assemble_snapshot(1, 2020, 2, &league(), &two_team_season(), &[]);

        assert_eq!(snapshot.players.len(), 10);
        assert_eq!(snapshot.team_weeks.len(), 4);
        assert_eq!(snapshot.power_rankings.len(), 2);
        assert_eq!(snapshot.team_summary.len(), 2);
        assert_eq!(snapshot.player_summary.len(), 5);
        assert_eq!(snapshot.top_positions.len(), 5);

        // each team beat the other once, so scores tie at 1 + 1 and team order holds
        assert_eq!(snapshot.power_rankings[0].team, "Alpha");
        assert_eq!(snapshot.power_rankings[0].power_ranking_score, 2.0);
        assert_eq!(snapshot.power_rankings[0].record, "1-1");
    }

    #[test]
    fn test_team_report() {
        let snapshot = assemble_snapshot(1, 2020, 2, &league(), &two_team_season(), &[]);
        let report = team_report(&snapshot, "Alpha", &EnabledAnalyses::default()).unwrap();

        assert_eq!(report.record, "1-1");
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.unexpected.as_ref().unwrap().unexpected_wins, 1);
        let mvp = report.mvp.as_ref().unwrap();
        assert_eq!(mvp.mvp.as_deref(), Some("Josh Allen"));
        assert_eq!(mvp.team_points, 70.0);
        assert_eq!(report.luck.len(), 2);
        assert!(report.luck.iter().all(|r| r.team == "Alpha"));
    }

    #[test]
    fn test_current_week_in_progress_is_not_scored() {
        let mut info = league();
        info.current_week = 3;
        let snapshot = assemble_snapshot(1, 2020, 3, &info, &season_with_week_in_progress(), &[]);

        // Alpha's early 3-0 lead in week 3 changes neither record nor ranking
        assert_eq!(snapshot.power_rankings[0].team, "Alpha");
        assert_eq!(snapshot.power_rankings[0].record, "1-1");
        assert_eq!(snapshot.power_rankings[0].power_ranking_score, 2.0);
        assert_eq!(snapshot.power_rankings[1].record, "1-1");

        let report = team_report(&snapshot, "Alpha", &EnabledAnalyses::default()).unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.unexpected.as_ref().unwrap().unexpected_wins, 1);
        assert_eq!(report.luck.len(), 2);
        assert_eq!(report.mvp.as_ref().unwrap().team_points, 73.0);
    }

    #[test]
    fn test_team_report_leaves_out_disabled_sections() {
        let snapshot = assemble_snapshot(1, 2020, 2, &league(), &two_team_season(), &[]);

        let no_mvp = EnabledAnalyses::with_disabled(&[Analysis::MvpAnalysis]);
        let report = team_report(&snapshot, "Alpha", &no_mvp).unwrap();
        assert!(report.mvp.is_none());
        assert_eq!(report.outcomes.len(), 2);

        let mvp_only = EnabledAnalyses::with_disabled(&[Analysis::UnexpectedOutcomes]);
        let report = team_report(&snapshot, "Alpha", &mvp_only).unwrap();
        assert!(report.outcomes.is_empty() && report.luck.is_empty());
        assert!(report.unexpected.is_none() && report.luck_summary.is_none());
        assert!(report.mvp.is_some());

        let neither = EnabledAnalyses::with_disabled(&[Analysis::UnexpectedOutcomes, Analysis::MvpAnalysis]);
        let err = team_report(&snapshot, "Alpha", &neither).unwrap_err();
        assert!(matches!(err, OutlookError::AnalysisDisabled(_)));
    }

    #[test]
    fn test_redact_clears_disabled_tables() {
        let mut snapshot = assemble_snapshot(1, 2020, 2, &league(), &two_team_season(), &[]);
        EnabledAnalyses::with_disabled(&[Analysis::PowerRankings, Analysis::PlayerPositionStats]).redact(&mut snapshot);

        assert!(snapshot.power_rankings.is_empty());
        assert!(snapshot.top_positions.is_empty());
        assert_eq!(snapshot.team_summary.len(), 2);
        assert_eq!(snapshot.player_summary.len(), 5);
    }

    #[test]
    fn test_unknown_team_lists_valid_names() {
        let snapshot = assemble_snapshot(1, 2020, 2, &league(), &two_team_season(), &[]);
        let err = team_report(&snapshot, "Gamma", &EnabledAnalyses::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Gamma is not a valid team in this league! Must be one of: Alpha, Beta"
        );
    }
}
