use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OutlookError;

/// Lineup slots whose points don't count toward the team score.
pub const BENCH_SLOTS: [&str; 2] = ["BE", "IR"];

/// Positions reported by the top-performers table, in display order.
pub const POSITIONS: [&str; 6] = ["QB", "RB", "TE", "WR", "D/ST", "K"];

pub fn is_bench_slot(slot: &str) -> bool {
    BENCH_SLOTS.contains(&slot)
}

// ── Source data (league API) ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueTeam {
    pub id: u32,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points_for: f64,
    pub points_against: f64,
    pub standing: u32, // league ranking as reported by the platform
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueInfo {
    pub name: String,
    pub current_week: u32,
    pub teams: Vec<LeagueTeam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupPlayer {
    pub name: String,
    pub position: String,
    pub slot: String,
    pub points: f64,
    pub projected_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxScoreSide {
    pub team_id: u32,
    pub team_name: String,
    pub lineup: Vec<LineupPlayer>,
}

/// One matchup. A side is `None` when that team is on a bye.
///
/// `decided` is false while the platform still reports the matchup as undecided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxScore {
    pub home: Option<BoxScoreSide>,
    pub away: Option<BoxScoreSide>,
    pub decided: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekBoxScores {
    pub week: u32,
    pub box_scores: Vec<BoxScore>,
}

/// A rostered player or free agent, as seen by the recommendation heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub name: String,
    pub position: String,
    pub position_rank: u32, // 0 when the platform has no ranking
    pub projected_points: Option<f64>,
    pub season_projected: Option<f64>,
}

// ── Derived tables ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerWeekRecord {
    pub player_name: String,
    pub week: u32,
    pub points: f64,
    pub projected_points: f64,
    pub projection_diff: f64,
    pub position: String,
    pub slot: String,
    pub team: String,
    pub team_id: u32,
    pub opponent: Option<String>,
    pub opponent_id: Option<u32>,
    pub decided: bool,
    pub cumulative_score: f64,
}

impl PlayerWeekRecord {
    pub fn is_starter(&self) -> bool {
        !is_bench_slot(&self.slot)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamWeekRecord {
    pub team: String,
    pub team_id: u32,
    pub week: u32,
    pub points: f64,
    pub projected_points: f64,
    pub projection_diff: f64,
    pub opponent: Option<String>,
    pub opponent_id: Option<u32>,
    pub opponent_points: f64,
    pub opponent_projected_points: f64,
    pub opponent_projection_diff: f64,
    pub decided: bool,
    pub won: bool, // only ever true once the matchup is decided
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerRanking {
    pub score: f64,
    pub team_id: u32,
    pub team_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerRankingRow {
    pub team: String,
    pub manual_ranking: Option<u32>,
    pub power_ranking: u32,
    pub league_ranking: u32,
    pub manual_analysis: Option<String>,
    pub record: String,
    pub points_scored: f64,
    pub points_allowed: f64,
    pub point_differential: String,
    pub power_ranking_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummaryRow {
    pub rank: usize,
    pub most_under_projected: String,
    pub most_over_projected: String,
    pub most_points_on_bench: String,
    pub least_points_on_bench: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummaryRow {
    pub rank: usize,
    pub most_points: String,
    pub most_under_projected: String,
    pub most_over_projected: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionLeader {
    pub position: String,
    pub leader: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPositionsRow {
    pub rank: usize,
    pub leaders: Vec<PositionLeader>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopPositionsMode {
    #[default]
    MostPoints,
    OutPerformed,
    UnderPerformed,
}

impl FromStr for TopPositionsMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "most-points" | "most points scored" => Ok(Self::MostPoints),
            "out-performed" | "out-performed projection" => Ok(Self::OutPerformed),
            "under-performed" | "under-performed projection" => Ok(Self::UnderPerformed),
            other => Err(anyhow::anyhow!(
                "Unknown mode '{}'. Use 'most-points', 'out-performed' or 'under-performed'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "L")]
    Loss,
    #[serde(rename = "T")]
    Tie,
}

impl GameResult {
    pub fn from_points(points: f64, opponent_points: f64) -> Self {
        if points > opponent_points {
            GameResult::Win
        } else if points < opponent_points {
            GameResult::Loss
        } else {
            GameResult::Tie
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameResult::Win => "W",
            GameResult::Loss => "L",
            GameResult::Tie => "T",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamOutcome {
    pub week: u32,
    pub points: f64,
    pub projected_points: f64,
    pub opponent: Option<String>,
    pub opponent_points: f64,
    pub opponent_projected_points: f64,
    pub opponent_projection_diff: f64,
    pub projected_result: GameResult,
    pub result: GameResult,
}

impl TeamOutcome {
    pub fn is_unexpected(&self) -> bool {
        self.projected_result != self.result
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnexpectedSummary {
    pub team: String,
    pub wins: u32,
    pub losses: u32,
    pub unexpected_outcomes: u32,
    pub unexpected_wins: u32,
    pub unexpected_losses: u32,
    pub favored: String,
    pub narrative: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuckRow {
    pub week: u32,
    pub team: String,
    pub opponent: String,
    pub points: f64,
    pub opponent_points: f64,
    pub won: bool,
    pub league_points: f64,
    pub lucky_win: bool,
    pub unlucky_loss: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LuckLabel {
    Lucky,
    Unlucky,
    Neither,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamLuck {
    pub team: String,
    pub lucky_wins: u32,
    pub unlucky_losses: u32,
    pub label: LuckLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MvpPoint {
    pub player_name: String,
    pub week: u32,
    pub cumulative_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MvpAnalysis {
    pub team: String,
    pub mvp: Option<String>,
    pub mvp_points: f64,
    pub team_points: f64,
    pub mvp_share_pct: f64,
    pub top_three_points: f64,
    pub top_three_share_pct: f64,
    pub top_heavy: bool,
    pub narrative: String,
    pub series: Vec<MvpPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerWeekComparison {
    pub week: u32,
    pub points: f64,
    pub projected_points: f64,
    pub projection_diff: f64,
    pub league_average_points: f64,
    pub league_average_projected: f64,
    pub league_average_projection_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAnalysis {
    pub player: String,
    pub position: String,
    pub weeks: Vec<PlayerWeekComparison>,
    pub points_z: f64,
    pub projected_points_z: f64,
    pub projection_diff_z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub player: String,
    pub candidate: String,
    pub for_reasons: Vec<String>,
    pub against_reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecommendations {
    pub player: String,
    pub swaps: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub index: String,
    pub recommendation: String,
    pub reasons: String,
}

/// Everything computed for one (league, year, week); the unit the session cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueSnapshot {
    pub league_id: i64,
    pub year: i32,
    pub week: u32,
    pub league_name: String,
    pub teams: Vec<LeagueTeam>,
    pub players: Vec<PlayerWeekRecord>,
    pub team_weeks: Vec<TeamWeekRecord>,
    pub power_rankings: Vec<PowerRankingRow>,
    pub team_summary: Vec<TeamSummaryRow>,
    pub player_summary: Vec<PlayerSummaryRow>,
    pub top_positions: Vec<TopPositionsRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamReport {
    pub team: String,
    pub record: String,
    pub outcomes: Vec<TeamOutcome>,
    pub unexpected: Option<UnexpectedSummary>,
    pub mvp: Option<MvpAnalysis>,
    pub luck: Vec<LuckRow>,
    pub luck_summary: Option<TeamLuck>,
}

// ── League registry ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "ESPN")]
    Espn,
}

impl Platform {
    pub const SUPPORTED: [&'static str; 1] = ["ESPN"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Espn => "ESPN",
        }
    }
}

impl FromStr for Platform {
    type Err = OutlookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ESPN" => Ok(Platform::Espn),
            _ => Err(OutlookError::UnsupportedPlatform {
                given: s.to_string(),
                supported: Platform::SUPPORTED.iter().map(|p| p.to_string()).collect(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredLeague {
    pub id: String,
    pub name: String,
    pub platform: String,
    pub league_id: i64,
    pub secret_name: String,
    pub analyses: EnabledAnalyses,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLeagueRequest {
    pub name: String,
    pub platform: Option<String>,
    pub league_id: i64,
    pub secret_name: String,
    #[serde(default)]
    pub analyses: EnabledAnalyses,
}

/// The analyses a league can switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analysis {
    PowerRankings,
    TeamLevelStats,
    PlayerLevelStats,
    PlayerPositionStats,
    UnexpectedOutcomes,
    MvpAnalysis,
    FreeAgentRecs,
}

impl Analysis {
    pub const ALL: [Analysis; 7] = [
        Analysis::PowerRankings,
        Analysis::TeamLevelStats,
        Analysis::PlayerLevelStats,
        Analysis::PlayerPositionStats,
        Analysis::UnexpectedOutcomes,
        Analysis::MvpAnalysis,
        Analysis::FreeAgentRecs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Analysis::PowerRankings => "power_rankings",
            Analysis::TeamLevelStats => "team_level_stats",
            Analysis::PlayerLevelStats => "player_level_stats",
            Analysis::PlayerPositionStats => "player_position_stats",
            Analysis::UnexpectedOutcomes => "unexpected_outcomes",
            Analysis::MvpAnalysis => "mvp_analysis",
            Analysis::FreeAgentRecs => "free_agent_recs",
        }
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Analysis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        Analysis::ALL
            .into_iter()
            .find(|a| a.as_str() == key)
            .ok_or_else(|| {
                let valid: Vec<&str> = Analysis::ALL.iter().map(|a| a.as_str()).collect();
                format!("Unknown analysis '{}'. Must be one of: {}", s, valid.join(", "))
            })
    }
}

/// Per-league switches; everything is on unless turned off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnabledAnalyses {
    pub power_rankings: bool,
    pub team_level_stats: bool,
    pub player_level_stats: bool,
    pub player_position_stats: bool,
    pub unexpected_outcomes: bool,
    pub mvp_analysis: bool,
    pub free_agent_recs: bool,
}

impl Default for EnabledAnalyses {
    fn default() -> Self {
        Self {
            power_rankings: true,
            team_level_stats: true,
            player_level_stats: true,
            player_position_stats: true,
            unexpected_outcomes: true,
            mvp_analysis: true,
            free_agent_recs: true,
        }
    }
}

impl EnabledAnalyses {
    pub fn with_disabled(disabled: &[Analysis]) -> Self {
        let mut analyses = Self::default();
        for &analysis in disabled {
            *analyses.flag_mut(analysis) = false;
        }
        analyses
    }

    fn flag_mut(&mut self, analysis: Analysis) -> &mut bool {
        match analysis {
            Analysis::PowerRankings => &mut self.power_rankings,
            Analysis::TeamLevelStats => &mut self.team_level_stats,
            Analysis::PlayerLevelStats => &mut self.player_level_stats,
            Analysis::PlayerPositionStats => &mut self.player_position_stats,
            Analysis::UnexpectedOutcomes => &mut self.unexpected_outcomes,
            Analysis::MvpAnalysis => &mut self.mvp_analysis,
            Analysis::FreeAgentRecs => &mut self.free_agent_recs,
        }
    }

    pub fn is_enabled(&self, analysis: Analysis) -> bool {
        match analysis {
            Analysis::PowerRankings => self.power_rankings,
            Analysis::TeamLevelStats => self.team_level_stats,
            Analysis::PlayerLevelStats => self.player_level_stats,
            Analysis::PlayerPositionStats => self.player_position_stats,
            Analysis::UnexpectedOutcomes => self.unexpected_outcomes,
            Analysis::MvpAnalysis => self.mvp_analysis,
            Analysis::FreeAgentRecs => self.free_agent_recs,
        }
    }

    pub fn require(&self, analysis: Analysis) -> Result<(), OutlookError> {
        if self.is_enabled(analysis) {
            Ok(())
        } else {
            Err(OutlookError::AnalysisDisabled(analysis.to_string()))
        }
    }

    pub fn disabled(&self) -> Vec<Analysis> {
        Analysis::ALL.into_iter().filter(|a| !self.is_enabled(*a)).collect()
    }

    /// Empty the snapshot tables this league has switched off.
    pub fn redact(&self, snapshot: &mut LeagueSnapshot) {
        if !self.power_rankings {
            snapshot.power_rankings.clear();
        }
        if !self.team_level_stats {
            snapshot.team_summary.clear();
        }
        if !self.player_level_stats {
            snapshot.player_summary.clear();
        }
        if !self.player_position_stats {
            snapshot.top_positions.clear();
        }
    }
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_result_from_points() {
        assert_eq!(GameResult::from_points(100.0, 95.0), GameResult::Win);
        assert_eq!(GameResult::from_points(90.0, 96.0), GameResult::Loss);
        assert_eq!(GameResult::from_points(88.5, 88.5), GameResult::Tie);
    }

    #[test]
    fn test_platform_rejection_names_options() {
        assert_eq!("espn".parse::<Platform>().unwrap(), Platform::Espn);

        let err = "Yahoo".parse::<Platform>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Yahoo"));
        assert!(msg.contains("ESPN"));
    }

    #[test]
    fn test_top_positions_mode_parsing() {
        assert_eq!("most-points".parse::<TopPositionsMode>().unwrap(), TopPositionsMode::MostPoints);
        assert_eq!(
            "Under-performed projection".parse::<TopPositionsMode>().unwrap(),
            TopPositionsMode::UnderPerformed
        );
        assert!("best".parse::<TopPositionsMode>().is_err());
    }

    #[test]
    fn test_bench_slots() {
        assert!(is_bench_slot("BE"));
        assert!(is_bench_slot("IR"));
        assert!(!is_bench_slot("FLEX"));
    }

    #[test]
    fn test_analysis_parsing() {
        assert_eq!("free-agent-recs".parse::<Analysis>().unwrap(), Analysis::FreeAgentRecs);
        assert_eq!("MVP_analysis".parse::<Analysis>().unwrap(), Analysis::MvpAnalysis);
        assert!("luck".parse::<Analysis>().unwrap_err().contains("power_rankings"));
    }

    #[test]
    fn test_disabled_analysis_is_rejected_by_name() {
        let analyses = EnabledAnalyses::with_disabled(&[Analysis::PowerRankings]);
        assert!(analyses.require(Analysis::PlayerLevelStats).is_ok());

        let err = analyses.require(Analysis::PowerRankings).unwrap_err();
        assert_eq!(err.to_string(), "power_rankings is disabled for this league");
    }

    #[test]
    fn test_missing_flags_default_to_enabled() {
        let analyses: EnabledAnalyses = serde_json::from_str(r#"{"mvp_analysis": false}"#).unwrap();
        assert_eq!(analyses.disabled(), vec![Analysis::MvpAnalysis]);
    }
}
