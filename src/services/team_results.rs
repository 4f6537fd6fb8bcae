use std::collections::HashMap;

use crate::models::{GameResult, PlayerWeekRecord, TeamWeekRecord};

/// Starter totals for one team-week, before the opponent join.
struct TeamWeekTotals {
    team: String,
    team_id: u32,
    week: u32,
    points: f64,
    projected_points: f64,
    projection_diff: f64,
    opponent: Option<String>,
    opponent_id: Option<u32>,
    decided: bool,
}

/// Sum starters per (team, week), then join each team-week to its opponent's row.
///
/// Every team-week with at least one player row appears, even one fielding only bench players.
pub fn build_team_weeks(records: &[PlayerWeekRecord]) -> Vec<TeamWeekRecord> {
    let mut index: HashMap<(u32, u32), usize> = HashMap::new();
    let mut totals: Vec<TeamWeekTotals> = Vec::new();

    for r in records {
        let i = *index.entry((r.team_id, r.week)).or_insert_with(|| {
            totals.push(TeamWeekTotals {
                team: r.team.clone(),
                team_id: r.team_id,
                week: r.week,
                points: 0.0,
                projected_points: 0.0,
                projection_diff: 0.0,
                opponent: r.opponent.clone(),
                opponent_id: r.opponent_id,
                decided: r.decided,
            });
            totals.len() - 1
        });

        if r.is_starter() {
            let t = &mut totals[i];
            t.points += r.points;
            t.projected_points += r.projected_points;
            t.projection_diff += r.projection_diff;
        }
    }

    totals
        .iter()
        .map(|t| {
            let opponent = t
                .opponent_id
                .and_then(|id| index.get(&(id, t.week)))
                .map(|&i| &totals[i]);

            let (opponent_points, opponent_projected_points, opponent_projection_diff) =
                opponent.map_or((0.0, 0.0, 0.0), |o| (o.points, o.projected_points, o.projection_diff));

            TeamWeekRecord {
                team: t.team.clone(),
                team_id: t.team_id,
                week: t.week,
                points: t.points,
                projected_points: t.projected_points,
                projection_diff: t.projection_diff,
                opponent: t.opponent.clone(),
                opponent_id: t.opponent_id,
                opponent_points,
                opponent_projected_points,
                opponent_projection_diff,
                decided: t.decided,
                won: t.decided && t.points > opponent_points,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamRecord {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points_for: f64,
    pub points_against: f64,
}

/// Win/loss record and points through `through_week`. Bye weeks add points but no game.
///
/// Undecided matchups are left out entirely until the platform settles them.
pub fn team_record(team_weeks: &[TeamWeekRecord], team_id: u32, through_week: u32) -> TeamRecord {
    let mut record = TeamRecord::default();

    for tw in team_weeks
        .iter()
        .filter(|tw| tw.team_id == team_id && tw.week <= through_week && tw.decided)
    {
        record.points_for += tw.points;
        if tw.opponent_id.is_none() {
            continue;
        }
        record.points_against += tw.opponent_points;
        match GameResult::from_points(tw.points, tw.opponent_points) {
            GameResult::Win => record.wins += 1,
            GameResult::Loss => record.losses += 1,
            GameResult::Tie => record.ties += 1,
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::player_scores::build_player_records;
    use crate::services::player_scores::fixtures::{season_with_week_in_progress, two_team_season};

    #[test]
    fn test_team_weeks_sum_starters_only() {
        let team_weeks = build_team_weeks(&build_player_records(&two_team_season()));
        assert_eq!(team_weeks.len(), 4);

        let alpha_w1 = team_weeks.iter().find(|t| t.team == "Alpha" && t.week == 1).unwrap();
        assert_eq!(alpha_w1.points, 40.0); // bench 12 excluded
        assert_eq!(alpha_w1.projected_points, 35.0);
        assert_eq!(alpha_w1.opponent_points, 35.0);
        assert_eq!(alpha_w1.opponent_projected_points, 37.0);
        assert!(alpha_w1.won);
    }

    #[test]
    fn test_self_join_is_symmetric() {
        let team_weeks = build_team_weeks(&build_player_records(&two_team_season()));
        for tw in &team_weeks {
            let other = team_weeks
                .iter()
                .find(|o| Some(o.team_id) == tw.opponent_id && o.week == tw.week)
                .unwrap();
            assert_eq!(other.opponent_points, tw.points);
            assert_eq!(other.points, tw.opponent_points);
        }
    }

    #[test]
    fn test_team_record_through_week() {
        let team_weeks = build_team_weeks(&build_player_records(&two_team_season()));

        let alpha = team_record(&team_weeks, 1, 2);
        assert_eq!((alpha.wins, alpha.losses, alpha.ties), (1, 1, 0));
        assert_eq!(alpha.points_for, 70.0);
        assert_eq!(alpha.points_against, 79.0);

        let alpha_w1 = team_record(&team_weeks, 1, 1);
        assert_eq!((alpha_w1.wins, alpha_w1.losses), (1, 0));
    }

    #[test]
    fn test_in_progress_week_is_not_a_result() {
        let team_weeks = build_team_weeks(&build_player_records(&season_with_week_in_progress()));

        let alpha_w3 = team_weeks.iter().find(|t| t.team == "Alpha" && t.week == 3).unwrap();
        assert!(!alpha_w3.decided);
        assert_eq!(alpha_w3.points, 3.0);
        assert!(!alpha_w3.won);

        let alpha = team_record(&team_weeks, 1, 3);
        assert_eq!((alpha.wins, alpha.losses, alpha.ties), (1, 1, 0));
        assert_eq!(alpha.points_for, 70.0);
    }
}
