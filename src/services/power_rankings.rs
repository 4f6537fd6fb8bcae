use nalgebra::DMatrix;
use std::collections::HashMap;

use crate::models::{LeagueTeam, PowerRanking, PowerRankingRow, TeamWeekRecord};
use crate::services::overrides::{self, ManualOverride};
use crate::services::team_results::team_record;
use crate::utils::{desc, format_differential, format_record};

/// Two-step dominance rankings through `week`.
///
/// `M[i][j]` counts how often team i beat team j in the decided matchups of weeks 1..=week. A team's
/// score is its row sum of `M + M²`: direct wins plus the wins of every team it
/// beat. All teams appear exactly once, highest score first; equal scores keep
/// the order of `teams`.
pub fn compute_power_rankings(teams: &[LeagueTeam], team_weeks: &[TeamWeekRecord], week: u32) -> Vec<PowerRanking> {
    let n = teams.len();
    let position: HashMap<u32, usize> = teams.iter().enumerate().map(|(i, t)| (t.id, i)).collect();

    let mut wins = DMatrix::<f64>::zeros(n, n);
    for tw in team_weeks.iter().filter(|tw| tw.week <= week && tw.decided && tw.won) {
        let Some(opponent_id) = tw.opponent_id else { continue };
        if let (Some(&i), Some(&j)) = (position.get(&tw.team_id), position.get(&opponent_id)) {
            wins[(i, j)] += 1.0;
        }
    }

    let dominance = &wins + &wins * &wins;

    let mut rankings: Vec<PowerRanking> = teams
        .iter()
        .enumerate()
        .map(|(i, t)| PowerRanking {
            score: dominance.row(i).sum(),
            team_id: t.id,
            team_name: t.name.clone(),
        })
        .collect();

    // sort_by is stable, so ties keep team order
    rankings.sort_by(|a, b| desc(a.score, b.score));
    rankings
}

/// Join rankings with records through `week` and any manual take for that week.
pub fn build_power_rankings_table(
    rankings: &[PowerRanking],
    teams: &[LeagueTeam],
    team_weeks: &[TeamWeekRecord],
    overrides: &[ManualOverride],
    year: i32,
    week: u32,
) -> Vec<PowerRankingRow> {
    let mut rows: Vec<PowerRankingRow> = rankings
        .iter()
        .enumerate()
        .map(|(i, ranking)| {
            let record = team_record(team_weeks, ranking.team_id, week);
            let standing = teams
                .iter()
                .find(|t| t.id == ranking.team_id)
                .map_or(0, |t| t.standing);
            let manual = overrides::lookup(overrides, ranking.team_id, year, week);

            PowerRankingRow {
                team: ranking.team_name.clone(),
                manual_ranking: manual.and_then(|m| m.ranking),
                power_ranking: (i + 1) as u32,
                league_ranking: standing,
                manual_analysis: manual.and_then(|m| m.analysis.clone()),
                record: format_record(record.wins, record.losses, record.ties),
                points_scored: record.points_for.round(),
                points_allowed: record.points_against.round(),
                point_differential: format_differential(record.points_for - record.points_against),
                power_ranking_score: ranking.score,
            }
        })
        .collect();

    let fully_ranked = !rows.is_empty() && rows.iter().all(|r| r.manual_ranking.is_some());
    if fully_ranked {
        rows.sort_by_key(|r| (r.manual_ranking, r.power_ranking, r.league_ranking));
    } else {
        rows.sort_by_key(|r| (r.power_ranking, r.league_ranking));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: u32, name: &str, standing: u32) -> LeagueTeam {
        LeagueTeam {
            id,
            name: name.to_string(),
            wins: 0,
            losses: 0,
            ties: 0,
            points_for: 0.0,
            points_against: 0.0,
            standing,
        }
    }

    fn game(week: u32, winner: (u32, &str), loser: (u32, &str)) -> Vec<TeamWeekRecord> {
        let row = |me: (u32, &str), them: (u32, &str), points: f64, opp: f64| TeamWeekRecord {
            team: me.1.to_string(),
            team_id: me.0,
            week,
            points,
            projected_points: 100.0,
            projection_diff: points - 100.0,
            opponent: Some(them.1.to_string()),
            opponent_id: Some(them.0),
            opponent_points: opp,
            opponent_projected_points: 100.0,
            opponent_projection_diff: opp - 100.0,
            decided: true,
            won: points > opp,
        };
        vec![row(winner, loser, 110.0, 90.0), row(loser, winner, 90.0, 110.0)]
    }

    fn league() -> Vec<LeagueTeam> {
        vec![team(1, "A", 1), team(2, "B", 2), team(3, "C", 3), team(4, "D", 4)]
    }

    /// A beats everyone; B beats C and D; C beats D.
    fn season() -> Vec<TeamWeekRecord> {
        let (a, b, c, d) = ((1, "A"), (2, "B"), (3, "C"), (4, "D"));
        [
            game(1, a, b),
            game(1, c, d),
            game(2, a, c),
            game(2, b, d),
            game(3, a, d),
            game(3, b, c),
        ]
        .concat()
    }

    #[test]
    fn test_every_team_ranked_once_in_descending_order() {
        let teams = league();
        let team_weeks = season();
        for week in 0..=3 {
            let rankings = compute_power_rankings(&teams, &team_weeks, week);
            assert_eq!(rankings.len(), teams.len());

            let mut ids: Vec<u32> = rankings.iter().map(|r| r.team_id).collect();
            ids.sort();
            assert_eq!(ids, vec![1, 2, 3, 4]);

            assert!(rankings.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn test_two_step_scores() {
        let rankings = compute_power_rankings(&league(), &season(), 3);
        let score = |name: &str| rankings.iter().find(|r| r.team_name == name).unwrap().score;

        // A: 3 direct + (B 2 + C 1 + D 0)
        assert_eq!(score("A"), 6.0);
        // B: 2 direct + (C 1 + D 0)
        assert_eq!(score("B"), 3.0);
        assert_eq!(score("C"), 1.0);
        assert_eq!(score("D"), 0.0);
    }

    #[test]
    fn test_undefeated_beats_winless() {
        let rankings = compute_power_rankings(&league(), &season(), 3);
        assert_eq!(rankings[0].team_name, "A");
        assert_eq!(rankings[3].team_name, "D");
        assert!(rankings[0].score > rankings[3].score);
    }

    #[test]
    fn test_week_cutoff_and_stable_ties() {
        // only week 1 counts: A and C have one win each over winless teams
        let rankings = compute_power_rankings(&league(), &season(), 1);
        let names: Vec<&str> = rankings.iter().map(|r| r.team_name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn test_ties_are_not_wins() {
        let tied = vec![
            TeamWeekRecord {
                team: "A".into(),
                team_id: 1,
                week: 1,
                points: 100.0,
                projected_points: 0.0,
                projection_diff: 0.0,
                opponent: Some("B".into()),
                opponent_id: Some(2),
                opponent_points: 100.0,
                opponent_projected_points: 0.0,
                opponent_projection_diff: 0.0,
                decided: true,
                won: false,
            },
        ];
        let rankings = compute_power_rankings(&league(), &tied, 1);
        assert!(rankings.iter().all(|r| r.score == 0.0));
    }

    #[test]
    fn test_table_uses_manual_order_when_complete() {
        let teams = league();
        let team_weeks = season();
        let rankings = compute_power_rankings(&teams, &team_weeks, 3);

        let manual: Vec<ManualOverride> = [(1, 4), (2, 3), (3, 2), (4, 1)]
            .iter()
            .map(|&(id, rank)| ManualOverride {
                team_id: id,
                team: String::new(),
                year: 2020,
                week: 3,
                ranking: Some(rank),
                analysis: Some(format!("take {}", id)),
            })
            .collect();

        let table = build_power_rankings_table(&rankings, &teams, &team_weeks, &manual, 2020, 3);
        let names: Vec<&str> = table.iter().map(|r| r.team.as_str()).collect();
        assert_eq!(names, vec!["D", "C", "B", "A"]);
        assert_eq!(table[3].power_ranking, 1);
        assert_eq!(table[3].record, "3-0");
        assert_eq!(table[3].point_differential, "+60");
        assert_eq!(table[3].manual_analysis.as_deref(), Some("take 1"));

        // one missing take falls back to computed order
        let partial = &manual[..3];
        let table = build_power_rankings_table(&rankings, &teams, &team_weeks, partial, 2020, 3);
        assert_eq!(table[0].team, "A");
        assert_eq!(table[3].manual_ranking, None);
    }

    #[test]
    fn test_undecided_week_adds_no_wins() {
        let teams = league();
        let mut team_weeks = season();
        let mut in_progress = game(4, (4, "D"), (1, "A"));
        for tw in in_progress.iter_mut() {
            tw.decided = false;
            tw.won = false;
        }
        team_weeks.extend(in_progress);

        let rankings = compute_power_rankings(&teams, &team_weeks, 4);
        assert_eq!(rankings[3].team_name, "D");
        assert_eq!(rankings[3].score, 0.0);

        let table = build_power_rankings_table(&rankings, &teams, &team_weeks, &[], 2020, 4);
        assert_eq!(table[0].record, "3-0");
        assert_eq!(table[3].record, "0-3");
    }
}
