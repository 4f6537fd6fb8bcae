use std::collections::HashMap;

use crate::models::{
    PlayerSummaryRow, PlayerWeekRecord, PositionLeader, TeamSummaryRow, TopPositionsMode, TopPositionsRow, POSITIONS,
};
use crate::services::player_scores::in_week_range;
use crate::utils::{asc, desc, label_with_value};

/// Sum `value` per key, keeping keys in first-seen order.
fn sum_by<'a, K, V>(rows: impl IntoIterator<Item = &'a PlayerWeekRecord>, key: K, value: V) -> Vec<(String, f64)>
where
    K: Fn(&PlayerWeekRecord) -> &str,
    V: Fn(&PlayerWeekRecord) -> f64,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut totals: Vec<(String, f64)> = Vec::new();

    for r in rows {
        let k = key(r);
        match index.get(k) {
            Some(&i) => totals[i].1 += value(r),
            None => {
                index.insert(k.to_string(), totals.len());
                totals.push((k.to_string(), value(r)));
            }
        }
    }

    totals
}

fn sorted_desc(mut totals: Vec<(String, f64)>) -> Vec<(String, f64)> {
    totals.sort_by(|a, b| desc(a.1, b.1));
    totals
}

fn label(entry: &(String, f64)) -> String {
    label_with_value(&entry.0, entry.1)
}

// ── Team summary ─────────────────────────────────────────────

/// Rows pair the i-th team from the top and from the bottom of each ordering.
pub fn build_team_summary(
    records: &[PlayerWeekRecord],
    top: usize,
    week_range: Option<(u32, u32)>,
) -> Vec<TeamSummaryRow> {
    let rows = in_week_range(records, week_range);

    let projections = sorted_desc(sum_by(
        rows.iter().copied().filter(|r| r.is_starter()),
        |r| r.team.as_str(),
        |r| r.projection_diff,
    ));

    // every team gets a bench total, zero when nothing sat
    let bench = sorted_desc(sum_by(
        rows.iter().copied(),
        |r| r.team.as_str(),
        |r| if r.is_starter() { 0.0 } else { r.points },
    ));

    let top = top.min(projections.len()).min(bench.len());

    (0..top)
        .map(|i| TeamSummaryRow {
            rank: i + 1,
            most_under_projected: label(&projections[i]),
            most_over_projected: label(&projections[projections.len() - 1 - i]),
            most_points_on_bench: label(&bench[i]),
            least_points_on_bench: label(&bench[bench.len() - 1 - i]),
        })
        .collect()
}

// ── Player summary ───────────────────────────────────────────

pub fn build_player_summary(
    records: &[PlayerWeekRecord],
    top: usize,
    week_range: Option<(u32, u32)>,
    on_teams: Option<&[String]>,
) -> Vec<PlayerSummaryRow> {
    let rows: Vec<&PlayerWeekRecord> = in_week_range(records, week_range)
        .into_iter()
        .filter(|r| on_teams.map_or(true, |teams| teams.iter().any(|t| t == &r.team)))
        .collect();

    let points = sorted_desc(sum_by(rows.iter().copied(), |r| r.player_name.as_str(), |r| r.points));
    let diffs = sorted_desc(sum_by(rows.iter().copied(), |r| r.player_name.as_str(), |r| r.projection_diff));

    let top = top.min(points.len());

    (0..top)
        .map(|i| PlayerSummaryRow {
            rank: i + 1,
            most_points: label(&points[i]),
            most_under_projected: label(&diffs[i]),
            most_over_projected: label(&diffs[diffs.len() - 1 - i]),
        })
        .collect()
}

// ── Top positions ────────────────────────────────────────────

/// Top `top` players per position; short positions leave `None` cells.
pub fn build_top_positions(
    records: &[PlayerWeekRecord],
    top: usize,
    week_range: Option<(u32, u32)>,
    mode: TopPositionsMode,
) -> Vec<TopPositionsRow> {
    let rows = in_week_range(records, week_range);

    let per_position: Vec<(&str, Vec<(String, f64)>)> = POSITIONS
        .iter()
        .map(|&position| {
            let at_position = rows.iter().copied().filter(|r| r.position == position);
            let mut totals = match mode {
                TopPositionsMode::MostPoints => sum_by(at_position, |r| r.player_name.as_str(), |r| r.points),
                TopPositionsMode::OutPerformed | TopPositionsMode::UnderPerformed => {
                    sum_by(at_position, |r| r.player_name.as_str(), |r| r.projection_diff)
                }
            };
            match mode {
                TopPositionsMode::UnderPerformed => totals.sort_by(|a, b| asc(a.1, b.1)),
                _ => totals.sort_by(|a, b| desc(a.1, b.1)),
            }
            (position, totals)
        })
        .collect();

    (0..top)
        .map(|i| TopPositionsRow {
            rank: i + 1,
            leaders: per_position
                .iter()
                .map(|(position, totals)| PositionLeader {
                    position: position.to_string(),
                    leader: totals.get(i).map(label),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::player_scores::build_player_records;
    use crate::services::player_scores::fixtures::two_team_season;

    #[test]
    fn test_team_summary_orders_both_ends() {
        let records = build_player_records(&two_team_season());
        let summary = build_team_summary(&records, 3, None);

        // clamped to two teams
        assert_eq!(summary.len(), 2);

        // Alpha starters: +10 -5 -3 -2 = 0; Beta: -5 +3 +4 +3 = 5
        assert_eq!(summary[0].most_under_projected, "Beta (5.00)");
        assert_eq!(summary[0].most_over_projected, "Alpha (0.00)");
        assert_eq!(summary[0].most_points_on_bench, "Alpha (15.00)");
        assert_eq!(summary[0].least_points_on_bench, "Beta (0.00)");
        assert_eq!(summary[1].most_under_projected, "Alpha (0.00)");
    }

    #[test]
    fn test_team_summary_week_range() {
        let records = build_player_records(&two_team_season());
        let summary = build_team_summary(&records, 1, Some((2, 2)));
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].most_points_on_bench, "Alpha (3.00)");
        assert_eq!(summary[0].most_under_projected, "Beta (7.00)");
    }

    #[test]
    fn test_player_summary() {
        let records = build_player_records(&two_team_season());
        let summary = build_player_summary(&records, 10, None, None);
        assert_eq!(summary.len(), 5);
        assert_eq!(summary[0].most_points, "Lamar Jackson (48.00)");
        // Allen ties Lamar on 48 and Lamar was seen first
        assert_eq!(summary[1].most_points, "Josh Allen (48.00)");
        assert_eq!(summary[0].most_under_projected, "Josh Allen (7.00)");
        assert_eq!(summary[1].most_under_projected, "Nick Chubb (6.00)");
        assert_eq!(summary[0].most_over_projected, "Derrick Henry (-7.00)");
    }

    #[test]
    fn test_player_summary_on_teams() {
        let records = build_player_records(&two_team_season());
        let teams = vec!["Alpha".to_string()];
        let summary = build_player_summary(&records, 10, None, Some(teams.as_slice()));
        assert_eq!(summary.len(), 3);
        assert!(summary.iter().all(|r| !r.most_points.starts_with("Lamar")));
    }

    #[test]
    fn test_top_positions_modes() {
        let records = build_player_records(&two_team_season());

        let most = build_top_positions(&records, 2, None, TopPositionsMode::MostPoints);
        assert_eq!(most.len(), 2);
        let qb = |row: &TopPositionsRow| row.leaders.iter().find(|l| l.position == "QB").unwrap().leader.clone();
        let rb = |row: &TopPositionsRow| row.leaders.iter().find(|l| l.position == "RB").unwrap().leader.clone();
        assert_eq!(rb(&most[0]).as_deref(), Some("Nick Chubb (31.00)"));

        let out = build_top_positions(&records, 2, None, TopPositionsMode::OutPerformed);
        assert_eq!(qb(&out[0]).as_deref(), Some("Josh Allen (7.00)"));

        let under = build_top_positions(&records, 2, None, TopPositionsMode::UnderPerformed);
        assert_eq!(qb(&under[0]).as_deref(), Some("Lamar Jackson (-1.00)"));
        assert_eq!(rb(&under[0]).as_deref(), Some("Derrick Henry (-7.00)"));
    }

    #[test]
    fn test_top_positions_short_positions_are_empty() {
        let records = build_player_records(&two_team_season());
        let rows = build_top_positions(&records, 3, None, TopPositionsMode::MostPoints);
        assert_eq!(rows[0].leaders.len(), POSITIONS.len());

        let cell = |row: &TopPositionsRow, pos: &str| row.leaders.iter().find(|l| l.position == pos).unwrap().leader.clone();
        assert!(cell(&rows[0], "WR").is_some());
        assert!(cell(&rows[1], "WR").is_none());
        assert!(cell(&rows[0], "K").is_none());
        assert!(cell(&rows[2], "QB").is_none());
    }
}
