use std::collections::{HashMap, HashSet};

use crate::models::{BoxScoreSide, PlayerWeekRecord, WeekBoxScores};

/// Flatten weekly box scores into one row per player per week.
///
/// Rows come out in (week, box score, away lineup, home lineup) order. A player
/// seen twice in the same week keeps only the first row.
pub fn build_player_records(weeks: &[WeekBoxScores]) -> Vec<PlayerWeekRecord> {
    let mut records = Vec::new();
    let mut seen: HashSet<(String, u32)> = HashSet::new();

    for week in weeks {
        tracing::debug!("Building players for week {}…", week.week);

        for box_score in &week.box_scores {
            let sides = [
                (box_score.away.as_ref(), box_score.home.as_ref()),
                (box_score.home.as_ref(), box_score.away.as_ref()),
            ];

            for (side, opponent) in sides {
                let Some(side) = side else { continue };
                push_side(&mut records, &mut seen, week.week, side, opponent, box_score.decided);
            }
        }
    }

    fill_cumulative_scores(&mut records);
    tracing::info!("Built {} player-week records across {} weeks", records.len(), weeks.len());
    records
}

fn push_side(
    records: &mut Vec<PlayerWeekRecord>,
    seen: &mut HashSet<(String, u32)>,
    week: u32,
    side: &BoxScoreSide,
    opponent: Option<&BoxScoreSide>,
    decided: bool,
) {
    for player in &side.lineup {
        if !seen.insert((player.name.clone(), week)) {
            tracing::warn!("Duplicate lineup entry for {} in week {}, keeping the first", player.name, week);
            continue;
        }

        records.push(PlayerWeekRecord {
            player_name: player.name.clone(),
            week,
            points: player.points,
            projected_points: player.projected_points,
            projection_diff: player.points - player.projected_points,
            position: player.position.clone(),
            slot: player.slot.clone(),
            team: side.team_name.clone(),
            team_id: side.team_id,
            opponent: opponent.map(|o| o.team_name.clone()),
            opponent_id: opponent.map(|o| o.team_id),
            decided,
            cumulative_score: 0.0,
        });
    }
}

/// Set each row's running total: the player's points over all weeks up to and including this one.
pub fn fill_cumulative_scores(records: &mut [PlayerWeekRecord]) {
    let mut by_player: HashMap<String, Vec<(u32, f64)>> = HashMap::new();
    for r in records.iter() {
        by_player.entry(r.player_name.clone()).or_default().push((r.week, r.points));
    }

    for r in records.iter_mut() {
        r.cumulative_score = by_player
            .get(&r.player_name)
            .map(|weeks| weeks.iter().filter(|(w, _)| *w <= r.week).map(|(_, p)| p).sum())
            .unwrap_or(r.points);
    }
}

/// Keep only rows whose week falls inside the inclusive range.
pub fn in_week_range(records: &[PlayerWeekRecord], week_range: Option<(u32, u32)>) -> Vec<&PlayerWeekRecord> {
    records
        .iter()
        .filter(|r| week_range.map_or(true, |(start, end)| r.week >= start && r.week <= end))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::models::BoxScore;

    #[test]
    fn test_build_player_records_tags_opponents() {
        let records = build_player_records(&two_team_season());
        assert_eq!(records.len(), 10);

        // away lineup first
        assert_eq!(records[0].player_name, "Lamar Jackson");
        assert_eq!(records[0].team, "Beta");
        assert_eq!(records[0].opponent.as_deref(), Some("Alpha"));
        assert_eq!(records[0].opponent_id, Some(1));
        assert_eq!(records[0].projection_diff, -5.0);
    }

    #[test]
    fn test_cumulative_score_is_running_sum() {
        let records = build_player_records(&two_team_season());
        let allen: Vec<_> = records.iter().filter(|r| r.player_name == "Josh Allen").collect();
        assert_eq!(allen[0].cumulative_score, 30.0);
        assert_eq!(allen[1].cumulative_score, 48.0);
    }

    #[test]
    fn test_player_week_pairs_are_unique() {
        let mut weeks = two_team_season();
        // same player listed in both lineups of one box score
        weeks[0].box_scores[0]
            .home
            .as_mut()
            .unwrap()
            .lineup
            .push(lineup_player("Nick Chubb", "RB", "BE", 15.0, 12.0));

        let records = build_player_records(&weeks);
        let mut pairs: Vec<_> = records.iter().map(|r| (r.player_name.clone(), r.week)).collect();
        let total = pairs.len();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), total);

        let chubb_w1: Vec<_> = records.iter().filter(|r| r.player_name == "Nick Chubb" && r.week == 1).collect();
        assert_eq!(chubb_w1.len(), 1);
        assert_eq!(chubb_w1[0].team, "Beta");
    }

    #[test]
    fn test_bye_week_has_no_opponent() {
        let weeks = vec![WeekBoxScores {
            week: 1,
            box_scores: vec![BoxScore {
                home: Some(side(3, "Gamma", vec![lineup_player("Solo Star", "WR", "WR", 9.0, 10.0)])),
                away: None,
                decided: true,
            }],
        }];
        let records = build_player_records(&weeks);
        assert_eq!(records.len(), 1);
        assert!(records[0].opponent.is_none());
        assert!(records[0].opponent_id.is_none());
    }

    #[test]
    fn test_in_week_range_is_inclusive() {
        let records = build_player_records(&two_team_season());
        assert_eq!(in_week_range(&records, Some((2, 2))).len(), 5);
        assert_eq!(in_week_range(&records, None).len(), 10);
        assert!(in_week_range(&records, Some((3, 5))).is_empty());
    }
}
