use statrs::statistics::Statistics;
use std::collections::HashMap;

use crate::error::OutlookError;
use crate::models::{PlayerAnalysis, PlayerWeekComparison, PlayerWeekRecord};

#[derive(Default, Clone, Copy)]
struct Totals {
    points: f64,
    projected_points: f64,
    projection_diff: f64,
}

impl Totals {
    fn add(&mut self, r: &PlayerWeekRecord) {
        self.points += r.points;
        self.projected_points += r.projected_points;
        self.projection_diff += r.projection_diff;
    }
}

fn zscore(value: f64, population: &[f64]) -> f64 {
    let mean = population.mean();
    let std_dev = population.population_std_dev();
    if population.is_empty() || std_dev == 0.0 || std_dev.is_nan() {
        return 0.0;
    }
    (value - mean) / std_dev
}

/// Week-by-week comparison against the position average, plus season z-scores
/// across every player in the league.
pub fn build_player_analysis(records: &[PlayerWeekRecord], player: &str) -> Result<PlayerAnalysis, OutlookError> {
    let player_rows: Vec<&PlayerWeekRecord> = records.iter().filter(|r| r.player_name == player).collect();
    let position = player_rows
        .first()
        .map(|r| r.position.clone())
        .ok_or_else(|| OutlookError::UnknownPlayer(player.to_string()))?;

    // (sum, count) per week for the player's position
    let mut weekly: HashMap<u32, (Totals, u32)> = HashMap::new();
    for r in records.iter().filter(|r| r.position == position) {
        let entry = weekly.entry(r.week).or_default();
        entry.0.add(r);
        entry.1 += 1;
    }

    let mut weeks: Vec<PlayerWeekComparison> = player_rows
        .iter()
        .map(|r| {
            let (sum, n) = weekly.get(&r.week).copied().unwrap_or_default();
            let n = n.max(1) as f64;
            PlayerWeekComparison {
                week: r.week,
                points: r.points,
                projected_points: r.projected_points,
                projection_diff: r.projection_diff,
                league_average_points: sum.points / n,
                league_average_projected: sum.projected_points / n,
                league_average_projection_diff: sum.projection_diff / n,
            }
        })
        .collect();
    weeks.sort_by_key(|w| w.week);

    // season totals per (player, position)
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut totals: Vec<Totals> = Vec::new();
    for r in records {
        let i = *index
            .entry((r.player_name.as_str(), r.position.as_str()))
            .or_insert_with(|| {
                totals.push(Totals::default());
                totals.len() - 1
            });
        totals[i].add(r);
    }

    let mine = index
        .get(&(player, position.as_str()))
        .map(|&i| totals[i])
        .unwrap_or_default();

    let column = |f: fn(&Totals) -> f64| totals.iter().map(f).collect::<Vec<f64>>();
    let points = column(|t| t.points);
    let projected = column(|t| t.projected_points);
    let diffs = column(|t| t.projection_diff);

    Ok(PlayerAnalysis {
        player: player.to_string(),
        position,
        weeks,
        points_z: zscore(mine.points, &points),
        projected_points_z: zscore(mine.projected_points, &projected),
        projection_diff_z: zscore(mine.projection_diff, &diffs),
    })
}
