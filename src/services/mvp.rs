use crate::models::{MvpAnalysis, MvpPoint, PlayerWeekRecord};
use crate::utils::{desc, round2, share_pct};

/// A team is top-heavy when its best three players carry more than this share of its points.
const TOP_HEAVY_PCT: f64 = 50.0;

pub fn build_mvp_analysis(records: &[PlayerWeekRecord], team: &str, team_points: f64) -> MvpAnalysis {
    let mut series: Vec<MvpPoint> = records
        .iter()
        .filter(|r| r.team == team)
        .map(|r| MvpPoint {
            player_name: r.player_name.clone(),
            week: r.week,
            cumulative_score: r.cumulative_score,
        })
        .collect();
    series.sort_by(|a, b| desc(a.cumulative_score, b.cumulative_score));

    // series is sorted, so each player's first appearance is their season high
    let mut leaders: Vec<&MvpPoint> = Vec::new();
    for point in &series {
        if leaders.len() == 3 {
            break;
        }
        if !leaders.iter().any(|l| l.player_name == point.player_name) {
            leaders.push(point);
        }
    }

    let mvp = leaders.first().map(|p| p.player_name.clone());
    let mvp_points = leaders.first().map_or(0.0, |p| p.cumulative_score);
    let top_three_points: f64 = leaders.iter().map(|p| p.cumulative_score).sum();

    let mvp_share_pct = share_pct(mvp_points, team_points);
    let top_three_share_pct = share_pct(top_three_points, team_points);
    let top_heavy = top_three_share_pct > TOP_HEAVY_PCT;

    let narrative = match &mvp {
        Some(name) => format!(
            "{} is the MVP of {} with {} points scored, around {}% of the team's {} points. \
             Together the top 3 players scored {} points, {}% of the team's points, \
             indicating a {} team overall.",
            name,
            team,
            round2(mvp_points),
            mvp_share_pct,
            round2(team_points),
            round2(top_three_points),
            top_three_share_pct,
            if top_heavy { "top-heavy" } else { "balanced" }
        ),
        None => format!("{} has no scoring players yet.", team),
    };

    MvpAnalysis {
        team: team.to_string(),
        mvp,
        mvp_points,
        team_points,
        mvp_share_pct,
        top_three_points,
        top_three_share_pct,
        top_heavy,
        narrative,
        series,
    }
}
