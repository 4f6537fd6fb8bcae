use std::collections::HashMap;

use crate::models::{GameResult, LuckLabel, LuckRow, TeamLuck, TeamOutcome, TeamWeekRecord, UnexpectedSummary};
use crate::services::team_results::TeamRecord;

/// Projected vs actual result for each of the team's decided weeks. Byes are skipped.
pub fn classify_team_outcomes(team_weeks: &[TeamWeekRecord], team: &str) -> Vec<TeamOutcome> {
    team_weeks
        .iter()
        .filter(|tw| tw.team == team && tw.opponent_id.is_some() && tw.decided)
        .map(|tw| TeamOutcome {
            week: tw.week,
            points: tw.points,
            projected_points: tw.projected_points,
            opponent: tw.opponent.clone(),
            opponent_points: tw.opponent_points,
            opponent_projected_points: tw.opponent_projected_points,
            opponent_projection_diff: tw.opponent_projection_diff,
            projected_result: GameResult::from_points(tw.projected_points, tw.opponent_projected_points),
            result: GameResult::from_points(tw.points, tw.opponent_points),
        })
        .collect()
}

pub fn summarize_unexpected(team: &str, outcomes: &[TeamOutcome], record: &TeamRecord) -> UnexpectedSummary {
    let unexpected: Vec<&TeamOutcome> = outcomes.iter().filter(|o| o.is_unexpected()).collect();
    let unexpected_wins = unexpected.iter().filter(|o| o.result == GameResult::Win).count() as u32;
    let unexpected_losses = unexpected.iter().filter(|o| o.result == GameResult::Loss).count() as u32;

    let favored = if unexpected_wins > unexpected_losses {
        "helped"
    } else if unexpected_wins < unexpected_losses {
        "hurt"
    } else {
        "neither helped nor hurt"
    };

    let games = record.wins + record.losses + record.ties;
    let narrative = format!(
        "{} has a record of {} wins and {} losses. {} of these {} outcomes were unexpected \
         (the actual result differed from the projected one), with {} unexpected wins and {} \
         unexpected losses. This team has generally been {} by unexpected outcomes this season.",
        team,
        record.wins,
        record.losses,
        unexpected.len(),
        games,
        unexpected_wins,
        unexpected_losses,
        favored
    );

    UnexpectedSummary {
        team: team.to_string(),
        wins: record.wins,
        losses: record.losses,
        unexpected_outcomes: unexpected.len() as u32,
        unexpected_wins,
        unexpected_losses,
        favored: favored.to_string(),
        narrative,
    }
}

// ── Luck ─────────────────────────────────────────────────────

/// One row per decided team-week, against that week's league average starter score.
pub fn build_luck_table(team_weeks: &[TeamWeekRecord]) -> Vec<LuckRow> {
    let decided: Vec<&TeamWeekRecord> = team_weeks.iter().filter(|tw| tw.decided).collect();

    let mut weekly: HashMap<u32, (f64, u32)> = HashMap::new();
    for tw in &decided {
        let entry = weekly.entry(tw.week).or_insert((0.0, 0));
        entry.0 += tw.points;
        entry.1 += 1;
    }

    decided
        .iter()
        .filter_map(|tw| {
            let opponent = tw.opponent.clone()?;
            let league_points = weekly.get(&tw.week).map_or(0.0, |(total, n)| total / *n as f64);

            Some(LuckRow {
                week: tw.week,
                team: tw.team.clone(),
                opponent,
                points: tw.points,
                opponent_points: tw.opponent_points,
                won: tw.won,
                league_points,
                lucky_win: tw.won && tw.points < league_points,
                unlucky_loss: !tw.won && tw.points > league_points,
            })
        })
        .collect()
}

pub fn team_luck(luck: &[LuckRow], team: &str) -> TeamLuck {
    let rows = luck.iter().filter(|r| r.team == team);
    let (lucky_wins, unlucky_losses) = rows.fold((0u32, 0u32), |(l, u), r| {
        (l + r.lucky_win as u32, u + r.unlucky_loss as u32)
    });

    let label = match lucky_wins.cmp(&unlucky_losses) {
        std::cmp::Ordering::Greater => LuckLabel::Lucky,
        std::cmp::Ordering::Less => LuckLabel::Unlucky,
        std::cmp::Ordering::Equal => LuckLabel::Neither,
    };

    TeamLuck {
        team: team.to_string(),
        lucky_wins,
        unlucky_losses,
        label,
    }
}
