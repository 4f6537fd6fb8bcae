use std::future::Future;

use crate::models::{PlayerRecommendations, Recommendation, RecommendationRow, RosterPlayer};
use crate::services::fantasy_pros::StartSitAdvice;

fn has_projection(points: Option<f64>) -> bool {
    points.is_some_and(|p| p != 0.0)
}

fn show(points: Option<f64>) -> String {
    points.map_or_else(|| "none".to_string(), |p| p.to_string())
}

/// Signals 1–3: position rank, weekly projection, season projection.
pub fn evaluate_swap(player: &RosterPlayer, candidate: &RosterPlayer) -> Recommendation {
    let mut for_reasons = Vec::new();
    let mut against_reasons = Vec::new();

    // ── Position rank (lower is better, 0 means unranked) ──
    match (player.position_rank, candidate.position_rank) {
        (0, 0) => against_reasons.push(format!(
            "Neither {} nor {} has a position rank",
            candidate.name, player.name
        )),
        (player_rank, candidate_rank) => {
            let candidate_rank = if candidate_rank == 0 { player_rank + 1 } else { candidate_rank };
            let player_rank = if player_rank == 0 { candidate_rank + 1 } else { player_rank };

            if candidate_rank < player_rank {
                for_reasons.push(format!(
                    "{} has a higher position rank ({}) than {} ({})",
                    candidate.name, candidate_rank, player.name, player_rank
                ));
            } else {
                against_reasons.push(format!(
                    "{} has a lower position rank ({}) than {} ({})",
                    candidate.name, candidate_rank, player.name, player_rank
                ));
            }
        }
    }

    // ── Weekly projection ──
    if !has_projection(candidate.projected_points) || !has_projection(player.projected_points) {
        against_reasons.push(format!(
            "Neither {} nor {} are projected to score any points this week",
            candidate.name, player.name
        ));
    } else if candidate.projected_points > player.projected_points {
        for_reasons.push(format!(
            "{} is projected to score more points this week ({}) than {} ({})",
            candidate.name,
            show(candidate.projected_points),
            player.name,
            show(player.projected_points)
        ));
    } else {
        against_reasons.push(format!(
            "{} is projected to score fewer points this week ({}) than {} ({})",
            candidate.name,
            show(candidate.projected_points),
            player.name,
            show(player.projected_points)
        ));
    }

    // ── Season projection ──
    let candidate_season = candidate.season_projected.unwrap_or(0.0);
    let player_season = player.season_projected.unwrap_or(0.0);
    if candidate_season > player_season {
        for_reasons.push(format!(
            "{} is projected to score more points this year ({}) than {} ({})",
            candidate.name, candidate_season, player.name, player_season
        ));
    } else {
        against_reasons.push(format!(
            "{} is projected to score fewer points this year ({}) than {} ({})",
            candidate.name, candidate_season, player.name, player_season
        ));
    }

    Recommendation {
        player: player.name.clone(),
        candidate: candidate.name.clone(),
        for_reasons,
        against_reasons,
    }
}

/// Signal 4. Missing advice leaves the recommendation untouched.
pub fn apply_start_sit(recommendation: &mut Recommendation, advice: Option<&StartSitAdvice>) {
    let Some(advice) = advice else { return };

    if advice.candidate_pct > advice.player_pct {
        recommendation.for_reasons.push(format!(
            "Fantasy pros would start {} ({}%) over {} ({}%) ({})",
            recommendation.candidate, advice.candidate_pct, recommendation.player, advice.player_pct, advice.url
        ));
    } else {
        recommendation.against_reasons.push(format!(
            "Fantasy pros would start {} ({}%) over {} ({}%) ({})",
            recommendation.player, advice.player_pct, recommendation.candidate, advice.candidate_pct, advice.url
        ));
    }
}

/// Free-agent swaps for a roster, grouped by roster player in roster order.
///
/// `start_sit(candidate, player)` is awaited only for pairs that survive the
/// first three signals. Players projected for nothing this week are left alone.
pub async fn recommend_swaps<F, Fut>(
    roster: &[RosterPlayer],
    free_agents: &[RosterPlayer],
    mut start_sit: F,
) -> Vec<PlayerRecommendations>
where
    F: FnMut(String, String) -> Fut,
    Fut: Future<Output = Option<StartSitAdvice>>,
{
    let mut grouped = Vec::new();

    for player in roster.iter().filter(|p| has_projection(p.projected_points)) {
        let mut swaps = Vec::new();

        for candidate in free_agents.iter().filter(|c| c.position == player.position) {
            let mut recommendation = evaluate_swap(player, candidate);
            if !recommendation.against_reasons.is_empty() {
                continue;
            }

            let advice = start_sit(candidate.name.clone(), player.name.clone()).await;
            apply_start_sit(&mut recommendation, advice.as_ref());

            if recommendation.against_reasons.is_empty() {
                swaps.push(recommendation);
            }
        }

        if !swaps.is_empty() {
            tracing::info!("{} swap(s) suggested for {}", swaps.len(), player.name);
            grouped.push(PlayerRecommendations {
                player: player.name.clone(),
                swaps,
            });
        }
    }

    grouped
}

pub fn recommendations_table(recommendations: &[PlayerRecommendations]) -> Vec<RecommendationRow> {
    recommendations
        .iter()
        .flat_map(|group| {
            group.swaps.iter().map(move |swap| RecommendationRow {
                index: format!("{}-{}", group.player, swap.candidate),
                recommendation: format!("Swap {} for {}.", group.player, swap.candidate),
                reasons: swap.for_reasons.join(", "),
            })
        })
        .collect()
}
