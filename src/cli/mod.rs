use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db::{create_pool, get_all_leagues, init_database_with_pool, register_league, require_league};
use crate::models::{
    Analysis, EnabledAnalyses, LeagueSnapshot, NewLeagueRequest, RegisteredLeague, TopPositionsRow, POSITIONS,
};
use crate::services::player_analysis::build_player_analysis;
use crate::services::recommendations::recommendations_table;
use crate::services::snapshot::{load_snapshot, recommend_for_team, team_report};

pub async fn add_league(
    config: &Config,
    name: &str,
    league_id: i64,
    secret_name: &str,
    platform: Option<String>,
    disabled: &[Analysis],
) -> Result<()> {
    let pool = create_pool(&config.database_url).await?;
    init_database_with_pool(&pool).await?;

    let league = register_league(
        &pool,
        NewLeagueRequest {
            name: name.to_string(),
            platform,
            league_id,
            secret_name: secret_name.to_string(),
            analyses: EnabledAnalyses::with_disabled(disabled),
        },
    )
    .await?;

    println!("✅ Registered '{}' ({} league {})", league.name, league.platform, league.league_id);
    if !disabled.is_empty() {
        println!("   Disabled: {}", display_analyses(&league.analyses.disabled()));
    }
    Ok(())
}

pub async fn list_leagues(config: &Config) -> Result<()> {
    let pool = create_pool(&config.database_url).await?;
    init_database_with_pool(&pool).await?;

    let leagues = get_all_leagues(&pool).await?;
    if leagues.is_empty() {
        println!("📭 No leagues registered. Add one with: outlook add-league --name <name> --league-id <id>");
        return Ok(());
    }

    println!("📋 {} registered league(s):\n", leagues.len());
    for league in leagues {
        println!(
            "   • {} ({} #{}, secrets: {})",
            league.name, league.platform, league.league_id, league.secret_name
        );
        let disabled = league.analyses.disabled();
        if !disabled.is_empty() {
            println!("     disabled: {}", display_analyses(&disabled));
        }
    }
    Ok(())
}

fn display_analyses(analyses: &[Analysis]) -> String {
    analyses.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(", ")
}

async fn registered_league(config: &Config, league_name: &str) -> Result<RegisteredLeague> {
    let pool = create_pool(&config.database_url).await?;
    require_league(&pool, league_name).await
}

pub async fn show_snapshot(
    config: &Config,
    league_name: &str,
    year: i32,
    week: Option<u32>,
    export: Option<PathBuf>,
) -> Result<()> {
    let league = registered_league(config, league_name).await?;
    let snapshot = load_snapshot(config, &league, year, week).await?;

    println!("🏈 {} ({}), through week {}\n", snapshot.league_name, snapshot.year, snapshot.week);

    println!("📊 Power rankings:");
    note_if_disabled(&league, Analysis::PowerRankings);
    for row in &snapshot.power_rankings {
        println!(
            "   {:>2}. {:<28} {:>6}  PF {:>5}  PA {:>5}  {:>5}  (score {}, standing {})",
            row.power_ranking,
            row.team,
            row.record,
            row.points_scored,
            row.points_allowed,
            row.point_differential,
            row.power_ranking_score,
            row.league_ranking
        );
        if let Some(analysis) = &row.manual_analysis {
            println!("       📝 {}", analysis);
        }
    }

    println!("\n🎯 Team summary:");
    note_if_disabled(&league, Analysis::TeamLevelStats);
    for row in &snapshot.team_summary {
        println!(
            "   {}. under-projected: {} | over-projected: {} | most bench: {} | least bench: {}",
            row.rank, row.most_under_projected, row.most_over_projected, row.most_points_on_bench, row.least_points_on_bench
        );
    }

    println!("\n⭐ Player summary:");
    note_if_disabled(&league, Analysis::PlayerLevelStats);
    for row in &snapshot.player_summary {
        println!(
            "   {:>2}. {} | beat projection: {} | missed projection: {}",
            row.rank, row.most_points, row.most_under_projected, row.most_over_projected
        );
    }

    println!("\n🏆 Top performers by position:");
    note_if_disabled(&league, Analysis::PlayerPositionStats);
    for row in &snapshot.top_positions {
        let cells: Vec<String> = row
            .leaders
            .iter()
            .map(|l| format!("{}: {}", l.position, l.leader.as_deref().unwrap_or("-")))
            .collect();
        println!("   {}. {}", row.rank, cells.join(" | "));
    }

    if let Some(dir) = export {
        export_tables(&snapshot, &dir)?;
        println!("\n💾 Tables exported to {}", dir.display());
    }

    Ok(())
}

fn note_if_disabled(league: &RegisteredLeague, analysis: Analysis) {
    if !league.analyses.is_enabled(analysis) {
        println!("   🚫 {} is disabled for {}", analysis, league.name);
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_top_positions(path: &Path, rows: &[TopPositionsRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut headers = vec!["Index"];
    headers.extend(POSITIONS);
    writer.write_record(&headers)?;

    for row in rows {
        let mut record = vec![row.rank.to_string()];
        record.extend(row.leaders.iter().map(|l| l.leader.clone().unwrap_or_default()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// One CSV per table, named after the league, year and week.
pub fn export_tables(snapshot: &LeagueSnapshot, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let prefix = format!("{}_{}_{}", snapshot.league_id, snapshot.year, snapshot.week);

    write_rows(&dir.join(format!("{}_power_rankings.csv", prefix)), &snapshot.power_rankings)?;
    write_rows(&dir.join(format!("{}_team_summary.csv", prefix)), &snapshot.team_summary)?;
    write_rows(&dir.join(format!("{}_player_summary.csv", prefix)), &snapshot.player_summary)?;
    write_top_positions(&dir.join(format!("{}_top_positions.csv", prefix)), &snapshot.top_positions)?;

    tracing::info!("Exported 4 tables for league {} to {}", snapshot.league_id, dir.display());
    Ok(())
}

pub async fn show_team(config: &Config, league_name: &str, year: i32, team: &str, week: Option<u32>) -> Result<()> {
    let league = registered_league(config, league_name).await?;
    let snapshot = load_snapshot(config, &league, year, week).await?;
    let report = team_report(&snapshot, team, &league.analyses)?;

    println!("🔍 {} ({}) through week {}\n", report.team, report.record, snapshot.week);

    if let Some(unexpected) = &report.unexpected {
        println!("📈 Projected vs actual:");
        for o in &report.outcomes {
            let flag = if o.is_unexpected() { " ⚠️ unexpected" } else { "" };
            println!(
                "   Week {:>2} vs {:<24} {:>6.2} - {:<6.2} projected {} / actual {}{}",
                o.week,
                o.opponent.as_deref().unwrap_or("bye"),
                o.points,
                o.opponent_points,
                o.projected_result,
                o.result,
                flag
            );
        }
        println!("\n   {}", unexpected.narrative);
    }

    if let Some(mvp) = &report.mvp {
        println!("\n⭐ MVP analysis:\n   {}", mvp.narrative);
    }

    if let Some(summary) = &report.luck_summary {
        println!("\n🍀 Luck ({} lucky wins, {} unlucky losses):", summary.lucky_wins, summary.unlucky_losses);
        for row in report.luck.iter().filter(|r| r.lucky_win || r.unlucky_loss) {
            let kind = if row.lucky_win { "lucky win" } else { "unlucky loss" };
            println!(
                "   Week {:>2}: {} vs {} ({:.2} - {:.2}, league average {:.2})",
                row.week, kind, row.opponent, row.points, row.opponent_points, row.league_points
            );
        }
    }

    Ok(())
}

pub async fn recommend(config: &Config, league_name: &str, year: i32, team: &str) -> Result<()> {
    let league = registered_league(config, league_name).await?;

    println!("🔄 Looking for free-agent upgrades for {}...", team);
    let recommendations = recommend_for_team(config, &league, year, team).await?;
    let rows = recommendations_table(&recommendations);

    if rows.is_empty() {
        println!("✅ No swaps recommended this week.");
        return Ok(());
    }

    println!("\n💡 {} suggested swap(s):", rows.len());
    for row in rows {
        println!("   • {}\n     {}", row.recommendation, row.reasons);
    }
    Ok(())
}

pub async fn show_player(config: &Config, league_name: &str, year: i32, player: &str, week: Option<u32>) -> Result<()> {
    let league = registered_league(config, league_name).await?;
    league.analyses.require(Analysis::PlayerLevelStats)?;
    let snapshot = load_snapshot(config, &league, year, week).await?;
    let analysis = build_player_analysis(&snapshot.players, player)?;

    println!("🔍 {} ({})\n", analysis.player, analysis.position);
    println!(
        "   Season z-scores: points {:.2} | projected {:.2} | vs projection {:.2}\n",
        analysis.points_z, analysis.projected_points_z, analysis.projection_diff_z
    );
    for w in &analysis.weeks {
        println!(
            "   Week {:>2}: {:>6.2} pts (proj {:>6.2})  {} average {:>6.2} (proj {:>6.2})",
            w.week, w.points, w.projected_points, analysis.position, w.league_average_points, w.league_average_projected
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeagueInfo;
    use crate::services::player_scores::fixtures::two_team_season;
    use crate::services::snapshot::assemble_snapshot;

    #[test]
    fn test_export_tables_writes_csvs() {
        let league = LeagueInfo {
            name: "Test".to_string(),
            current_week: 2,
            teams: vec![],
        };
        let snapshot = assemble_snapshot(7, 2020, 2, &league, &two_team_season(), &[]);

        let dir = std::env::temp_dir().join(format!("outlook-export-{}", uuid::Uuid::new_v4()));
        export_tables(&snapshot, &dir).unwrap();

        let top = std::fs::read_to_string(dir.join("7_2020_2_top_positions.csv")).unwrap();
        let mut lines = top.lines();
        assert_eq!(lines.next(), Some("Index,QB,RB,TE,WR,D/ST,K"));
        assert!(lines.next().unwrap().starts_with("1,Lamar Jackson (48.00)"));

        assert!(dir.join("7_2020_2_team_summary.csv").exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
