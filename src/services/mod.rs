pub mod espn_client;
pub mod fantasy_pros;
pub mod mvp;
pub mod outcomes;
pub mod overrides;
pub mod player_analysis;
pub mod player_scores;
pub mod power_rankings;
pub mod recommendations;
pub mod secrets;
pub mod session_cache;
pub mod snapshot;
pub mod summaries;
pub mod team_results;
