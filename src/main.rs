mod api;
mod cli;
mod config;
mod db;
mod error;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::Analysis;

#[derive(Parser)]
#[command(name = "outlook")]
#[command(about = "Fantasy football league analytics: power rankings, luck, MVPs and waiver advice")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Initialize the database
    InitDb,
    /// Register a league under a short name
    AddLeague {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        league_id: i64,
        /// Name of the credential bundle in the secrets directory
        #[arg(short, long, default_value = "fantasy-football-secrets")]
        secret_name: String,
        #[arg(long)]
        platform: Option<String>,
        /// Analyses to switch off, e.g. --disable mvp_analysis,free_agent_recs
        #[arg(long = "disable", value_delimiter = ',')]
        disable: Vec<Analysis>,
    },
    /// List registered leagues
    Leagues,
    /// Power rankings and league summaries
    Snapshot {
        #[arg(short, long)]
        league: String,
        #[arg(short, long)]
        year: i32,
        #[arg(short, long)]
        week: Option<u32>,
        /// Write each table as CSV into this directory
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Outcomes, MVP and luck for one team
    Team {
        #[arg(short, long)]
        league: String,
        #[arg(short, long)]
        year: i32,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        week: Option<u32>,
    },
    /// Free-agent swap suggestions for one team
    Recommend {
        #[arg(short, long)]
        league: String,
        #[arg(short, long)]
        year: i32,
        #[arg(short, long)]
        team: String,
    },
    /// Week-by-week analysis of one player
    Player {
        #[arg(short, long)]
        league: String,
        #[arg(short, long)]
        year: i32,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        week: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port }) => {
            tracing::info!("Starting Outlook API server on port {}", port);
            api::serve(config, port).await?;
        }
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            db::init_database(&config.database_url).await?;
        }
        Some(Commands::AddLeague {
            name,
            league_id,
            secret_name,
            platform,
            disable,
        }) => {
            cli::add_league(&config, &name, league_id, &secret_name, platform, &disable).await?;
        }
        Some(Commands::Leagues) => {
            cli::list_leagues(&config).await?;
        }
        Some(Commands::Snapshot {
            league,
            year,
            week,
            export,
        }) => {
            tracing::info!("Building snapshot for {} ({})", league, year);
            cli::show_snapshot(&config, &league, year, week, export).await?;
        }
        Some(Commands::Team {
            league,
            year,
            name,
            week,
        }) => {
            tracing::info!("Querying team: {}", name);
            cli::show_team(&config, &league, year, &name, week).await?;
        }
        Some(Commands::Recommend { league, year, team }) => {
            cli::recommend(&config, &league, year, &team).await?;
        }
        Some(Commands::Player {
            league,
            year,
            name,
            week,
        }) => {
            tracing::info!("Querying player: {}", name);
            cli::show_player(&config, &league, year, &name, week).await?;
        }
        None => {
            // Default to serving
            tracing::info!("Starting Outlook API server on port 3000");
            api::serve(config, 3000).await?;
        }
    }

    Ok(())
}
