use thiserror::Error;

/// Rejections that callers are expected to match on (bad input, unknown names).
#[derive(Debug, Error)]
pub enum OutlookError {
    #[error("Platform '{given}' not supported! Must be one of: {}", supported.join(", "))]
    UnsupportedPlatform { given: String, supported: Vec<String> },

    #[error("{given} is not a valid team in this league! Must be one of: {}", valid.join(", "))]
    UnknownTeam { given: String, valid: Vec<String> },

    #[error("No weekly stats found for player '{0}'")]
    UnknownPlayer(String),

    #[error("League '{0}' is not registered")]
    UnknownLeague(String),

    #[error("League '{0}' is already registered")]
    DuplicateLeague(String),

    #[error("ESPN league {league_id} is already registered as '{name}'")]
    DuplicateLeagueId { league_id: i64, name: String },

    #[error("{0} is disabled for this league")]
    AnalysisDisabled(String),

    #[error("Invalid league name '{0}': use letters, digits, spaces, '-' or '_' (max 50)")]
    InvalidLeagueName(String),

    #[error("Week {week} is out of range (1..={max})")]
    InvalidWeek { week: u32, max: u32 },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Session not found")]
    NotFound,

    #[error("Cache is expired (cached at {cached_at})")]
    Expired { cached_at: chrono::DateTime<chrono::Utc> },

    #[error("Cached session is incompatible: {0}")]
    Incompatible(String),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}
