use std::env;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:../data/outlook.db";
pub const DEFAULT_CACHE_DIR: &str = "./cache";
pub const DEFAULT_CACHE_TIMEOUT_SECS: i64 = 300;
pub const DEFAULT_SECRETS_DIR: &str = "./secrets";
pub const DEFAULT_ESPN_BASE_URL: &str = "https://lm-api-reads.fantasy.espn.com/apis/v3/games/ffl";
pub const DEFAULT_FANTASY_PROS_BASE_URL: &str = "https://www.fantasypros.com/nfl/start";

/// Runtime settings, read from the environment (after `.env` has been loaded).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub cache_dir: PathBuf,
    pub cache_timeout_secs: i64,
    pub secrets_dir: PathBuf,
    pub overrides_path: Option<PathBuf>,
    pub espn_base_url: String,
    pub fantasy_pros_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            cache_timeout_secs: DEFAULT_CACHE_TIMEOUT_SECS,
            secrets_dir: PathBuf::from(DEFAULT_SECRETS_DIR),
            overrides_path: None,
            espn_base_url: DEFAULT_ESPN_BASE_URL.to_string(),
            fantasy_pros_base_url: DEFAULT_FANTASY_PROS_BASE_URL.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cache_timeout_secs = match lookup("CACHE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid CACHE_TIMEOUT_SECS '{}', using {}", raw, DEFAULT_CACHE_TIMEOUT_SECS);
                DEFAULT_CACHE_TIMEOUT_SECS
            }),
            None => defaults.cache_timeout_secs,
        };

        Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            cache_dir: lookup("CACHE_DIR").map(PathBuf::from).unwrap_or(defaults.cache_dir),
            cache_timeout_secs,
            secrets_dir: lookup("SECRETS_DIR").map(PathBuf::from).unwrap_or(defaults.secrets_dir),
            overrides_path: lookup("OVERRIDES_PATH").filter(|p| !p.is_empty()).map(PathBuf::from),
            espn_base_url: lookup("ESPN_BASE_URL").unwrap_or(defaults.espn_base_url),
            fantasy_pros_base_url: lookup("FANTASY_PROS_BASE_URL").unwrap_or(defaults.fantasy_pros_base_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.cache_timeout_secs, 300);
        assert!(config.overrides_path.is_none());
    }

    #[test]
    fn test_reads_overrides_and_falls_back_on_bad_timeout() {
        let vars: HashMap<&str, &str> = [
            ("CACHE_DIR", "/tmp/outlook-cache"),
            ("CACHE_TIMEOUT_SECS", "soon"),
            ("OVERRIDES_PATH", "rankings.csv"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/outlook-cache"));
        assert_eq!(config.cache_timeout_secs, DEFAULT_CACHE_TIMEOUT_SECS);
        assert_eq!(config.overrides_path, Some(PathBuf::from("rankings.csv")));
    }
}
