use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;

use crate::error::CacheError;
use crate::models::LeagueSnapshot;

/// Bumped whenever `LeagueSnapshot` changes shape; older files are treated as misses.
pub const SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSession {
    pub schema_version: u32,
    pub cached_at: DateTime<Utc>,
    pub snapshot: LeagueSnapshot,
}

/// On-disk JSON cache of computed snapshots, one file per (league, year, week).
pub struct SessionCache {
    dir: PathBuf,
    timeout: Duration,
}

impl SessionCache {
    pub fn new(dir: impl Into<PathBuf>, timeout_secs: i64) -> Self {
        Self {
            dir: dir.into(),
            timeout: Duration::seconds(timeout_secs),
        }
    }

    /// `{dir}/{league_id}_{year}_{week}.json`; no week means the league's current week.
    pub fn path(&self, league_id: i64, year: i32, week: Option<u32>) -> PathBuf {
        let week = week.map_or_else(|| "current".to_string(), |w| w.to_string());
        self.dir.join(format!("{}_{}_{}.json", league_id, year, week))
    }

    pub async fn load(&self, league_id: i64, year: i32, week: Option<u32>) -> Result<LeagueSnapshot, CacheError> {
        self.load_as_of(league_id, year, week, Utc::now()).await
    }

    pub async fn load_as_of(
        &self,
        league_id: i64,
        year: i32,
        week: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<LeagueSnapshot, CacheError> {
        let path = self.path(league_id, year, week);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(CacheError::NotFound),
            Err(e) => return Err(e.into()),
        };

        let session: CachedSession =
            serde_json::from_str(&raw).map_err(|e| CacheError::Incompatible(e.to_string()))?;

        if session.schema_version != SCHEMA_VERSION {
            return Err(CacheError::Incompatible(format!(
                "schema version {} (expected {})",
                session.schema_version, SCHEMA_VERSION
            )));
        }

        if now > session.cached_at + self.timeout {
            return Err(CacheError::Expired {
                cached_at: session.cached_at,
            });
        }

        Ok(session.snapshot)
    }

    pub async fn store(&self, snapshot: &LeagueSnapshot, week: Option<u32>) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let session = CachedSession {
            schema_version: SCHEMA_VERSION,
            cached_at: Utc::now(),
            snapshot: snapshot.clone(),
        };
        let path = self.path(snapshot.league_id, snapshot.year, week);
        tokio::fs::write(&path, serde_json::to_vec(&session)?).await?;

        tracing::debug!("Cached snapshot at {}", path.display());
        Ok(path)
    }

    /// Serve from cache when fresh; otherwise run `compute` and cache its result.
    /// Cache problems only ever cost a recompute.
    pub async fn get_or_compute<F, Fut>(
        &self,
        league_id: i64,
        year: i32,
        week: Option<u32>,
        compute: F,
    ) -> Result<LeagueSnapshot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<LeagueSnapshot>>,
    {
        match self.load(league_id, year, week).await {
            Ok(snapshot) => {
                tracing::debug!("Cache hit for league {} ({}, week {:?})", league_id, year, week);
                return Ok(snapshot);
            }
            Err(e) => tracing::debug!("Cache miss for league {} ({}): {}", league_id, year, e),
        }

        let snapshot = compute().await?;
        if let Err(e) = self.store(&snapshot, week).await {
            tracing::warn!("Failed to cache snapshot for league {}: {}", league_id, e);
        }
        Ok(snapshot)
    }
}
