use anyhow::Result;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// A hand-written ranking and take for one team-week, from the power-rankings sheet export.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualOverride {
    pub team_id: u32,
    pub team: String,
    pub year: i32,
    pub week: u32,
    pub ranking: Option<u32>,
    pub analysis: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverrideRow {
    #[serde(rename = "Team ID")]
    team_id: String,
    #[serde(rename = "Team", default)]
    team: String,
    #[serde(rename = "Year")]
    year: String,
    #[serde(rename = "Week")]
    week: String,
    #[serde(rename = "Ranking", default)]
    ranking: String,
    #[serde(rename = "Analysis", default)]
    analysis: String,
}

impl OverrideRow {
    fn into_override(self) -> Option<ManualOverride> {
        Some(ManualOverride {
            team_id: self.team_id.trim().parse().ok()?,
            team: self.team.trim().to_string(),
            year: self.year.trim().parse().ok()?,
            week: self.week.trim().parse().ok()?,
            ranking: self.ranking.trim().parse().ok(),
            analysis: Some(self.analysis.trim().to_string()).filter(|a| !a.is_empty()),
        })
    }
}

pub fn parse_overrides<R: Read>(reader: R) -> Result<Vec<ManualOverride>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut overrides = Vec::new();

    for row in csv_reader.deserialize::<OverrideRow>() {
        match row?.into_override() {
            Some(o) => overrides.push(o),
            None => tracing::warn!("Skipping override row with unparsable team id/year/week"),
        }
    }

    Ok(overrides)
}

/// Load the sheet export; a missing file means no overrides.
pub fn load_overrides(path: &Path) -> Result<Vec<ManualOverride>> {
    match std::fs::File::open(path) {
        Ok(file) => {
            let overrides = parse_overrides(file)?;
            tracing::info!("Loaded {} manual power-ranking overrides from {}", overrides.len(), path.display());
            Ok(overrides)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No overrides file at {}", path.display());
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn lookup(overrides: &[ManualOverride], team_id: u32, year: i32, week: u32) -> Option<&ManualOverride> {
    overrides
        .iter()
        .find(|o| o.team_id == team_id && o.year == year && o.week == week)
}
