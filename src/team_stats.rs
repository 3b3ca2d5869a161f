use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Named numeric statistics keyed by team identifier.
///
/// An optional season tag travels with the table for labeling; lookups are by
/// team only. The table is treated as a read-only shared input by the
/// simulator, so all draw workers can read it concurrently.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TeamStatsTable {
    season: Option<i32>,
    rows: HashMap<String, HashMap<String, f64>>,
}

impl TeamStatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_season(season: i32) -> Self {
        TeamStatsTable {
            season: Some(season),
            rows: HashMap::new(),
        }
    }

    pub fn season(&self) -> Option<i32> {
        self.season
    }

    /// Insert (or extend) a team's statistics.
    pub fn insert(
        &mut self,
        team: impl Into<String>,
        stats: impl IntoIterator<Item = (String, f64)>,
    ) {
        self.rows.entry(team.into()).or_default().extend(stats);
    }

    pub fn set_stat(&mut self, team: impl Into<String>, stat: impl Into<String>, value: f64) {
        self.rows
            .entry(team.into())
            .or_default()
            .insert(stat.into(), value);
    }

    /// A team's statistics. A missing team is fatal; the caller cannot
    /// compute features without fabricating data.
    pub fn get(&self, team: &str) -> Result<&HashMap<String, f64>> {
        self.rows
            .get(team)
            .ok_or_else(|| SimError::UnknownTeam(team.to_string()))
    }

    pub fn contains(&self, team: &str) -> bool {
        self.rows.contains_key(team)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<(String, HashMap<String, f64>)> for TeamStatsTable {
    fn from_iter<I: IntoIterator<Item = (String, HashMap<String, f64>)>>(iter: I) -> Self {
        TeamStatsTable {
            season: None,
            rows: iter.into_iter().collect(),
        }
    }
}
