use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DIFF_PREFIX, LOCATION_NEUTRAL, LOCATION_ZEROED, OPPONENT_PREFIX, RATIO_PREFIX, TEAM_PREFIX,
};
use crate::error::{Result, SimError};

/// One side of a potential or actual matchup.
///
/// Holds identifying fields plus named numeric feature values. Rows are
/// assembled externally (or by the simulator for each simulated game) and are
/// read-only once scoring starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeatureRow {
    pub team: String,
    pub opponent: Option<String>,
    /// Known outcome, when scoring historical games.
    pub win: Option<bool>,
    values: HashMap<String, f64>,
}

impl FeatureRow {
    pub fn new(team: impl Into<String>) -> Self {
        FeatureRow {
            team: team.into(),
            opponent: None,
            win: None,
            values: HashMap::new(),
        }
    }

    pub fn with_opponent(mut self, opponent: impl Into<String>) -> Self {
        self.opponent = Some(opponent.into());
        self
    }

    pub fn with_outcome(mut self, win: bool) -> Self {
        self.win = Some(win);
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    /// Set a named feature value.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Value of a named feature. A missing feature is a fatal lookup error,
    /// never a silent default.
    pub fn feature(&self, name: &str) -> Result<f64> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| SimError::MissingFeature {
                team: self.team.clone(),
                feature: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Assemble the scoring row for a simulated game between `team` and
/// `opponent`.
///
/// Every statistic is copied under the `team_`/`opponent_` prefixes, and a
/// difference and ratio column is derived per statistic. Venue indicators
/// named in `features` are pinned to a neutral site: `location_Neutral` = 1,
/// home/away-style indicators = 0.
///
/// A statistic present on one side but not the other is a lookup error. A
/// non-finite statistic is rejected outright. A zero opponent statistic is
/// rejected only when `features` actually asks for the ratio over it;
/// otherwise the ratio column is simply not derived.
pub fn matchup_row(
    team: &str,
    opponent: &str,
    team_stats: &HashMap<String, f64>,
    opponent_stats: &HashMap<String, f64>,
    features: &[String],
) -> Result<FeatureRow> {
    let mut row = FeatureRow::new(team).with_opponent(opponent);

    for (stat, &team_value) in team_stats {
        let opponent_value = match opponent_stats.get(stat) {
            Some(&v) => v,
            None => {
                return Err(SimError::MissingStatistic {
                    stat: stat.clone(),
                    team: opponent.to_string(),
                })
            }
        };
        if !team_value.is_finite() || !opponent_value.is_finite() {
            return Err(SimError::NonFiniteFeature {
                column: stat.clone(),
                team: team.to_string(),
                opponent: opponent.to_string(),
            });
        }

        row.set(format!("{}{}", TEAM_PREFIX, stat), team_value);
        row.set(format!("{}{}", OPPONENT_PREFIX, stat), opponent_value);
        row.set(
            format!("{}{}", DIFF_PREFIX, stat),
            team_value - opponent_value,
        );

        let ratio_column = format!("{}{}", RATIO_PREFIX, stat);
        if opponent_value == 0.0 {
            if features.iter().any(|f| *f == ratio_column) {
                return Err(SimError::ZeroDenominator {
                    stat: stat.clone(),
                    opponent: opponent.to_string(),
                });
            }
            continue;
        }
        let ratio = team_value / opponent_value;
        if !ratio.is_finite() {
            return Err(SimError::NonFiniteFeature {
                column: ratio_column,
                team: team.to_string(),
                opponent: opponent.to_string(),
            });
        }
        row.set(ratio_column, ratio);
    }

    if features.iter().any(|f| f == LOCATION_NEUTRAL) {
        row.set(LOCATION_NEUTRAL, 1.0);
    }
    for column in LOCATION_ZEROED {
        if features.iter().any(|f| f == column) {
            row.set(column, 0.0);
        }
    }

    Ok(row)
}
