use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::{Result, SimError};

/// One posterior draw in named form: an intercept plus a weight per feature.
///
/// Immutable once handed to a [`CoefficientSet`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoefficientSample {
    pub intercept: f64,
    weights: HashMap<String, f64>,
}

impl CoefficientSample {
    pub fn new(intercept: f64) -> Self {
        CoefficientSample {
            intercept,
            weights: HashMap::new(),
        }
    }

    pub fn with_weight(mut self, feature: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(feature.into(), weight);
        self
    }

    pub fn weight(&self, feature: &str) -> Option<f64> {
        self.weights.get(feature).copied()
    }
}

/// An ordered, finite, non-empty set of coefficient draws in matrix form.
///
/// Rows are draws; column 0 is the intercept and the remaining columns follow
/// the feature list order. This is the only form the predictor scores
/// against, so both the named-sample and raw-matrix input shapes funnel
/// through the constructors here, which enforce shape up front.
#[derive(Clone, Debug, Serialize)]
pub struct CoefficientSet {
    features: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl CoefficientSet {
    /// Build from a pre-extracted numeric matrix (rows = draws, columns =
    /// intercept followed by `features` in order).
    pub fn from_matrix(features: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if rows.is_empty() {
            return Err(SimError::EmptyCoefficients);
        }
        let expected = features.len() + 1;
        for (i, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(SimError::CoefficientShape {
                    row: i,
                    got: row.len(),
                    expected,
                });
            }
        }
        Ok(CoefficientSet { features, rows })
    }

    /// Build from named posterior draws, ordering each sample's weights by
    /// the feature list. A sample missing a named weight is a configuration
    /// error.
    pub fn from_samples(features: Vec<String>, samples: &[CoefficientSample]) -> Result<Self> {
        if samples.is_empty() {
            return Err(SimError::EmptyCoefficients);
        }
        let mut rows = Vec::with_capacity(samples.len());
        for sample in samples {
            let mut row = Vec::with_capacity(features.len() + 1);
            row.push(sample.intercept);
            for feature in &features {
                match sample.weight(feature) {
                    Some(w) => row.push(w),
                    None => return Err(SimError::UnknownFeature(feature.clone())),
                }
            }
            rows.push(row);
        }
        Ok(CoefficientSet { features, rows })
    }

    /// Set holding exactly one draw. Used by the simulator to score one
    /// posterior draw at a time.
    pub fn single(features: Vec<String>, row: Vec<f64>) -> Result<Self> {
        Self::from_matrix(features, vec![row])
    }

    pub fn n_draws(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Collapse all draws to their column means: the posterior-mean point
    /// estimate used for MAP scoring.
    pub fn collapse_map(&self) -> CoefficientSet {
        if self.rows.len() == 1 {
            return self.clone();
        }
        let width = self.features.len() + 1;
        let mut mean_row = Vec::with_capacity(width);
        for col in 0..width {
            mean_row.push(self.rows.iter().map(|r| r[col]).mean());
        }
        CoefficientSet {
            features: self.features.clone(),
            rows: vec![mean_row],
        }
    }

    /// Posterior mean and standard deviation per coefficient column,
    /// intercept first.
    pub fn summary(&self) -> Vec<CoefficientSummary> {
        let names = std::iter::once("intercept").chain(self.features.iter().map(String::as_str));
        names
            .enumerate()
            .map(|(col, name)| {
                let column = self.rows.iter().map(|r| r[col]);
                CoefficientSummary {
                    feature: name.to_string(),
                    mean: column.clone().mean(),
                    // Sample standard deviation needs at least two draws.
                    std_dev: if self.rows.len() > 1 {
                        column.std_dev()
                    } else {
                        0.0
                    },
                }
            })
            .collect()
    }
}

/// Posterior mean and spread for one coefficient column.
#[derive(Clone, Debug, Serialize)]
pub struct CoefficientSummary {
    pub feature: String,
    pub mean: f64,
    pub std_dev: f64,
}
