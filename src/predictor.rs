use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coefficients::CoefficientSet;
use crate::constants::WIN_THRESHOLD;
use crate::error::{Result, SimError};
use crate::features::FeatureRow;

/// Logistic (sigmoid) transform.
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Scoring mode for [`predict`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionMethod {
    /// Collapse all draws to the posterior mean and score once.
    Map,
    /// Score every draw independently, keeping per-draw variability.
    PosteriorPredictive,
}

/// Output of [`predict`].
#[derive(Clone, Debug, Serialize)]
pub struct Prediction {
    /// draws x rows win probabilities in [0, 1].
    pub raw: Vec<Vec<f64>>,
    /// draws x rows binary calls; a probability on the 0.5 threshold
    /// classifies as a win.
    pub binary: Vec<Vec<u8>>,
    /// Fraction of (draw, row) entries matching the known outcomes. Present
    /// only when every input row carries an outcome.
    pub accuracy: Option<f64>,
}

/// Score a feature table against a set of coefficient draws.
///
/// Each row's score per draw is
/// `logistic(intercept + sum(weight_f * feature_f))` over the intercept-
/// augmented design vector. No feature scaling is applied; this is a pure
/// linear-logistic scorer.
///
/// # Arguments
/// * `data` - Feature rows; each must supply every feature in `features`
/// * `features` - Ordered feature names defining design-vector column order
/// * `coefficients` - Posterior draws, built against the same feature list
/// * `method` - MAP (one collapsed pass) or posterior-predictive (per draw)
///
/// # Returns
/// Raw probabilities, binary calls, and accuracy when outcomes are known.
pub fn predict(
    data: &[FeatureRow],
    features: &[String],
    coefficients: &CoefficientSet,
    method: PredictionMethod,
) -> Result<Prediction> {
    if coefficients.features() != features {
        return Err(SimError::FeatureMismatch {
            expected: features.to_vec(),
            got: coefficients.features().to_vec(),
        });
    }

    // Intercept-augmented design matrix, one row per game. An empty feature
    // list degenerates to an intercept-only model.
    let mut design = Vec::with_capacity(data.len());
    for row in data {
        let mut x = Vec::with_capacity(features.len() + 1);
        x.push(1.0);
        for feature in features {
            x.push(row.feature(feature)?);
        }
        design.push(x);
    }

    let scored = match method {
        PredictionMethod::Map => coefficients.collapse_map(),
        PredictionMethod::PosteriorPredictive => coefficients.clone(),
    };

    let mut raw = Vec::with_capacity(scored.n_draws());
    let mut binary = Vec::with_capacity(scored.n_draws());
    for (d, coefs) in scored.iter_rows().enumerate() {
        let mut probs = Vec::with_capacity(design.len());
        let mut calls = Vec::with_capacity(design.len());
        for (r, x) in design.iter().enumerate() {
            let score: f64 = coefs.iter().zip(x).map(|(c, v)| c * v).sum();
            let p = logistic(score);
            if !p.is_finite() {
                return Err(SimError::NonFiniteScore { draw: d, row: r });
            }
            calls.push(u8::from(p >= WIN_THRESHOLD));
            probs.push(p);
        }
        raw.push(probs);
        binary.push(calls);
    }

    let accuracy = known_outcomes(data).map(|outcomes| {
        let mut hits = 0usize;
        let mut total = 0usize;
        for calls in &binary {
            for (call, &win) in calls.iter().zip(&outcomes) {
                if (*call == 1) == win {
                    hits += 1;
                }
                total += 1;
            }
        }
        hits as f64 / total as f64
    });

    Ok(Prediction {
        raw,
        binary,
        accuracy,
    })
}

/// Outcomes for every row, or None if any row (or the whole table) lacks one.
fn known_outcomes(data: &[FeatureRow]) -> Option<Vec<bool>> {
    if data.is_empty() {
        return None;
    }
    data.iter().map(|r| r.win).collect()
}

/// K-fold cross validation of a fitting procedure.
///
/// Rows are shuffled with a seeded RNG and dealt round-robin into `k` folds.
/// Each fold is scored in posterior-predictive mode against coefficients
/// fitted on the remaining rows by the caller-supplied closure. Returns one
/// accuracy per fold.
///
/// Every row must carry a known outcome, and there must be at least one row
/// per fold.
pub fn cross_validate<F>(
    data: &[FeatureRow],
    features: &[String],
    k: usize,
    seed: Option<u64>,
    mut fit: F,
) -> Result<Vec<f64>>
where
    F: FnMut(&[FeatureRow]) -> Result<CoefficientSet>,
{
    if k < 2 || data.len() < k {
        return Err(SimError::FoldCount {
            rows: data.len(),
            folds: k,
        });
    }
    for row in data {
        if row.win.is_none() {
            return Err(SimError::MissingOutcome(row.team.clone()));
        }
    }

    let mut order: Vec<usize> = (0..data.len()).collect();
    let mut rng = match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    };
    order.shuffle(&mut rng);

    let mut scores = Vec::with_capacity(k);
    for fold in 0..k {
        let mut train = Vec::new();
        let mut test = Vec::new();
        for (position, &index) in order.iter().enumerate() {
            if position % k == fold {
                test.push(data[index].clone());
            } else {
                train.push(data[index].clone());
            }
        }

        let coefficients = fit(&train)?;
        let prediction = predict(
            &test,
            features,
            &coefficients,
            PredictionMethod::PosteriorPredictive,
        )?;
        // Folds are non-empty and every row carries an outcome, so accuracy
        // is always present here.
        scores.push(prediction.accuracy.unwrap_or_default());
    }

    debug!(folds = k, rows = data.len(), "cross validation complete");
    Ok(scores)
}
