use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Normal prior on a model coefficient, parameterized by mean and precision
/// (inverse variance), with an explicit initial value for the sampler.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriorSpec {
    pub mean: f64,
    pub precision: f64,
    pub initial: f64,
}

impl Default for PriorSpec {
    fn default() -> Self {
        PriorSpec {
            mean: 0.0,
            precision: 3e-4,
            initial: 0.0,
        }
    }
}

/// Stepping method the (external) sampler uses for one coefficient.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum StepMethod {
    /// Metropolis with a Normal proposal of the given standard deviation.
    Metropolis { proposal_sd: f64 },
    /// Slice sampling; takes no tuning parameters.
    Slice,
}

impl Default for StepMethod {
    fn default() -> Self {
        StepMethod::Metropolis { proposal_sd: 1.0 }
    }
}

/// Explicit model configuration handed to the fitting layer.
///
/// Per-feature priors and stepping methods are declared up front and resolved
/// eagerly by [`ModelConfig::resolve`], so the sampler never consults
/// per-feature defaults dynamically mid-run. Overrides naming features
/// outside the feature list are rejected.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    features: Vec<String>,
    intercept_prior: PriorSpec,
    /// Bernoulli error-term rate.
    error_rate: f64,
    default_prior: PriorSpec,
    default_step: StepMethod,
    feature_priors: HashMap<String, PriorSpec>,
    feature_steps: HashMap<String, StepMethod>,
}

impl ModelConfig {
    pub fn new(features: Vec<String>) -> Self {
        ModelConfig {
            features,
            intercept_prior: PriorSpec::default(),
            error_rate: 0.5,
            default_prior: PriorSpec::default(),
            default_step: StepMethod::default(),
            feature_priors: HashMap::new(),
            feature_steps: HashMap::new(),
        }
    }

    pub fn with_intercept_prior(mut self, prior: PriorSpec) -> Self {
        self.intercept_prior = prior;
        self
    }

    pub fn with_error_rate(mut self, rate: f64) -> Self {
        self.error_rate = rate;
        self
    }

    pub fn with_default_prior(mut self, prior: PriorSpec) -> Self {
        self.default_prior = prior;
        self
    }

    pub fn with_default_step(mut self, step: StepMethod) -> Self {
        self.default_step = step;
        self
    }

    /// Override the prior for a single named feature.
    pub fn with_feature_prior(mut self, feature: impl Into<String>, prior: PriorSpec) -> Self {
        self.feature_priors.insert(feature.into(), prior);
        self
    }

    /// Override the stepping method for a single named feature.
    pub fn with_feature_step(mut self, feature: impl Into<String>, step: StepMethod) -> Self {
        self.feature_steps.insert(feature.into(), step);
        self
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Resolve every coefficient eagerly.
    ///
    /// Rejects overrides that name unknown features, non-positive precisions
    /// or proposal widths, and an error rate outside (0, 1).
    pub fn resolve(&self) -> Result<ResolvedModelConfig> {
        if !(self.error_rate > 0.0 && self.error_rate < 1.0) {
            return Err(SimError::InvalidParameter(format!(
                "error-term rate {} outside (0, 1)",
                self.error_rate
            )));
        }
        for name in self.feature_priors.keys().chain(self.feature_steps.keys()) {
            if !self.features.contains(name) {
                return Err(SimError::UnknownFeature(name.clone()));
            }
        }

        check_prior("intercept", &self.intercept_prior)?;
        let mut coefficients = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            let prior = self
                .feature_priors
                .get(feature)
                .copied()
                .unwrap_or(self.default_prior);
            let step = self
                .feature_steps
                .get(feature)
                .copied()
                .unwrap_or(self.default_step);
            check_prior(feature, &prior)?;
            check_step(feature, &step)?;
            coefficients.push(ResolvedCoefficient {
                feature: feature.clone(),
                prior,
                step,
            });
        }

        Ok(ResolvedModelConfig {
            intercept_prior: self.intercept_prior,
            error_rate: self.error_rate,
            coefficients,
        })
    }
}

fn check_prior(name: &str, prior: &PriorSpec) -> Result<()> {
    if !(prior.precision > 0.0) || !prior.mean.is_finite() || !prior.initial.is_finite() {
        return Err(SimError::InvalidParameter(format!(
            "prior for {:?} (mean {}, precision {})",
            name, prior.mean, prior.precision
        )));
    }
    Ok(())
}

fn check_step(name: &str, step: &StepMethod) -> Result<()> {
    if let StepMethod::Metropolis { proposal_sd } = step {
        if !(*proposal_sd > 0.0) {
            return Err(SimError::InvalidParameter(format!(
                "proposal sd {} for {:?}",
                proposal_sd, name
            )));
        }
    }
    Ok(())
}

/// One coefficient's fully resolved sampling setup.
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedCoefficient {
    pub feature: String,
    pub prior: PriorSpec,
    pub step: StepMethod,
}

/// Output of [`ModelConfig::resolve`]: everything the fitting layer needs,
/// one entry per coefficient, no dynamic lookups left.
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedModelConfig {
    pub intercept_prior: PriorSpec,
    pub error_rate: f64,
    pub coefficients: Vec<ResolvedCoefficient>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feats(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_defaults_resolve() {
        let resolved = ModelConfig::new(feats(&["diff_Pythag", "ratio_Pythag"]))
            .resolve()
            .unwrap();

        assert_eq!(resolved.coefficients.len(), 2);
        assert_eq!(resolved.error_rate, 0.5);
        assert_eq!(resolved.intercept_prior, PriorSpec::default());
        assert_eq!(
            resolved.coefficients[0].step,
            StepMethod::Metropolis { proposal_sd: 1.0 }
        );
    }

    #[test]
    fn test_feature_override_applies() {
        let tight = PriorSpec {
            mean: 1.0,
            precision: 0.5,
            initial: 1.0,
        };
        let resolved = ModelConfig::new(feats(&["diff_Pythag", "ratio_Pythag"]))
            .with_feature_prior("ratio_Pythag", tight)
            .with_feature_step("ratio_Pythag", StepMethod::Slice)
            .resolve()
            .unwrap();

        assert_eq!(resolved.coefficients[0].prior, PriorSpec::default());
        assert_eq!(resolved.coefficients[1].prior, tight);
        assert_eq!(resolved.coefficients[1].step, StepMethod::Slice);
    }

    #[test]
    fn test_unknown_override_rejected() {
        let err = ModelConfig::new(feats(&["diff_Pythag"]))
            .with_feature_prior("diff_Tempo", PriorSpec::default())
            .resolve()
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownFeature(f) if f == "diff_Tempo"));
    }

    #[test]
    fn test_bad_parameters_rejected() {
        let err = ModelConfig::new(feats(&["diff_Pythag"]))
            .with_error_rate(1.0)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter(_)));

        let err = ModelConfig::new(feats(&["diff_Pythag"]))
            .with_default_prior(PriorSpec {
                mean: 0.0,
                precision: 0.0,
                initial: 0.0,
            })
            .resolve()
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter(_)));

        let err = ModelConfig::new(feats(&["diff_Pythag"]))
            .with_default_step(StepMethod::Metropolis { proposal_sd: -1.0 })
            .resolve()
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter(_)));
    }
}
