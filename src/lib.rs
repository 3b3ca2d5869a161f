//! Bracket simulation and win-prediction core.
//!
//! Scores head-to-head matchups with a Bayesian logistic-regression
//! posterior and simulates single-elimination brackets once per coefficient
//! draw, aggregating per-team round outcomes and per-matchup occurrence
//! counts across all draws.

pub mod bracket;
pub mod coefficients;
pub mod config;
pub mod constants;
pub mod error;
pub mod features;
pub mod outcomes;
pub mod predictor;
pub mod simulate;
pub mod team_stats;

pub use bracket::Bracket;
pub use coefficients::{CoefficientSample, CoefficientSet, CoefficientSummary};
pub use config::{ModelConfig, PriorSpec, ResolvedCoefficient, ResolvedModelConfig, StepMethod};
pub use error::{Result, SimError};
pub use features::{matchup_row, FeatureRow};
pub use outcomes::{MatchupAggregates, MatchupResult, SimulationRun, TeamRoundOutcomes};
pub use predictor::{cross_validate, logistic, predict, Prediction, PredictionMethod};
pub use simulate::{simulate_tournament, Policy, TournamentState};
pub use team_stats::TeamStatsTable;
