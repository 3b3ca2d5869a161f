use thiserror::Error;

/// Errors produced by the prediction and simulation core.
///
/// Variants fall into three classes: configuration errors (inconsistent
/// inputs detectable before any computation starts), data lookup errors (a
/// referenced team or statistic is absent), and numeric errors (inputs that
/// would otherwise poison the aggregates with non-finite values). Every
/// variant is fatal for the run that raised it and none are retryable;
/// callers must fix their inputs.
#[derive(Debug, Error)]
pub enum SimError {
    // Configuration.
    #[error("coefficient sample sequence is empty")]
    EmptyCoefficients,

    #[error("bracket has {0} participants; the field must be a power of two >= 2")]
    BracketSize(usize),

    #[error("team {0:?} appears in more than one pairing")]
    DuplicateTeam(String),

    #[error("coefficient row {row} has {got} weights; expected {expected} (intercept + features)")]
    CoefficientShape {
        row: usize,
        got: usize,
        expected: usize,
    },

    #[error("feature {0:?} cannot be derived from the supplied statistics")]
    UnknownFeature(String),

    #[error("feature list {expected:?} does not match coefficient set features {got:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("cannot split {rows} rows into {folds} folds")]
    FoldCount { rows: usize, folds: usize },

    #[error("invalid configuration parameter: {0}")]
    InvalidParameter(String),

    // Data lookup.
    #[error("no statistics for team {0:?}")]
    UnknownTeam(String),

    #[error("statistic {stat:?} missing for team {team:?}")]
    MissingStatistic { stat: String, team: String },

    #[error("row for {team:?} has no value for feature {feature:?}")]
    MissingFeature { team: String, feature: String },

    #[error("row for {0:?} carries no known outcome")]
    MissingOutcome(String),

    // Numeric.
    #[error("ratio over statistic {stat:?} divides by zero ({opponent:?} value is 0)")]
    ZeroDenominator { stat: String, opponent: String },

    #[error("non-finite value in column {column:?} for {team:?} vs {opponent:?}")]
    NonFiniteFeature {
        column: String,
        team: String,
        opponent: String,
    },

    #[error("non-finite score for draw {draw}, row {row}")]
    NonFiniteScore { draw: usize, row: usize },
}

pub type Result<T> = std::result::Result<T, SimError>;
