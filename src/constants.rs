/// Column prefix for the "team" side of an assembled matchup row.
pub const TEAM_PREFIX: &str = "team_";

/// Column prefix for the "opponent" side of an assembled matchup row.
pub const OPPONENT_PREFIX: &str = "opponent_";

/// Prefix for derived difference columns (team value - opponent value).
pub const DIFF_PREFIX: &str = "diff_";

/// Prefix for derived ratio columns (team value / opponent value).
pub const RATIO_PREFIX: &str = "ratio_";

/// Venue indicator pinned to 1 for every simulated game.
pub const LOCATION_NEUTRAL: &str = "location_Neutral";

/// Venue indicators pinned to 0 for every simulated game.
pub const LOCATION_ZEROED: [&str; 4] = [
    "location_Home",
    "location_Away",
    "location_SemiHome",
    "location_SemiAway",
];

/// Probability threshold separating predicted wins from losses. A score
/// exactly on the threshold classifies as a win.
pub const WIN_THRESHOLD: f64 = 0.5;
