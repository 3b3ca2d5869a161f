use std::collections::HashMap;

use serde::Serialize;

/// Key identifying an aggregated matchup: winner, loser, and the round size
/// at which the game occurred.
pub type MatchupKey = (String, String, usize);

/// One aggregated matchup row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatchupResult {
    pub winner: String,
    pub loser: String,
    /// Teams still alive when the game was played (64, 32, ..., 2).
    pub round_of: usize,
    /// Draws in which this exact result occurred.
    pub count: u64,
}

/// Occurrence counts for every (winner, loser, round size) triple seen
/// across draws.
#[derive(Clone, Debug, Default)]
pub struct MatchupAggregates {
    counts: HashMap<MatchupKey, u64>,
}

impl MatchupAggregates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, winner: &str, loser: &str, round_of: usize) {
        *self
            .counts
            .entry((winner.to_string(), loser.to_string(), round_of))
            .or_insert(0) += 1;
    }

    /// Sum another aggregate into this one. The merge is an associative,
    /// commutative reduction, so per-worker partials can arrive in any order.
    pub fn merge(&mut self, other: MatchupAggregates) {
        for (key, n) in other.counts {
            *self.counts.entry(key).or_insert(0) += n;
        }
    }

    pub fn count(&self, winner: &str, loser: &str, round_of: usize) -> u64 {
        self.counts
            .get(&(winner.to_string(), loser.to_string(), round_of))
            .copied()
            .unwrap_or(0)
    }

    /// Total games recorded across all keys.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MatchupKey, u64)> {
        self.counts.iter().map(|(k, &n)| (k, n))
    }

    /// Rows ordered by round (largest field first), then winner, then loser.
    pub fn to_sorted_vec(&self) -> Vec<MatchupResult> {
        let mut rows: Vec<MatchupResult> = self
            .counts
            .iter()
            .map(|((winner, loser, round_of), &count)| MatchupResult {
                winner: winner.clone(),
                loser: loser.clone(),
                round_of: *round_of,
                count,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.round_of
                .cmp(&a.round_of)
                .then_with(|| a.winner.cmp(&b.winner))
                .then_with(|| a.loser.cmp(&b.loser))
        });
        rows
    }
}

/// Per-team win counters indexed by round, aggregated across draws.
///
/// Round 1 is the full field; round `n_rounds` is the final. A team is
/// credited at a round only for draws in which it won that round, so a team
/// eliminated at round r carries zeros from r onward and a round-1 loser
/// carries an all-zero vector.
#[derive(Clone, Debug, Serialize)]
pub struct TeamRoundOutcomes {
    teams: Vec<String>,
    n_rounds: usize,
    #[serde(skip)]
    index: HashMap<String, usize>,
    wins: Vec<Vec<u64>>,
}

impl TeamRoundOutcomes {
    pub fn new(mut teams: Vec<String>, n_rounds: usize) -> Self {
        teams.sort();
        let index = teams
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, t)| (t, i))
            .collect();
        let wins = vec![vec![0; n_rounds]; teams.len()];
        TeamRoundOutcomes {
            teams,
            n_rounds,
            index,
            wins,
        }
    }

    /// Credit `team` with one win at `round` (1-based).
    pub fn credit(&mut self, team: &str, round: usize) {
        debug_assert!(round >= 1 && round <= self.n_rounds);
        if let Some(&i) = self.index.get(team) {
            self.wins[i][round - 1] += 1;
        } else {
            debug_assert!(false, "credit for team outside the bracket: {}", team);
        }
    }

    /// Sum another outcome table into this one. Both sides must cover the
    /// same field.
    pub fn merge(&mut self, other: &TeamRoundOutcomes) {
        debug_assert_eq!(self.teams, other.teams);
        for (i, row) in other.wins.iter().enumerate() {
            for (r, n) in row.iter().enumerate() {
                self.wins[i][r] += n;
            }
        }
    }

    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    pub fn n_rounds(&self) -> usize {
        self.n_rounds
    }

    /// Win counts per round for one team.
    pub fn wins(&self, team: &str) -> Option<&[u64]> {
        self.index.get(team).map(|&i| self.wins[i].as_slice())
    }

    /// Total wins recorded at `round` (1-based) across every team.
    pub fn round_total(&self, round: usize) -> u64 {
        self.wins.iter().map(|row| row[round - 1]).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u64])> {
        self.teams
            .iter()
            .zip(&self.wins)
            .map(|(t, w)| (t.as_str(), w.as_slice()))
    }
}

/// Full output of one simulation invocation: matchup aggregates plus the
/// per-team round table, created fresh per run.
#[derive(Clone, Debug)]
pub struct SimulationRun {
    pub matchups: MatchupAggregates,
    pub team_rounds: TeamRoundOutcomes,
    pub n_draws: usize,
}
