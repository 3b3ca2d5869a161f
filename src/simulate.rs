use std::collections::HashMap;

use rand::distributions::Distribution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::Bernoulli;
use tracing::{debug, trace};

use crate::bracket::Bracket;
use crate::coefficients::CoefficientSet;
use crate::constants::{
    DIFF_PREFIX, LOCATION_NEUTRAL, LOCATION_ZEROED, OPPONENT_PREFIX, RATIO_PREFIX, TEAM_PREFIX,
};
use crate::error::{Result, SimError};
use crate::features::matchup_row;
use crate::outcomes::{MatchupAggregates, SimulationRun, TeamRoundOutcomes};
use crate::predictor::{predict, PredictionMethod};
use crate::team_stats::TeamStatsTable;

/// Winner-resolution policy for simulated games.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Policy {
    /// The higher-probability side wins outright. A coin-flip game (exactly
    /// 0.5) goes to the side the fairness draw labeled "team".
    Deterministic,
    /// One Bernoulli trial per game with the predicted probability. A
    /// probability of exactly 1 always selects that side.
    Stochastic,
}

/// A bracket bound to team statistics, a feature list, and a resolution
/// policy, ready to simulate against coefficient draws.
#[derive(Clone, Debug)]
pub struct TournamentState {
    bracket: Bracket,
    team_stats: TeamStatsTable,
    features: Vec<String>,
    policy: Policy,
}

impl TournamentState {
    /// Validate and bind the inputs.
    ///
    /// Fails fast when a bracket team has no statistics row or a feature
    /// cannot be derived from the statistic columns (venue indicators and
    /// `team_`/`opponent_`/`diff_`/`ratio_`-prefixed statistics are
    /// derivable).
    pub fn new(
        bracket: Bracket,
        team_stats: TeamStatsTable,
        features: Vec<String>,
        policy: Policy,
    ) -> Result<Self> {
        for team in bracket.teams() {
            let stats = team_stats.get(&team)?;
            for feature in &features {
                if !feature_is_derivable(feature, stats) {
                    return Err(SimError::UnknownFeature(feature.clone()));
                }
            }
        }
        Ok(TournamentState {
            bracket,
            team_stats,
            features,
            policy,
        })
    }

    pub fn bracket(&self) -> &Bracket {
        &self.bracket
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Run one full bracket resolution per coefficient draw and aggregate
    /// the results.
    ///
    /// Draws are independent, so they run in parallel; every draw owns a
    /// ChaCha8 RNG seeded from a master sequence, making runs reproducible
    /// for a fixed `seed`. Per-draw partial aggregates merge through an
    /// associative sum after all draws complete. Any failing draw fails the
    /// whole run; partial aggregates are never returned.
    pub fn simulate(&self, draws: &CoefficientSet, seed: Option<u64>) -> Result<SimulationRun> {
        if draws.features() != self.features.as_slice() {
            return Err(SimError::FeatureMismatch {
                expected: self.features.clone(),
                got: draws.features().to_vec(),
            });
        }
        // The draw set is non-empty by construction.
        let n_draws = draws.n_draws();

        let mut master = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        let draw_seeds: Vec<u64> = (0..n_draws).map(|_| master.gen()).collect();

        debug!(
            draws = n_draws,
            teams = self.bracket.n_teams(),
            rounds = self.bracket.n_rounds(),
            "simulating tournament"
        );

        let partials: Vec<(MatchupAggregates, TeamRoundOutcomes)> = draw_seeds
            .into_par_iter()
            .enumerate()
            .map(|(i, s)| self.resolve_draw(draws.row(i), ChaCha8Rng::seed_from_u64(s)))
            .collect::<Result<Vec<_>>>()?;

        let mut matchups = MatchupAggregates::new();
        let mut team_rounds = TeamRoundOutcomes::new(self.bracket.teams(), self.bracket.n_rounds());
        for (draw_matchups, draw_rounds) in partials {
            matchups.merge(draw_matchups);
            team_rounds.merge(&draw_rounds);
        }

        Ok(SimulationRun {
            matchups,
            team_rounds,
            n_draws,
        })
    }

    /// Resolve the whole bracket once for a single coefficient draw.
    ///
    /// Iterative round loop: orient each pairing with a fairness draw,
    /// assemble matchup rows, score them in MAP mode against the single
    /// draw, resolve winners per policy, then re-pair winners preserving
    /// bracket adjacency until a champion remains.
    fn resolve_draw(
        &self,
        coefs: &[f64],
        mut rng: ChaCha8Rng,
    ) -> Result<(MatchupAggregates, TeamRoundOutcomes)> {
        let single = CoefficientSet::single(self.features.clone(), coefs.to_vec())?;
        let mut matchups = MatchupAggregates::new();
        let mut rounds_won = TeamRoundOutcomes::new(self.bracket.teams(), self.bracket.n_rounds());

        let mut alive: Vec<(String, String)> = self.bracket.pairings().to_vec();
        let mut round = 1usize;

        loop {
            let round_of = alive.len() * 2;

            // Fairness draw: which side is "team" for feature purposes, so
            // asymmetric encodings cannot systematically favor one slot.
            // Independent per round, per pairing, per coefficient draw.
            let mut oriented = Vec::with_capacity(alive.len());
            for (a, b) in &alive {
                if rng.gen::<bool>() {
                    oriented.push((b.clone(), a.clone()));
                } else {
                    oriented.push((a.clone(), b.clone()));
                }
            }

            let mut rows = Vec::with_capacity(oriented.len());
            for (team, opponent) in &oriented {
                rows.push(matchup_row(
                    team,
                    opponent,
                    self.team_stats.get(team)?,
                    self.team_stats.get(opponent)?,
                    &self.features,
                )?);
            }

            let prediction = predict(&rows, &self.features, &single, PredictionMethod::Map)?;
            let probs = &prediction.raw[0];

            let mut winners = Vec::with_capacity(oriented.len());
            for (g, (team, opponent)) in oriented.iter().enumerate() {
                let team_wins = match self.policy {
                    Policy::Deterministic => prediction.binary[0][g] == 1,
                    Policy::Stochastic => bernoulli_trial(probs[g], &mut rng)?,
                };
                let (winner, loser) = if team_wins {
                    (team, opponent)
                } else {
                    (opponent, team)
                };
                trace!(
                    round,
                    round_of,
                    winner = winner.as_str(),
                    loser = loser.as_str(),
                    prob = probs[g],
                    "game resolved"
                );
                matchups.record(winner, loser, round_of);
                rounds_won.credit(winner, round);
                winners.push(winner.clone());
            }

            if winners.len() == 1 {
                return Ok((matchups, rounds_won));
            }
            // Winner of pairing 2i meets winner of pairing 2i + 1.
            alive = winners
                .chunks(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect();
            round += 1;
        }
    }
}

/// Simulate a full tournament: validate the inputs, resolve every coefficient
/// draw, and aggregate.
///
/// # Arguments
/// * `bracket` - Round-1 pairings, bracket "unrolled"
/// * `team_stats` - Statistics per team identifier
/// * `features` - Feature names scoring each game (venue indicators and
///   prefixed statistic columns)
/// * `policy` - Deterministic or stochastic winner resolution
/// * `coefficient_draws` - One full bracket resolution runs per draw
/// * `seed` - Master seed for reproducible runs; entropy-seeded when absent
pub fn simulate_tournament(
    bracket: Bracket,
    team_stats: TeamStatsTable,
    features: Vec<String>,
    policy: Policy,
    coefficient_draws: &CoefficientSet,
    seed: Option<u64>,
) -> Result<SimulationRun> {
    TournamentState::new(bracket, team_stats, features, policy)?.simulate(coefficient_draws, seed)
}

fn feature_is_derivable(feature: &str, stats: &HashMap<String, f64>) -> bool {
    if feature == LOCATION_NEUTRAL || LOCATION_ZEROED.contains(&feature) {
        return true;
    }
    for prefix in [TEAM_PREFIX, OPPONENT_PREFIX, DIFF_PREFIX, RATIO_PREFIX] {
        if let Some(stat) = feature.strip_prefix(prefix) {
            return stats.contains_key(stat);
        }
    }
    false
}

/// One Bernoulli trial at probability `p`.
fn bernoulli_trial<R: Rng>(p: f64, rng: &mut R) -> Result<bool> {
    let trial = Bernoulli::new(p)
        .map_err(|_| SimError::InvalidParameter(format!("game probability {}", p)))?;
    Ok(trial.sample(rng) > 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn feats(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn pairs(names: &[(&str, &str)]) -> Vec<(String, String)> {
        names
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    fn stats_table(strengths: &[(&str, f64)]) -> TeamStatsTable {
        let mut table = TeamStatsTable::new();
        for (team, strength) in strengths {
            table.set_stat(*team, "Strength", *strength);
        }
        table
    }

    /// Single identity coefficient draw over the strength difference.
    fn strength_draw(n: usize) -> CoefficientSet {
        CoefficientSet::from_matrix(feats(&["diff_Strength"]), vec![vec![0.0, 1.0]; n]).unwrap()
    }

    #[test]
    fn test_four_team_deterministic_scenario() {
        let bracket = Bracket::new(pairs(&[("A", "B"), ("C", "D")])).unwrap();
        let table = stats_table(&[("A", 10.0), ("B", 1.0), ("C", 5.0), ("D", 5.0)]);

        let run = simulate_tournament(
            bracket,
            table,
            feats(&["diff_Strength"]),
            Policy::Deterministic,
            &strength_draw(1),
            Some(42),
        )
        .unwrap();

        // A beats B in round 1 regardless of the fairness orientation.
        assert_eq!(run.matchups.count("A", "B", 4), 1);
        // C/D is a coin flip decided by the tie-break; either way A takes the
        // final against the survivor.
        let final_count = run.matchups.count("A", "C", 2) + run.matchups.count("A", "D", 2);
        assert_eq!(final_count, 1);
        assert_eq!(run.team_rounds.wins("A").unwrap(), &[1, 1]);
        assert_eq!(run.team_rounds.wins("B").unwrap(), &[0, 0]);
    }

    #[test]
    fn test_single_draw_produces_halving_rounds() {
        let names = ["A", "B", "C", "D", "E", "F", "G", "H"];
        let bracket = Bracket::new(pairs(&[("A", "B"), ("C", "D"), ("E", "F"), ("G", "H")]))
            .unwrap();
        let strengths: Vec<(&str, f64)> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (*n, (8 - i) as f64))
            .collect();

        let run = simulate_tournament(
            bracket,
            stats_table(&strengths),
            feats(&["diff_Strength"]),
            Policy::Deterministic,
            &strength_draw(1),
            Some(1),
        )
        .unwrap();

        // Exactly 3 rounds: 4 games at round-of-8, 2 at 4, 1 at 2.
        assert_eq!(run.team_rounds.n_rounds(), 3);
        let rows = run.matchups.to_sorted_vec();
        assert_eq!(rows.iter().filter(|r| r.round_of == 8).count(), 4);
        assert_eq!(rows.iter().filter(|r| r.round_of == 4).count(), 2);
        assert_eq!(rows.iter().filter(|r| r.round_of == 2).count(), 1);

        // Strongest team takes every round; champion gets full-bracket credit.
        assert_eq!(run.team_rounds.wins("A").unwrap(), &[1, 1, 1]);
        assert_eq!(run.team_rounds.round_total(3), 1);
    }

    #[test]
    fn test_aggregate_invariants_across_draws() {
        let bracket = Bracket::new(pairs(&[("A", "B"), ("C", "D"), ("E", "F"), ("G", "H")]))
            .unwrap();
        let strengths: Vec<(&str, f64)> = ["A", "B", "C", "D", "E", "F", "G", "H"]
            .iter()
            .enumerate()
            .map(|(i, n)| (*n, 1.0 + i as f64))
            .collect();
        let n_draws = 25;

        let run = simulate_tournament(
            bracket,
            stats_table(&strengths),
            feats(&["diff_Strength"]),
            Policy::Stochastic,
            &strength_draw(n_draws),
            Some(9),
        )
        .unwrap();

        assert_eq!(run.n_draws, n_draws);
        // Each draw yields participants/2 winners per round.
        assert_eq!(run.team_rounds.round_total(1), n_draws as u64 * 4);
        assert_eq!(run.team_rounds.round_total(2), n_draws as u64 * 2);
        assert_eq!(run.team_rounds.round_total(3), n_draws as u64);
        // 7 games per draw in an 8-team field.
        assert_eq!(run.matchups.total(), n_draws as u64 * 7);
    }

    #[test]
    fn test_stochastic_certainty_never_flips() {
        let bracket = Bracket::new(pairs(&[("Strong", "Weak")])).unwrap();
        // logistic(1000) is exactly 1.0 in f64.
        let table = stats_table(&[("Strong", 1000.0), ("Weak", 0.0)]);
        let n_draws = 100;

        let run = simulate_tournament(
            bracket,
            table,
            feats(&["diff_Strength"]),
            Policy::Stochastic,
            &strength_draw(n_draws),
            Some(3),
        )
        .unwrap();

        assert_eq!(run.matchups.count("Strong", "Weak", 2), n_draws as u64);
        assert_eq!(run.team_rounds.wins("Strong").unwrap(), &[n_draws as u64]);
        assert_eq!(run.team_rounds.wins("Weak").unwrap(), &[0]);
    }

    #[test]
    fn test_seeded_runs_reproduce() {
        let bracket = || Bracket::new(pairs(&[("A", "B"), ("C", "D")])).unwrap();
        let table = || stats_table(&[("A", 2.0), ("B", 1.5), ("C", 1.0), ("D", 2.5)]);
        let run = |seed| {
            simulate_tournament(
                bracket(),
                table(),
                feats(&["diff_Strength"]),
                Policy::Stochastic,
                &strength_draw(50),
                Some(seed),
            )
            .unwrap()
        };

        let first = run(11);
        let second = run(11);
        assert_eq!(first.matchups.to_sorted_vec(), second.matchups.to_sorted_vec());
        for team in ["A", "B", "C", "D"] {
            assert_eq!(
                first.team_rounds.wins(team).unwrap(),
                second.team_rounds.wins(team).unwrap()
            );
        }
    }

    #[test]
    fn test_missing_team_stats_fatal() {
        let bracket = Bracket::new(pairs(&[("A", "B")])).unwrap();
        let table = stats_table(&[("A", 1.0)]);

        let err = TournamentState::new(
            bracket,
            table,
            feats(&["diff_Strength"]),
            Policy::Deterministic,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::UnknownTeam(t) if t == "B"));
    }

    #[test]
    fn test_unknown_feature_fatal() {
        let bracket = Bracket::new(pairs(&[("A", "B")])).unwrap();
        let table = stats_table(&[("A", 1.0), ("B", 2.0)]);

        let err = TournamentState::new(
            bracket,
            table,
            feats(&["diff_Bogus"]),
            Policy::Deterministic,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::UnknownFeature(f) if f == "diff_Bogus"));
    }

    #[test]
    fn test_venue_indicators_accepted_as_features() {
        let bracket = Bracket::new(pairs(&[("A", "B")])).unwrap();
        let table = stats_table(&[("A", 3.0), ("B", 1.0)]);

        // Weight 0 on the venue columns: they must resolve without a
        // matching statistic.
        let features = feats(&["diff_Strength", "location_Neutral", "location_Home"]);
        let draws =
            CoefficientSet::from_matrix(features.clone(), vec![vec![0.0, 1.0, 0.0, 0.0]]).unwrap();

        let run = simulate_tournament(
            bracket,
            table,
            features,
            Policy::Deterministic,
            &draws,
            Some(5),
        )
        .unwrap();
        assert_eq!(run.matchups.count("A", "B", 2), 1);
    }

    #[test]
    fn test_draw_feature_mismatch_fatal() {
        let bracket = Bracket::new(pairs(&[("A", "B")])).unwrap();
        let table = stats_table(&[("A", 1.0), ("B", 2.0)]);
        let state = TournamentState::new(
            bracket,
            table,
            feats(&["diff_Strength"]),
            Policy::Deterministic,
        )
        .unwrap();

        let draws =
            CoefficientSet::from_matrix(feats(&["ratio_Strength"]), vec![vec![0.0, 1.0]]).unwrap();
        let err = state.simulate(&draws, Some(1)).unwrap_err();
        assert!(matches!(err, SimError::FeatureMismatch { .. }));
    }

    #[test]
    fn test_empty_draw_sequence_unrepresentable() {
        // Zero draws must be a configuration error, never an empty result.
        let err = CoefficientSet::from_matrix(feats(&["diff_Strength"]), vec![]).unwrap_err();
        assert!(matches!(err, SimError::EmptyCoefficients));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_aggregate_invariants_hold(
            k in 1usize..=4,
            seed in any::<u64>(),
            raw_strengths in proptest::collection::vec(1.0f64..100.0, 16),
        ) {
            let n_teams = 1usize << k;
            let names: Vec<String> = (0..n_teams).map(|i| format!("Team{}", i)).collect();

            let mut table = TeamStatsTable::new();
            for (name, strength) in names.iter().zip(&raw_strengths) {
                table.set_stat(name.clone(), "Strength", *strength);
            }
            let pairings: Vec<(String, String)> = names
                .chunks(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect();

            let n_draws = 3;
            let run = simulate_tournament(
                Bracket::new(pairings).unwrap(),
                table,
                feats(&["diff_Strength"]),
                Policy::Stochastic,
                &strength_draw(n_draws),
                Some(seed),
            )
            .unwrap();

            // One champion per draw; one loser per game, n_teams - 1 games.
            prop_assert_eq!(run.team_rounds.round_total(k), n_draws as u64);
            prop_assert_eq!(run.matchups.total(), n_draws as u64 * (n_teams as u64 - 1));
            for round in 1..=k {
                let expected = n_draws as u64 * (n_teams >> round) as u64;
                prop_assert_eq!(run.team_rounds.round_total(round), expected);
            }
        }
    }
}
