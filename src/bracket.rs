use std::collections::HashSet;

use serde::Serialize;

use crate::error::{Result, SimError};

/// Single-elimination bracket: ordered round-1 pairings.
///
/// Pairing adjacency encodes the rest of the tournament: the winner of
/// pairing 2i meets the winner of pairing 2i + 1, so the list order is the
/// bracket "unrolled". Immutable once validated.
#[derive(Clone, Debug, Serialize)]
pub struct Bracket {
    pairings: Vec<(String, String)>,
}

impl Bracket {
    /// Validate and build. The field must be a power of two with at least
    /// two participants, and no team may appear in more than one pairing.
    pub fn new(pairings: Vec<(String, String)>) -> Result<Self> {
        let n_teams = pairings.len() * 2;
        if n_teams < 2 || !n_teams.is_power_of_two() {
            return Err(SimError::BracketSize(n_teams));
        }
        let mut seen = HashSet::new();
        for (a, b) in &pairings {
            for team in [a, b] {
                if !seen.insert(team.as_str()) {
                    return Err(SimError::DuplicateTeam(team.clone()));
                }
            }
        }
        Ok(Bracket { pairings })
    }

    pub fn pairings(&self) -> &[(String, String)] {
        &self.pairings
    }

    /// All participants, sorted by identifier.
    pub fn teams(&self) -> Vec<String> {
        let mut teams: Vec<String> = self
            .pairings
            .iter()
            .flat_map(|(a, b)| [a.clone(), b.clone()])
            .collect();
        teams.sort();
        teams
    }

    pub fn n_teams(&self) -> usize {
        self.pairings.len() * 2
    }

    /// Rounds to a champion: log2 of the field.
    pub fn n_rounds(&self) -> usize {
        self.n_teams().trailing_zeros() as usize
    }
}
