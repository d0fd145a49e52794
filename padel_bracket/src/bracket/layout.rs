//! Bracket size and starting round selection.

use super::errors::{BracketError, BracketResult};
use super::models::Round;

/// Fewest entrants a bracket can be built for
pub const MIN_ENTRANTS: usize = 2;

/// Most entrants accepted at registration
pub const MAX_ENTRANTS: usize = 32;

/// Shape of a bracket derived from its entrant count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketLayout {
    /// Smallest power of two holding every entrant
    pub bracket_size: usize,
    /// Round the bracket starts at
    pub starting_round: Round,
    /// Matches created in the starting round
    pub first_round_matches: usize,
}

impl BracketLayout {
    /// Select the bracket shape for `entrants` registered entrants.
    ///
    /// A 32-slot bracket still starts at the round of 16 since the ladder has
    /// no deeper round; only 16 entrants get a seat in that case.
    pub fn for_entrants(entrants: usize) -> BracketResult<Self> {
        if entrants < MIN_ENTRANTS {
            return Err(BracketError::InsufficientEntrants {
                needed: MIN_ENTRANTS,
                current: entrants,
            });
        }
        if entrants > MAX_ENTRANTS {
            return Err(BracketError::UnsupportedSize {
                max: MAX_ENTRANTS,
                current: entrants,
            });
        }

        let bracket_size = entrants.next_power_of_two();
        let (starting_round, first_round_matches) = match bracket_size {
            2 => (Round::Final, 1),
            4 => (Round::Semifinals, 2),
            8 => (Round::Quarterfinals, 4),
            _ => (Round::RoundOf16, 8),
        };

        Ok(Self {
            bracket_size,
            starting_round,
            first_round_matches,
        })
    }

    /// Entrants that get a first-round seat
    pub fn seats(&self) -> usize {
        self.first_round_matches * 2
    }

    /// Rounds played, with the match count of each
    pub fn rounds(&self) -> Vec<(Round, usize)> {
        let mut rounds = Vec::with_capacity(4);
        let mut round = Some(self.starting_round);
        let mut count = self.first_round_matches;

        while let Some(current) = round {
            rounds.push((current, count));
            round = current.next();
            count = (count / 2).max(1);
        }
        rounds
    }

    pub fn total_matches(&self) -> usize {
        self.rounds().iter().map(|(_, count)| count).sum()
    }
}
