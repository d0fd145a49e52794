//! Bracket construction from a registered entrant list.

use super::byes;
use super::errors::BracketResult;
use super::layout::BracketLayout;
use super::models::{Entrant, Match, Slot, SlotEntrant, TournamentId};
use rand::Rng;
use rand::seq::SliceRandom;

/// Full set of matches for a tournament, ready to be stored
#[derive(Debug, Clone)]
pub struct BracketPlan {
    pub layout: BracketLayout,
    /// Every match of every round, BYEs already resolved
    pub matches: Vec<Match>,
    /// Entrants left without a first-round seat
    pub unplaced: Vec<Entrant>,
    /// Matches completed at creation because of BYEs
    pub byes_resolved: usize,
}

/// Builds the elimination tree for one tournament
#[derive(Debug, Clone, Copy)]
pub struct BracketBuilder {
    tournament_id: TournamentId,
}

impl BracketBuilder {
    pub fn new(tournament_id: TournamentId) -> Self {
        Self { tournament_id }
    }

    /// Shuffle `entrants` into first-round seats and lay out every round.
    ///
    /// Seats `2i` and `2i + 1` meet in match `i + 1`; seats past the entrant
    /// list are BYEs. Later rounds start with both slots waiting.
    pub fn build<R>(&self, mut entrants: Vec<Entrant>, rng: &mut R) -> BracketResult<BracketPlan>
    where
        R: Rng + ?Sized,
    {
        let layout = BracketLayout::for_entrants(entrants.len())?;

        entrants.shuffle(rng);
        let unplaced = if entrants.len() > layout.seats() {
            entrants.split_off(layout.seats())
        } else {
            Vec::new()
        };

        let mut seats = entrants.iter().map(|e| Slot::Entrant(SlotEntrant::from(e)));
        let mut matches = Vec::with_capacity(layout.total_matches());

        for (round, count) in layout.rounds() {
            for number in 1..=count as u32 {
                let (slot1, slot2) = if round == layout.starting_round {
                    (
                        seats.next().unwrap_or(Slot::Bye),
                        seats.next().unwrap_or(Slot::Bye),
                    )
                } else {
                    (Slot::Tbd, Slot::Tbd)
                };
                matches.push(Match::draft(self.tournament_id, round, number, slot1, slot2));
            }
        }

        let byes_resolved = byes::resolve_byes(&mut matches);

        Ok(BracketPlan {
            layout,
            matches,
            unplaced,
            byes_resolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::errors::BracketError;
    use crate::bracket::models::Round;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn entrants(count: usize) -> Vec<Entrant> {
        (1..=count as i64)
            .map(|id| Entrant {
                id,
                tournament_id: 1,
                display_name: format!("Pair {id}"),
                member_ids: vec![id * 100, id * 100 + 1],
            })
            .collect()
    }

    fn build(count: usize, seed: u64) -> BracketPlan {
        BracketBuilder::new(1)
            .build(entrants(count), &mut StdRng::seed_from_u64(seed))
            .unwrap()
    }

    fn seated(plan: &BracketPlan) -> Vec<i64> {
        plan.matches
            .iter()
            .filter(|m| m.round == plan.layout.starting_round)
            .flat_map(|m| [&m.slot1, &m.slot2])
            .filter_map(|s| s.entrant().map(|e| e.entrant_id))
            .collect()
    }

    #[test]
    fn test_two_entrants_play_the_final() {
        let plan = build(2, 7);
        assert_eq!(plan.matches.len(), 1);
        assert_eq!(plan.matches[0].round, Round::Final);
        assert!(plan.matches[0].is_playable());
        assert_eq!(plan.byes_resolved, 0);
    }

    #[test]
    fn test_three_entrants_get_one_bye() {
        let plan = build(3, 11);
        assert_eq!(plan.matches.len(), 3);
        assert_eq!(plan.byes_resolved, 1);

        let semis: Vec<_> = plan
            .matches
            .iter()
            .filter(|m| m.round == Round::Semifinals)
            .collect();
        assert_eq!(semis.iter().filter(|m| m.is_walkover()).count(), 1);
        assert_eq!(semis.iter().filter(|m| m.is_playable()).count(), 1);

        let fin = plan.matches.iter().find(|m| m.round == Round::Final).unwrap();
        let filled = [&fin.slot1, &fin.slot2]
            .into_iter()
            .filter(|s| s.entrant().is_some())
            .count();
        assert_eq!(filled, 1);
    }

    #[test]
    fn test_full_sixteen_has_no_byes() {
        let plan = build(16, 3);
        assert_eq!(plan.matches.len(), 15);
        assert_eq!(plan.byes_resolved, 0);
        assert!(plan.unplaced.is_empty());
        assert_eq!(
            plan.matches
                .iter()
                .filter(|m| m.round == Round::RoundOf16 && m.is_playable())
                .count(),
            8
        );
    }

    #[test]
    fn test_every_entrant_seated_once() {
        for count in 2..=16 {
            let plan = build(count, count as u64);
            let ids = seated(&plan);
            let unique: HashSet<_> = ids.iter().copied().collect();
            assert_eq!(ids.len(), count, "count = {count}");
            assert_eq!(unique.len(), count, "count = {count}");
        }
    }

    #[test]
    fn test_oversized_field_reports_unplaced() {
        let plan = build(20, 5);
        assert_eq!(plan.layout.bracket_size, 32);
        assert_eq!(plan.unplaced.len(), 4);
        assert_eq!(seated(&plan).len(), 16);

        let placed: HashSet<_> = seated(&plan).into_iter().collect();
        assert!(plan.unplaced.iter().all(|e| !placed.contains(&e.id)));
    }

    #[test]
    fn test_same_seed_same_draw() {
        let a = build(12, 42);
        let b = build(12, 42);
        assert_eq!(seated(&a), seated(&b));
    }

    #[test]
    fn test_rejects_bad_sizes() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = BracketBuilder::new(1).build(entrants(1), &mut rng).unwrap_err();
        assert!(matches!(err, BracketError::InsufficientEntrants { .. }));

        let err = BracketBuilder::new(1).build(entrants(33), &mut rng).unwrap_err();
        assert!(matches!(err, BracketError::UnsupportedSize { .. }));
    }
}
