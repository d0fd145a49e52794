/// Property-based tests for bracket construction and advancement
///
/// These tests verify the shape of generated brackets and the advancement
/// mapping across every supported entrant count and many random draws.
use padel_bracket::bracket::{
    BracketBuilder, BracketPlan, Entrant, Match, Round, Slot, SlotPosition, successor,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;

fn entrants(count: usize) -> Vec<Entrant> {
    (1..=count as i64)
        .map(|id| Entrant {
            id,
            tournament_id: 1,
            display_name: format!("Entrant {id}"),
            member_ids: vec![id],
        })
        .collect()
}

fn build(count: usize, seed: u64) -> BracketPlan {
    BracketBuilder::new(1)
        .build(entrants(count), &mut StdRng::seed_from_u64(seed))
        .unwrap()
}

fn round_sizes(matches: &[Match]) -> Vec<(Round, usize)> {
    Round::LADDER
        .into_iter()
        .map(|r| (r, matches.iter().filter(|m| m.round == r).count()))
        .filter(|(_, n)| *n > 0)
        .collect()
}

fn find(matches: &[Match], round: Round, number: u32) -> Option<&Match> {
    matches
        .iter()
        .find(|m| m.round == round && m.match_number == number)
}

proptest! {
    #[test]
    fn test_complete_elimination_tree(count in 2usize..=32, seed in any::<u64>()) {
        let plan = build(count, seed);
        let sizes = round_sizes(&plan.matches);

        // Exactly one final, every round half the previous one
        prop_assert_eq!(sizes.last().copied(), Some((Round::Final, 1)));
        prop_assert_eq!(sizes[0].0, plan.layout.starting_round);
        for pair in sizes.windows(2) {
            prop_assert_eq!(pair[0].0.next(), Some(pair[1].0));
            prop_assert_eq!(pair[0].1 / 2, pair[1].1);
        }

        // Match numbers are contiguous from 1 within each round
        for (round, size) in &sizes {
            let numbers: HashSet<u32> = plan
                .matches
                .iter()
                .filter(|m| m.round == *round)
                .map(|m| m.match_number)
                .collect();
            let expected: HashSet<u32> = (1..=*size as u32).collect();
            prop_assert_eq!(numbers, expected);
        }
    }

    #[test]
    fn test_seats_and_unplaced_partition_entrants(count in 2usize..=32, seed in any::<u64>()) {
        let plan = build(count, seed);

        let seated: Vec<i64> = plan
            .matches
            .iter()
            .filter(|m| m.round == plan.layout.starting_round)
            .flat_map(|m| [&m.slot1, &m.slot2])
            .filter_map(|s| s.entrant().map(|e| e.entrant_id))
            .collect();
        let unplaced: Vec<i64> = plan.unplaced.iter().map(|e| e.id).collect();

        prop_assert_eq!(seated.len(), count.min(16));
        prop_assert_eq!(seated.len() + unplaced.len(), count);

        let all: HashSet<i64> = seated.iter().chain(&unplaced).copied().collect();
        prop_assert_eq!(all.len(), count);
    }

    #[test]
    fn test_byes_resolved_at_creation(count in 2usize..=32, seed in any::<u64>()) {
        let plan = build(count, seed);

        for m in &plan.matches {
            let has_bye = m.slot1.is_bye() || m.slot2.is_bye();
            let waiting = m.slot1.is_tbd() || m.slot2.is_tbd();
            if has_bye && !waiting {
                prop_assert!(m.is_completed(), "{} #{} not settled", m.round, m.match_number);
            }
            if let Some(winner) = m.winner_id {
                prop_assert!(m.entrant(winner).is_some());
            }
        }
    }

    #[test]
    fn test_completed_matches_feed_their_successor(count in 2usize..=32, seed in any::<u64>()) {
        let plan = build(count, seed);

        for m in plan.matches.iter().filter(|m| m.is_completed()) {
            let Some(target) = successor(m.round, m.match_number) else {
                continue;
            };
            let next = find(&plan.matches, target.round, target.match_number);
            prop_assert!(next.is_some());
            let next = next.unwrap();

            let expected = match m.winner() {
                Some(winner) => Slot::Entrant(winner.clone()),
                None => Slot::Bye,
            };
            prop_assert_eq!(next.slot(target.position), &expected);
        }
    }
}

#[test]
fn test_successor_mapping_exhaustive() {
    for round in [Round::RoundOf16, Round::Quarterfinals, Round::Semifinals] {
        let count = match round {
            Round::RoundOf16 => 8,
            Round::Quarterfinals => 4,
            _ => 2,
        };
        for m in 1..=count {
            let target = successor(round, m).unwrap();
            assert_eq!(Some(target.round), round.next());
            assert_eq!(target.match_number, m.div_ceil(2));
            let expected = if m % 2 == 1 {
                SlotPosition::First
            } else {
                SlotPosition::Second
            };
            assert_eq!(target.position, expected);
        }
    }
    assert!(successor(Round::Final, 1).is_none());
}
