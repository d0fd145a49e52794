//! BYE resolution.
//!
//! A match holding one entrant and one BYE completes immediately and the
//! entrant advances. Two BYEs make a void match that forwards a BYE, so a
//! cascade can run through several rounds (five entrants on an eight-slot
//! bracket, for instance).

use super::advancement::{self, Placement};
use super::models::{Match, Round};

/// Settle every BYE match in `matches` and cascade the results forward.
///
/// Rounds are processed in ladder order so a match is only settled after
/// every match feeding it. Returns the number of matches completed.
pub fn resolve_byes(matches: &mut [Match]) -> usize {
    let mut resolved = 0;

    for round in Round::LADDER {
        for m in matches.iter_mut().filter(|m| m.round == round) {
            if m.settle_byes() {
                resolved += 1;
            }
        }

        let carried: Vec<_> = matches
            .iter()
            .filter(|m| m.round == round)
            .filter_map(|m| {
                let slot = m.carried_slot()?;
                let target = advancement::successor(m.round, m.match_number)?;
                Some((target, slot))
            })
            .collect();

        for (target, slot) in carried {
            let Some(next) = matches
                .iter_mut()
                .find(|m| m.round == target.round && m.match_number == target.match_number)
            else {
                continue;
            };
            if advancement::place(next, target.position, slot) == Placement::Refused {
                log::warn!(
                    "Successor {} #{} already decided while resolving BYEs",
                    target.round,
                    target.match_number
                );
            }
        }
    }

    resolved
}
