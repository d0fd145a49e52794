//! Winner advancement between rounds.
//!
//! Match `m` of a round feeds match `ceil(m / 2)` of the next round: odd
//! numbers fill slot 1 and even numbers fill slot 2.

use super::models::{Match, Round, Slot, SlotPosition};

/// Where the winner of a match is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advancement {
    pub round: Round,
    pub match_number: u32,
    pub position: SlotPosition,
}

/// Successor slot for match `match_number` of `round`, `None` for the final
pub fn successor(round: Round, match_number: u32) -> Option<Advancement> {
    let next = round.next()?;
    let position = if match_number % 2 == 1 {
        SlotPosition::First
    } else {
        SlotPosition::Second
    };

    Some(Advancement {
        round: next,
        match_number: match_number.div_ceil(2),
        position,
    })
}

/// Outcome of writing a slot into a successor match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The slot was written
    Applied,
    /// The slot already held the value
    Unchanged,
    /// The successor is already decided and was left alone
    Refused,
}

/// Write `slot` into `target` at `position`.
///
/// Writing the value a slot already holds is a no-op, which keeps repeated
/// advancement idempotent.
pub fn place(target: &mut Match, position: SlotPosition, slot: Slot) -> Placement {
    if *target.slot(position) == slot {
        return Placement::Unchanged;
    }
    if target.is_completed() {
        return Placement::Refused;
    }

    *target.slot_mut(position) = slot;
    Placement::Applied
}
