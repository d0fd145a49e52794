//! Completion detection and points allocation.
//!
//! Standings are recomputed from scratch over every completed match each time
//! the final is found completed, so the pass can be repeated safely.

use super::models::{EntrantId, Match, ResultLabel, Round, SlotEntrant, Tournament, TournamentId};
use crate::ranking::models::PointsAward;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Best result of one entrant in a finished tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub entrant: SlotEntrant,
    /// `None` while the entrant is still alive in an unfinished bracket
    pub label: Option<ResultLabel>,
}

impl Standing {
    pub fn points(&self) -> i64 {
        self.label.map_or(0, ResultLabel::points)
    }
}

/// Everything written when a tournament finishes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub tournament_id: TournamentId,
    pub standings: Vec<Standing>,
    pub awards: Vec<PointsAward>,
}

impl CompletionSummary {
    pub fn champion(&self) -> Option<&Standing> {
        self.standings
            .iter()
            .find(|s| s.label == Some(ResultLabel::Champion))
    }
}

/// Result of a completion check
#[derive(Debug, Clone)]
pub enum CompletionCheck {
    /// The final has not been played
    Pending,
    /// The tournament was finished by this check
    Finalized(CompletionSummary),
    /// Another writer already finished the tournament
    AlreadyFinished,
}

impl CompletionCheck {
    pub fn is_finished(&self) -> bool {
        !matches!(self, CompletionCheck::Pending)
    }

    pub fn into_summary(self) -> Option<CompletionSummary> {
        match self {
            CompletionCheck::Finalized(summary) => Some(summary),
            CompletionCheck::Pending | CompletionCheck::AlreadyFinished => None,
        }
    }
}

/// The single final-round match, if the bracket has one
pub fn final_match(matches: &[Match]) -> Option<&Match> {
    matches
        .iter()
        .find(|m| m.round == Round::Final && m.match_number == 1)
}

/// Best result of every entrant that played or walked over a match.
///
/// Winners are only labelled when they win the final; everyone else gets the
/// label of the round they lost in. Sorted by points, then entrant id.
pub fn compute_standings(matches: &[Match]) -> Vec<Standing> {
    let mut standings: HashMap<EntrantId, Standing> = HashMap::new();

    for m in matches.iter().filter(|m| m.is_completed()) {
        if let Some(winner) = m.winner() {
            let standing = standings
                .entry(winner.entrant_id)
                .or_insert_with(|| Standing {
                    entrant: winner.clone(),
                    label: None,
                });
            if m.round == Round::Final {
                standing.label = Some(ResultLabel::Champion);
            }
        }

        if let Some(loser) = m.loser() {
            let label = m.round.loser_label();
            standings
                .entry(loser.entrant_id)
                .and_modify(|s| s.label = Some(label))
                .or_insert_with(|| Standing {
                    entrant: loser.clone(),
                    label: Some(label),
                });
        }
    }

    let mut standings: Vec<_> = standings.into_values().collect();
    standings.sort_by(|a, b| {
        b.points()
            .cmp(&a.points())
            .then(a.entrant.entrant_id.cmp(&b.entrant.entrant_id))
    });
    standings
}

/// One award per member of every entrant with points
pub fn awards_for(tournament: &Tournament, standings: &[Standing]) -> Vec<PointsAward> {
    let category = tournament.category;
    standings
        .iter()
        .filter_map(|s| s.label.map(|label| (s, label)))
        .filter(|(_, label)| label.points() > 0)
        .flat_map(|(s, label)| {
            s.entrant.member_ids.iter().map(move |&member_id| PointsAward {
                member_id,
                entrant_id: s.entrant.entrant_id,
                points: label.points(),
                result: label,
                category,
            })
        })
        .collect()
}
