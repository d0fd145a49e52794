//! Bracket manager driving generation, result recording and completion.

use super::{
    advancement::{self, Placement},
    builder::BracketBuilder,
    completion::{self, CompletionCheck, CompletionSummary},
    errors::{BracketError, BracketResult},
    models::{
        BracketView, EntrantId, GeneratedBracket, Match, MatchId, MatchStatus, RecordedResult,
        SetScore, Tournament, TournamentId, TournamentStatus,
    },
};
use crate::db::BracketRepository;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex, PoisonError};

/// Times a successor write is retried after losing a version race
const MAX_PLACEMENT_ATTEMPTS: u32 = 3;

/// Sets a recorded result may carry
const MIN_SETS: usize = 2;
const MAX_SETS: usize = 3;

/// Bracket manager
#[derive(Clone)]
pub struct BracketManager {
    repo: Arc<dyn BracketRepository>,
    rng: Arc<Mutex<StdRng>>,
}

impl BracketManager {
    /// Create a new bracket manager drawing seats from OS entropy
    pub fn new(repo: Arc<dyn BracketRepository>) -> Self {
        Self {
            repo,
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    /// Create a bracket manager with a reproducible draw
    pub fn with_seed(repo: Arc<dyn BracketRepository>, seed: u64) -> Self {
        Self {
            repo,
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Build and store the bracket of an `open` tournament.
    ///
    /// Any previous bracket is replaced. The tournament moves to
    /// `in_progress` in the same store operation.
    pub async fn generate_bracket(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<GeneratedBracket> {
        let tournament = self.repo.get_tournament(tournament_id).await?;
        if tournament.status != TournamentStatus::Open {
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::Open,
                actual: tournament.status,
            });
        }

        let entrants = self.repo.list_entrants(tournament_id).await?;
        let plan = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            BracketBuilder::new(tournament_id).build(entrants, &mut *rng)?
        };

        let unplaced: Vec<EntrantId> = plan.unplaced.iter().map(|e| e.id).collect();
        if !unplaced.is_empty() {
            log::warn!(
                "Tournament {}: {} entrants left without a first-round seat: {:?}",
                tournament_id,
                unplaced.len(),
                unplaced
            );
        }

        let stored = self.repo.replace_bracket(tournament_id, &plan.matches).await?;

        log::info!(
            "Generated {}-slot bracket for tournament {} starting at {} ({} matches, {} BYEs resolved)",
            plan.layout.bracket_size,
            tournament_id,
            plan.layout.starting_round,
            stored.len(),
            plan.byes_resolved
        );

        Ok(GeneratedBracket::new(
            tournament_id,
            plan.layout,
            stored.len(),
            plan.byes_resolved,
            unplaced,
        ))
    }

    /// Record the result of a match and push the winner forward.
    ///
    /// Every precondition is checked before anything is written. A completed
    /// match may be corrected, winner or sets, while its successor has not
    /// been played. Resubmitting an identical result is always accepted.
    pub async fn record_result(
        &self,
        match_id: MatchId,
        sets: Vec<SetScore>,
        winner_id: EntrantId,
    ) -> BracketResult<RecordedResult> {
        let mut m = self.repo.get_match(match_id).await?;
        let tournament = self.repo.get_tournament(m.tournament_id).await?;

        if tournament.status != TournamentStatus::InProgress {
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::InProgress,
                actual: tournament.status,
            });
        }
        let winner = m
            .entrant(winner_id)
            .cloned()
            .ok_or(BracketError::InvalidWinner {
                match_id,
                winner_id,
            })?;
        if !m.is_playable() {
            return Err(BracketError::MatchNotPlayable(match_id));
        }
        if !(MIN_SETS..=MAX_SETS).contains(&sets.len()) {
            return Err(BracketError::InvalidSets(sets.len()));
        }

        // A played match may only change while its successor is pending
        if m.is_completed() && (m.winner_id != Some(winner_id) || m.sets != sets) {
            self.ensure_successor_pending(&m).await?;
            log::info!(
                "Correcting match {}: winner {:?} -> {}, sets {:?} -> {:?}",
                match_id,
                m.winner_id,
                winner_id,
                m.sets,
                sets
            );
        }

        m.sets = sets;
        m.winner_id = Some(winner.entrant_id);
        m.winner_name = Some(winner.display_name.clone());
        m.status = MatchStatus::Completed;

        let recorded = self.repo.update_match(&m).await.inspect_err(|e| {
            if matches!(e, BracketError::Conflict(_)) {
                log::warn!("Concurrent result submission for match {} rejected", match_id);
            }
        })?;

        log::info!(
            "Recorded {} #{} of tournament {}: {} won",
            recorded.round,
            recorded.match_number,
            recorded.tournament_id,
            winner.display_name
        );

        self.advance(&recorded).await?;
        let completion = self.check_completion(&tournament).await?;

        Ok(RecordedResult {
            match_id,
            winner_id: winner.entrant_id,
            winner_name: winner.display_name,
            tournament_finished: completion.is_finished(),
        })
    }

    /// Matches of a tournament grouped by round
    pub async fn get_matches(&self, tournament_id: TournamentId) -> BracketResult<BracketView> {
        self.repo.get_tournament(tournament_id).await?;
        let matches = self.repo.list_matches(tournament_id).await?;
        Ok(BracketView::group(tournament_id, matches))
    }

    /// Replay advancement and the completion check for a tournament.
    ///
    /// Picks up after a failure between recording a result and finishing the
    /// tournament. Returns the summary when this call finished it.
    pub async fn reconcile_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<CompletionSummary>> {
        let tournament = self.repo.get_tournament(tournament_id).await?;
        if tournament.status != TournamentStatus::InProgress {
            log::debug!(
                "Nothing to reconcile for tournament {} ({})",
                tournament_id,
                tournament.status
            );
            return Ok(None);
        }

        let matches = self.repo.list_matches(tournament_id).await?;
        for m in matches.iter().filter(|m| m.is_completed()) {
            self.advance(m).await?;
        }

        let completion = self.check_completion(&tournament).await?;
        if let CompletionCheck::Finalized(summary) = &completion {
            log::info!(
                "Reconciliation finished tournament {} ({} awards)",
                tournament_id,
                summary.awards.len()
            );
        }
        Ok(completion.into_summary())
    }

    async fn ensure_successor_pending(&self, m: &Match) -> BracketResult<()> {
        let Some(target) = advancement::successor(m.round, m.match_number) else {
            return Ok(());
        };
        let next = self
            .repo
            .find_match(m.tournament_id, target.round, target.match_number)
            .await?;
        match next {
            Some(next) if next.is_completed() => Err(BracketError::SuccessorDecided(next.id)),
            _ => Ok(()),
        }
    }

    /// Carry the outcome of `m` forward until a successor is left pending
    async fn advance(&self, m: &Match) -> BracketResult<()> {
        let mut current = m.clone();
        while let Some(next) = self.place_winner(&current).await? {
            if !next.is_completed() {
                break;
            }
            log::debug!(
                "BYE cascade: {} #{} of tournament {} settled",
                next.round,
                next.match_number,
                next.tournament_id
            );
            current = next;
        }
        Ok(())
    }

    /// Write the outcome of `m` into its successor slot.
    ///
    /// Returns the successor as stored, or `None` for the final, a pending
    /// match or a missing successor.
    async fn place_winner(&self, m: &Match) -> BracketResult<Option<Match>> {
        let Some(slot) = m.carried_slot() else {
            return Ok(None);
        };
        let Some(target) = advancement::successor(m.round, m.match_number) else {
            return Ok(None);
        };

        let mut attempt = 0;
        loop {
            attempt += 1;

            let Some(mut next) = self
                .repo
                .find_match(m.tournament_id, target.round, target.match_number)
                .await?
            else {
                log::warn!(
                    "Tournament {}: successor {} #{} of match {} is missing",
                    m.tournament_id,
                    target.round,
                    target.match_number,
                    m.id
                );
                return Ok(None);
            };

            let placed = match advancement::place(&mut next, target.position, slot.clone()) {
                Placement::Applied => true,
                Placement::Unchanged => false,
                Placement::Refused => return Err(BracketError::SuccessorDecided(next.id)),
            };
            let settled = next.settle_byes();
            if !placed && !settled {
                return Ok(Some(next));
            }

            match self.repo.update_match(&next).await {
                Ok(stored) => return Ok(Some(stored)),
                Err(BracketError::Conflict(id)) if attempt < MAX_PLACEMENT_ATTEMPTS => {
                    log::warn!(
                        "Version conflict placing winner into match {}, retrying ({}/{})",
                        id,
                        attempt,
                        MAX_PLACEMENT_ATTEMPTS
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Finish the tournament once its final is completed
    async fn check_completion(&self, tournament: &Tournament) -> BracketResult<CompletionCheck> {
        let matches = self.repo.list_matches(tournament.id).await?;
        let final_done = completion::final_match(&matches).is_some_and(Match::is_completed);
        if !final_done {
            return Ok(CompletionCheck::Pending);
        }
        if tournament.status == TournamentStatus::Finished {
            return Ok(CompletionCheck::AlreadyFinished);
        }

        let standings = completion::compute_standings(&matches);
        let awards = completion::awards_for(tournament, &standings);

        if !self.repo.finalize_tournament(tournament.id, &awards).await? {
            log::debug!("Tournament {} was already finished", tournament.id);
            return Ok(CompletionCheck::AlreadyFinished);
        }

        log::info!(
            "Tournament {} '{}' finished: {} points awards allocated",
            tournament.id,
            tournament.name,
            awards.len()
        );

        Ok(CompletionCheck::Finalized(CompletionSummary {
            tournament_id: tournament.id,
            standings,
            awards,
        }))
    }
}
