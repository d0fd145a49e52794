//! In-memory record store.
//!
//! Implements both repository traits behind a single mutex so every trait
//! method is one critical section. Used by tests, benches and the server when
//! it runs without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::repository::{BracketRepository, RankingRepository};
use crate::bracket::{
    BracketError, BracketResult, Category, Entrant, EntrantId, Match, MatchId, MemberId, Round,
    Tournament, TournamentId, TournamentStatus,
};
use crate::ranking::{CategoryPoints, MemberStanding, PointsAward, PointsHistoryEntry};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    tournaments: BTreeMap<TournamentId, Tournament>,
    entrants: BTreeMap<EntrantId, Entrant>,
    matches: BTreeMap<MatchId, Match>,
    members: BTreeMap<MemberId, MemberStanding>,
    history: Vec<PointsHistoryEntry>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn tournament(&self, tournament_id: TournamentId) -> BracketResult<&Tournament> {
        self.tournaments
            .get(&tournament_id)
            .ok_or(BracketError::TournamentNotFound(tournament_id))
    }

    fn tournament_matches(&self, tournament_id: TournamentId) -> Vec<Match> {
        let mut matches: Vec<_> = self
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.round, m.match_number));
        matches
    }
}

/// Record store kept in process memory
#[derive(Default)]
pub struct InMemoryBracketRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryBracketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a member with no points
    pub fn add_member(&self, display_name: &str) -> MemberId {
        let mut state = self.state();
        let id = state.next_id();
        state.members.insert(
            id,
            MemberStanding {
                id,
                display_name: display_name.to_string(),
                total_points: 0,
                tournaments_played: 0,
                points_by_category: CategoryPoints::default(),
            },
        );
        id
    }

    /// Create an `open` tournament
    pub fn add_tournament(&self, name: &str, category: Category) -> TournamentId {
        let mut state = self.state();
        let id = state.next_id();
        state.tournaments.insert(
            id,
            Tournament {
                id,
                name: name.to_string(),
                category,
                status: TournamentStatus::Open,
                created_at: Utc::now(),
            },
        );
        id
    }

    /// Register an entrant made of `member_ids`
    pub fn add_entrant(
        &self,
        tournament_id: TournamentId,
        display_name: &str,
        member_ids: &[MemberId],
    ) -> EntrantId {
        let mut state = self.state();
        let id = state.next_id();
        state.entrants.insert(
            id,
            Entrant {
                id,
                tournament_id,
                display_name: display_name.to_string(),
                member_ids: member_ids.to_vec(),
            },
        );
        id
    }

    /// Force a tournament status, for administrative resets
    pub fn set_tournament_status(
        &self,
        tournament_id: TournamentId,
        status: TournamentStatus,
    ) -> BracketResult<()> {
        let mut state = self.state();
        let tournament = state
            .tournaments
            .get_mut(&tournament_id)
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;
        tournament.status = status;
        Ok(())
    }
}

#[async_trait]
impl BracketRepository for InMemoryBracketRepository {
    async fn get_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        self.state().tournament(tournament_id).cloned()
    }

    async fn list_entrants(&self, tournament_id: TournamentId) -> BracketResult<Vec<Entrant>> {
        Ok(self
            .state()
            .entrants
            .values()
            .filter(|e| e.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn replace_bracket(
        &self,
        tournament_id: TournamentId,
        matches: &[Match],
    ) -> BracketResult<Vec<Match>> {
        let mut state = self.state();

        let status = state.tournament(tournament_id)?.status;
        if status != TournamentStatus::Open {
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::Open,
                actual: status,
            });
        }

        let played = state
            .matches
            .values()
            .any(|m| m.tournament_id == tournament_id && m.is_completed() && m.is_playable());
        if played {
            return Err(BracketError::ResultsAlreadyRecorded(tournament_id));
        }

        state.matches.retain(|_, m| m.tournament_id != tournament_id);

        let now = Utc::now();
        for m in matches {
            let id = state.next_id();
            let stored = Match {
                id,
                tournament_id,
                version: 0,
                created_at: now,
                ..m.clone()
            };
            state.matches.insert(id, stored);
        }

        if let Some(tournament) = state.tournaments.get_mut(&tournament_id) {
            tournament.status = TournamentStatus::InProgress;
        }

        Ok(state.tournament_matches(tournament_id))
    }

    async fn get_match(&self, match_id: MatchId) -> BracketResult<Match> {
        self.state()
            .matches
            .get(&match_id)
            .cloned()
            .ok_or(BracketError::MatchNotFound(match_id))
    }

    async fn find_match(
        &self,
        tournament_id: TournamentId,
        round: Round,
        match_number: u32,
    ) -> BracketResult<Option<Match>> {
        Ok(self
            .state()
            .matches
            .values()
            .find(|m| {
                m.tournament_id == tournament_id
                    && m.round == round
                    && m.match_number == match_number
            })
            .cloned())
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        Ok(self.state().tournament_matches(tournament_id))
    }

    async fn update_match(&self, m: &Match) -> BracketResult<Match> {
        let mut state = self.state();
        let stored = state
            .matches
            .get_mut(&m.id)
            .ok_or(BracketError::MatchNotFound(m.id))?;

        if stored.version != m.version {
            return Err(BracketError::Conflict(m.id));
        }

        *stored = Match {
            version: m.version + 1,
            tournament_id: stored.tournament_id,
            round: stored.round,
            match_number: stored.match_number,
            created_at: stored.created_at,
            ..m.clone()
        };
        Ok(stored.clone())
    }

    async fn finalize_tournament(
        &self,
        tournament_id: TournamentId,
        awards: &[PointsAward],
    ) -> BracketResult<bool> {
        let mut state = self.state();

        let tournament = state.tournament(tournament_id)?;
        if tournament.status != TournamentStatus::InProgress {
            return Ok(false);
        }
        let tournament_name = tournament.name.clone();

        if let Some(missing) = awards
            .iter()
            .find(|a| !state.members.contains_key(&a.member_id))
        {
            return Err(BracketError::MemberNotFound(missing.member_id));
        }

        let now = Utc::now();
        for award in awards {
            let credited = state
                .history
                .iter()
                .any(|h| h.member_id == award.member_id && h.tournament_id == tournament_id);
            if credited {
                log::warn!(
                    "Member {} already credited for tournament {}",
                    award.member_id,
                    tournament_id
                );
                continue;
            }

            let id = state.next_id();
            state.history.push(PointsHistoryEntry {
                id,
                member_id: award.member_id,
                tournament_id,
                tournament_name: tournament_name.clone(),
                category: award.category,
                points: award.points,
                result: award.result,
                created_at: now,
            });

            if let Some(member) = state.members.get_mut(&award.member_id) {
                member.total_points += award.points;
                member.tournaments_played += 1;
                member.points_by_category.add(award.category, award.points);
            }
        }

        if let Some(tournament) = state.tournaments.get_mut(&tournament_id) {
            tournament.status = TournamentStatus::Finished;
        }
        Ok(true)
    }
}

#[async_trait]
impl RankingRepository for InMemoryBracketRepository {
    async fn get_member(&self, member_id: MemberId) -> BracketResult<MemberStanding> {
        self.state()
            .members
            .get(&member_id)
            .cloned()
            .ok_or(BracketError::MemberNotFound(member_id))
    }

    async fn ranked_members(
        &self,
        limit: i64,
        category: Option<Category>,
    ) -> BracketResult<Vec<MemberStanding>> {
        let points_of = |m: &MemberStanding| match category {
            Some(category) => m.points_by_category[category],
            None => m.total_points,
        };

        let mut members: Vec<_> = self
            .state()
            .members
            .values()
            .filter(|m| points_of(m) > 0)
            .cloned()
            .collect();
        members.sort_by(|a, b| points_of(b).cmp(&points_of(a)).then(a.id.cmp(&b.id)));
        members.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(members)
    }

    async fn points_history(
        &self,
        member_id: MemberId,
        limit: i64,
    ) -> BracketResult<Vec<PointsHistoryEntry>> {
        // One finalization shares a timestamp, ties fall back to insertion order
        let mut entries: Vec<_> = self
            .state()
            .history
            .iter()
            .filter(|h| h.member_id == member_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        entries.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{MatchStatus, ResultLabel, Slot};

    fn award(member_id: MemberId, points: i64, result: ResultLabel) -> PointsAward {
        PointsAward {
            member_id,
            entrant_id: 0,
            points,
            result,
            category: Category::Fourth,
        }
    }

    #[tokio::test]
    async fn test_replace_bracket_moves_to_in_progress() {
        let repo = InMemoryBracketRepository::new();
        let tid = repo.add_tournament("Copa Otoño", Category::Fourth);

        let drafts = vec![Match::draft(tid, Round::Final, 1, Slot::Tbd, Slot::Tbd)];
        let stored = repo.replace_bracket(tid, &drafts).await.unwrap();

        assert_eq!(stored.len(), 1);
        assert!(stored[0].id > 0);
        assert_eq!(
            repo.get_tournament(tid).await.unwrap().status,
            TournamentStatus::InProgress
        );

        let err = repo.replace_bracket(tid, &drafts).await.unwrap_err();
        assert!(matches!(err, BracketError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_update_match_checks_version() {
        let repo = InMemoryBracketRepository::new();
        let tid = repo.add_tournament("Copa Otoño", Category::Fourth);
        let drafts = vec![Match::draft(tid, Round::Final, 1, Slot::Tbd, Slot::Tbd)];
        let stored = repo.replace_bracket(tid, &drafts).await.unwrap().remove(0);

        let mut edit = stored.clone();
        edit.status = MatchStatus::Completed;
        let updated = repo.update_match(&edit).await.unwrap();
        assert_eq!(updated.version, stored.version + 1);

        let err = repo.update_match(&edit).await.unwrap_err();
        assert!(matches!(err, BracketError::Conflict(id) if id == stored.id));

        let mut missing = stored;
        missing.id = 9999;
        let err = repo.update_match(&missing).await.unwrap_err();
        assert!(matches!(err, BracketError::MatchNotFound(9999)));
    }

    #[tokio::test]
    async fn test_finalize_applies_once() {
        let repo = InMemoryBracketRepository::new();
        let member = repo.add_member("Paula");
        let tid = repo.add_tournament("Copa Otoño", Category::Fourth);
        repo.set_tournament_status(tid, TournamentStatus::InProgress)
            .unwrap();

        let awards = vec![award(member, 600, ResultLabel::Finalist)];
        assert!(repo.finalize_tournament(tid, &awards).await.unwrap());
        assert!(!repo.finalize_tournament(tid, &awards).await.unwrap());

        let standing = repo.get_member(member).await.unwrap();
        assert_eq!(standing.total_points, 600);
        assert_eq!(standing.tournaments_played, 1);
        assert_eq!(standing.points_by_category[Category::Fourth], 600);

        let history = repo.points_history(member, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tournament_name, "Copa Otoño");
        assert_eq!(history[0].result, ResultLabel::Finalist);
    }

    #[tokio::test]
    async fn test_finalize_rejects_unknown_member_without_changes() {
        let repo = InMemoryBracketRepository::new();
        let member = repo.add_member("Paula");
        let tid = repo.add_tournament("Copa Otoño", Category::Fourth);
        repo.set_tournament_status(tid, TournamentStatus::InProgress)
            .unwrap();

        let awards = vec![
            award(member, 1000, ResultLabel::Champion),
            award(4242, 600, ResultLabel::Finalist),
        ];
        let err = repo.finalize_tournament(tid, &awards).await.unwrap_err();
        assert!(matches!(err, BracketError::MemberNotFound(4242)));

        assert_eq!(repo.get_member(member).await.unwrap().total_points, 0);
        assert_eq!(
            repo.get_tournament(tid).await.unwrap().status,
            TournamentStatus::InProgress
        );
    }

    #[tokio::test]
    async fn test_ranked_members_by_category() {
        let repo = InMemoryBracketRepository::new();
        let a = repo.add_member("A");
        let b = repo.add_member("B");
        let _idle = repo.add_member("Idle");

        for (name, category, awards) in [
            ("T1", Category::Fourth, vec![award(a, 360, ResultLabel::Semifinalist)]),
            ("T2", Category::Second, vec![award(b, 1000, ResultLabel::Champion)]),
        ] {
            let tid = repo.add_tournament(name, category);
            repo.set_tournament_status(tid, TournamentStatus::InProgress)
                .unwrap();
            let awards: Vec<_> = awards
                .into_iter()
                .map(|aw| PointsAward { category, ..aw })
                .collect();
            repo.finalize_tournament(tid, &awards).await.unwrap();
        }

        let all = repo.ranked_members(10, None).await.unwrap();
        assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![b, a]);

        let fourth = repo.ranked_members(10, Some(Category::Fourth)).await.unwrap();
        assert_eq!(fourth.iter().map(|m| m.id).collect::<Vec<_>>(), vec![a]);

        let top = repo.ranked_members(1, None).await.unwrap();
        assert_eq!(top.len(), 1);
    }
}
