//! Repository trait definitions for testability and dependency injection.
//!
//! The bracket and ranking managers only talk to storage through these traits,
//! so the same engine runs against PostgreSQL or the in-memory store.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;

use crate::bracket::{
    BracketError, BracketResult, Category, Entrant, Match, MatchId, MemberId, Round, SetScore,
    Slot, SlotEntrant, Tournament, TournamentId, TournamentStatus,
};
use crate::ranking::{CategoryPoints, MemberStanding, PointsAward, PointsHistoryEntry};

/// Trait for bracket storage operations
#[async_trait]
pub trait BracketRepository: Send + Sync {
    /// Get a tournament, `TournamentNotFound` if absent
    async fn get_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament>;

    /// Entrants registered for a tournament, in registration order
    async fn list_entrants(&self, tournament_id: TournamentId) -> BracketResult<Vec<Entrant>>;

    /// Atomically replace every match of an `open` tournament and move it to
    /// `in_progress`.
    ///
    /// Fails with `InvalidState` unless the tournament is `open` and with
    /// `ResultsAlreadyRecorded` if a played (non-BYE) match exists.
    async fn replace_bracket(
        &self,
        tournament_id: TournamentId,
        matches: &[Match],
    ) -> BracketResult<Vec<Match>>;

    /// Get a match, `MatchNotFound` if absent
    async fn get_match(&self, match_id: MatchId) -> BracketResult<Match>;

    /// Find a match by its bracket coordinates
    async fn find_match(
        &self,
        tournament_id: TournamentId,
        round: Round,
        match_number: u32,
    ) -> BracketResult<Option<Match>>;

    /// Every match of a tournament ordered by round then match number
    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>>;

    /// Write a match if its stored version still equals `m.version`.
    ///
    /// Returns the stored match with the bumped version, or `Conflict` when
    /// another writer got there first.
    async fn update_match(&self, m: &Match) -> BracketResult<Match>;

    /// Apply the points awards and move the tournament from `in_progress` to
    /// `finished` in one step.
    ///
    /// Returns `false` and applies nothing when the tournament is no longer
    /// `in_progress`.
    async fn finalize_tournament(
        &self,
        tournament_id: TournamentId,
        awards: &[PointsAward],
    ) -> BracketResult<bool>;
}

/// Trait for ranking read operations
#[async_trait]
pub trait RankingRepository: Send + Sync {
    /// Get a member's standing, `MemberNotFound` if absent
    async fn get_member(&self, member_id: MemberId) -> BracketResult<MemberStanding>;

    /// Members with points, best first.
    ///
    /// With a category, ordered by that category's accumulator and limited to
    /// members with points in it. Ties are broken by member id.
    async fn ranked_members(
        &self,
        limit: i64,
        category: Option<Category>,
    ) -> BracketResult<Vec<MemberStanding>>;

    /// Points history of a member, newest first
    async fn points_history(
        &self,
        member_id: MemberId,
        limit: i64,
    ) -> BracketResult<Vec<PointsHistoryEntry>>;
}

const MATCH_COLUMNS: &str = "id, tournament_id, round, match_number, \
     slot1_kind, slot1_entrant_id, slot1_name, slot1_members, \
     slot2_kind, slot2_entrant_id, slot2_name, slot2_members, \
     sets, winner_id, winner_name, status, version, created_at";

const MEMBER_COLUMNS: &str = "m.id, m.display_name, m.total_points, m.tournaments_played";

/// Column values of one match slot
struct SlotColumns {
    kind: &'static str,
    entrant_id: Option<i64>,
    name: Option<String>,
    members: Option<Vec<i64>>,
}

impl From<&Slot> for SlotColumns {
    fn from(slot: &Slot) -> Self {
        match slot {
            Slot::Entrant(entrant) => Self {
                kind: "entrant",
                entrant_id: Some(entrant.entrant_id),
                name: Some(entrant.display_name.clone()),
                members: Some(entrant.member_ids.clone()),
            },
            Slot::Bye => Self {
                kind: "bye",
                entrant_id: None,
                name: None,
                members: None,
            },
            Slot::Tbd => Self {
                kind: "tbd",
                entrant_id: None,
                name: None,
                members: None,
            },
        }
    }
}

fn slot_from_row(row: &PgRow, prefix: &str) -> BracketResult<Slot> {
    let kind: String = row.get(format!("{prefix}_kind").as_str());
    match kind.as_str() {
        "bye" => Ok(Slot::Bye),
        "tbd" => Ok(Slot::Tbd),
        "entrant" => {
            let entrant_id: Option<i64> = row.get(format!("{prefix}_entrant_id").as_str());
            let name: Option<String> = row.get(format!("{prefix}_name").as_str());
            let members: Option<Vec<i64>> = row.get(format!("{prefix}_members").as_str());

            let entrant_id = entrant_id.ok_or_else(|| BracketError::UnknownValue {
                kind: "slot",
                value: format!("{prefix} entrant without id"),
            })?;
            Ok(Slot::Entrant(SlotEntrant {
                entrant_id,
                display_name: name.unwrap_or_default(),
                member_ids: members.unwrap_or_default(),
            }))
        }
        _ => Err(BracketError::UnknownValue {
            kind: "slot",
            value: kind,
        }),
    }
}

fn match_from_row(row: &PgRow) -> BracketResult<Match> {
    let sets: Vec<SetScore> = serde_json::from_value(row.get("sets"))?;

    Ok(Match {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        round: row.get::<String, _>("round").parse()?,
        match_number: row.get::<i32, _>("match_number") as u32,
        slot1: slot_from_row(row, "slot1")?,
        slot2: slot_from_row(row, "slot2")?,
        sets,
        winner_id: row.get("winner_id"),
        winner_name: row.get("winner_name"),
        status: row.get::<String, _>("status").parse()?,
        version: row.get("version"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}

fn member_from_row(row: &PgRow, points_by_category: CategoryPoints) -> MemberStanding {
    MemberStanding {
        id: row.get("id"),
        display_name: row.get("display_name"),
        total_points: row.get("total_points"),
        tournaments_played: row.get("tournaments_played"),
        points_by_category,
    }
}

/// Default PostgreSQL implementation of `BracketRepository` and `RankingRepository`
#[derive(Clone)]
pub struct PgBracketRepository {
    pool: PgPool,
}

impl PgBracketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_match(
        tx: &mut Transaction<'_, Postgres>,
        m: &Match,
    ) -> BracketResult<Match> {
        let slot1 = SlotColumns::from(&m.slot1);
        let slot2 = SlotColumns::from(&m.slot2);

        let row = sqlx::query(&format!(
            "INSERT INTO matches (tournament_id, round, match_number,
                 slot1_kind, slot1_entrant_id, slot1_name, slot1_members,
                 slot2_kind, slot2_entrant_id, slot2_name, slot2_members,
                 sets, winner_id, winner_name, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {MATCH_COLUMNS}"
        ))
        .bind(m.tournament_id)
        .bind(m.round.as_str())
        .bind(m.match_number as i32)
        .bind(slot1.kind)
        .bind(slot1.entrant_id)
        .bind(slot1.name)
        .bind(slot1.members)
        .bind(slot2.kind)
        .bind(slot2.entrant_id)
        .bind(slot2.name)
        .bind(slot2.members)
        .bind(serde_json::to_value(&m.sets)?)
        .bind(m.winner_id)
        .bind(&m.winner_name)
        .bind(m.status.as_str())
        .fetch_one(&mut **tx)
        .await?;

        match_from_row(&row)
    }

    async fn load_category_points(
        &self,
        member_ids: &[MemberId],
    ) -> BracketResult<HashMap<MemberId, CategoryPoints>> {
        let rows = sqlx::query(
            "SELECT member_id, category, points FROM member_category_points
             WHERE member_id = ANY($1)",
        )
        .bind(member_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut points: HashMap<MemberId, CategoryPoints> = HashMap::new();
        for row in rows {
            let category: Category = row.get::<String, _>("category").parse()?;
            points
                .entry(row.get("member_id"))
                .or_default()
                .add(category, row.get("points"));
        }
        Ok(points)
    }
}

#[async_trait]
impl BracketRepository for PgBracketRepository {
    async fn get_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        let row = sqlx::query(
            "SELECT id, name, category, status, created_at FROM tournaments WHERE id = $1",
        )
        .bind(tournament_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BracketError::TournamentNotFound(tournament_id))?;

        Ok(Tournament {
            id: row.get("id"),
            name: row.get("name"),
            category: row.get::<String, _>("category").parse()?,
            status: row.get::<String, _>("status").parse()?,
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        })
    }

    async fn list_entrants(&self, tournament_id: TournamentId) -> BracketResult<Vec<Entrant>> {
        let rows = sqlx::query(
            "SELECT id, tournament_id, display_name, member_ids FROM entrants
             WHERE tournament_id = $1 ORDER BY registered_at, id",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| Entrant {
                id: r.get("id"),
                tournament_id: r.get("tournament_id"),
                display_name: r.get("display_name"),
                member_ids: r.get("member_ids"),
            })
            .collect())
    }

    async fn replace_bracket(
        &self,
        tournament_id: TournamentId,
        matches: &[Match],
    ) -> BracketResult<Vec<Match>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status FROM tournaments WHERE id = $1 FOR UPDATE")
            .bind(tournament_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;

        let status: TournamentStatus = row.get::<String, _>("status").parse()?;
        if status != TournamentStatus::Open {
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::Open,
                actual: status,
            });
        }

        let played: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM matches
             WHERE tournament_id = $1 AND status = 'completed'
               AND slot1_kind = 'entrant' AND slot2_kind = 'entrant'",
        )
        .bind(tournament_id)
        .fetch_one(&mut *tx)
        .await?;

        if played > 0 {
            return Err(BracketError::ResultsAlreadyRecorded(tournament_id));
        }

        sqlx::query("DELETE FROM matches WHERE tournament_id = $1")
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?;

        let mut stored = Vec::with_capacity(matches.len());
        for m in matches {
            stored.push(Self::insert_match(&mut tx, m).await?);
        }

        sqlx::query(
            "UPDATE tournaments SET status = 'in_progress', started_at = NOW() WHERE id = $1",
        )
        .bind(tournament_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        stored.sort_by_key(|m| (m.round, m.match_number));
        Ok(stored)
    }

    async fn get_match(&self, match_id: MatchId) -> BracketResult<Match> {
        let row = sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;

        match_from_row(&row)
    }

    async fn find_match(
        &self,
        tournament_id: TournamentId,
        round: Round,
        match_number: u32,
    ) -> BracketResult<Option<Match>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE tournament_id = $1 AND round = $2 AND match_number = $3"
        ))
        .bind(tournament_id)
        .bind(round.as_str())
        .bind(match_number as i32)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> BracketResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1"
        ))
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        // Round names do not sort in ladder order, so order in Rust
        let mut matches = rows.iter().map(match_from_row).collect::<BracketResult<Vec<_>>>()?;
        matches.sort_by_key(|m| (m.round, m.match_number));
        Ok(matches)
    }

    async fn update_match(&self, m: &Match) -> BracketResult<Match> {
        let slot1 = SlotColumns::from(&m.slot1);
        let slot2 = SlotColumns::from(&m.slot2);

        let row = sqlx::query(&format!(
            "UPDATE matches SET
                 slot1_kind = $3, slot1_entrant_id = $4, slot1_name = $5, slot1_members = $6,
                 slot2_kind = $7, slot2_entrant_id = $8, slot2_name = $9, slot2_members = $10,
                 sets = $11, winner_id = $12, winner_name = $13, status = $14,
                 version = version + 1, updated_at = NOW()
             WHERE id = $1 AND version = $2
             RETURNING {MATCH_COLUMNS}"
        ))
        .bind(m.id)
        .bind(m.version)
        .bind(slot1.kind)
        .bind(slot1.entrant_id)
        .bind(slot1.name)
        .bind(slot1.members)
        .bind(slot2.kind)
        .bind(slot2.entrant_id)
        .bind(slot2.name)
        .bind(slot2.members)
        .bind(serde_json::to_value(&m.sets)?)
        .bind(m.winner_id)
        .bind(&m.winner_name)
        .bind(m.status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => match_from_row(&row),
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM matches WHERE id = $1)")
                        .bind(m.id)
                        .fetch_one(&self.pool)
                        .await?;
                if exists {
                    Err(BracketError::Conflict(m.id))
                } else {
                    Err(BracketError::MatchNotFound(m.id))
                }
            }
        }
    }

    async fn finalize_tournament(
        &self,
        tournament_id: TournamentId,
        awards: &[PointsAward],
    ) -> BracketResult<bool> {
        let mut tx = self.pool.begin().await?;

        let finished = sqlx::query(
            "UPDATE tournaments SET status = 'finished', finished_at = NOW()
             WHERE id = $1 AND status = 'in_progress'
             RETURNING name",
        )
        .bind(tournament_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = finished else {
            return Ok(false);
        };
        let tournament_name: String = row.get("name");

        for award in awards {
            let member = sqlx::query("SELECT id FROM members WHERE id = $1 FOR UPDATE")
                .bind(award.member_id)
                .fetch_optional(&mut *tx)
                .await?;
            if member.is_none() {
                return Err(BracketError::MemberNotFound(award.member_id));
            }

            let inserted = sqlx::query(
                "INSERT INTO points_history
                     (member_id, tournament_id, tournament_name, category, points, result)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (member_id, tournament_id) DO NOTHING
                 RETURNING id",
            )
            .bind(award.member_id)
            .bind(tournament_id)
            .bind(&tournament_name)
            .bind(award.category.as_str())
            .bind(award.points)
            .bind(award.result.as_str())
            .fetch_optional(&mut *tx)
            .await?;

            if inserted.is_none() {
                log::warn!(
                    "Member {} already credited for tournament {}",
                    award.member_id,
                    tournament_id
                );
                continue;
            }

            sqlx::query(
                "UPDATE members
                 SET total_points = total_points + $2, tournaments_played = tournaments_played + 1
                 WHERE id = $1",
            )
            .bind(award.member_id)
            .bind(award.points)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO member_category_points (member_id, category, points)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (member_id, category)
                 DO UPDATE SET points = member_category_points.points + EXCLUDED.points",
            )
            .bind(award.member_id)
            .bind(award.category.as_str())
            .bind(award.points)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl RankingRepository for PgBracketRepository {
    async fn get_member(&self, member_id: MemberId) -> BracketResult<MemberStanding> {
        let row = sqlx::query(&format!("SELECT {MEMBER_COLUMNS} FROM members m WHERE m.id = $1"))
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(BracketError::MemberNotFound(member_id))?;

        let mut points = self.load_category_points(&[member_id]).await?;
        Ok(member_from_row(
            &row,
            points.remove(&member_id).unwrap_or_default(),
        ))
    }

    async fn ranked_members(
        &self,
        limit: i64,
        category: Option<Category>,
    ) -> BracketResult<Vec<MemberStanding>> {
        let rows = match category {
            None => {
                sqlx::query(&format!(
                    "SELECT {MEMBER_COLUMNS} FROM members m
                     WHERE m.total_points > 0
                     ORDER BY m.total_points DESC, m.id
                     LIMIT $1"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            Some(category) => {
                sqlx::query(&format!(
                    "SELECT {MEMBER_COLUMNS} FROM members m
                     JOIN member_category_points c ON c.member_id = m.id
                     WHERE c.category = $1 AND c.points > 0
                     ORDER BY c.points DESC, m.id
                     LIMIT $2"
                ))
                .bind(category.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let ids: Vec<MemberId> = rows.iter().map(|r| r.get("id")).collect();
        let mut points = self.load_category_points(&ids).await?;

        Ok(rows
            .iter()
            .map(|r| {
                let id: MemberId = r.get("id");
                member_from_row(r, points.remove(&id).unwrap_or_default())
            })
            .collect())
    }

    async fn points_history(
        &self,
        member_id: MemberId,
        limit: i64,
    ) -> BracketResult<Vec<PointsHistoryEntry>> {
        let rows = sqlx::query(
            "SELECT id, member_id, tournament_id, tournament_name, category, points, result,
                    created_at
             FROM points_history
             WHERE member_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
        )
        .bind(member_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(PointsHistoryEntry {
                    id: r.get("id"),
                    member_id: r.get("member_id"),
                    tournament_id: r.get("tournament_id"),
                    tournament_name: r.get("tournament_name"),
                    category: r.get::<String, _>("category").parse()?,
                    points: r.get("points"),
                    result: r.get::<String, _>("result").parse()?,
                    created_at: r.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
                })
            })
            .collect()
    }
}
