//! Bracket data models.

use super::errors::BracketError;
use super::layout::BracketLayout;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Tournament ID type
pub type TournamentId = i64;

/// Match ID type
pub type MatchId = i64;

/// Entrant ID type (a single player or a fixed pair)
pub type EntrantId = i64;

/// Member ID type (an individual player)
pub type MemberId = i64;

/// Round of the fixed four-level ladder.
///
/// Variants are declared in play order, so the derived `Ord` is the ladder
/// order: `RoundOf16 < Quarterfinals < Semifinals < Final`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Round {
    #[serde(rename = "round_of_16")]
    RoundOf16,
    Quarterfinals,
    Semifinals,
    Final,
}

impl Round {
    /// Every round in play order
    pub const LADDER: [Round; 4] = [
        Round::RoundOf16,
        Round::Quarterfinals,
        Round::Semifinals,
        Round::Final,
    ];

    /// The round winners of this round move on to, `None` after the final
    pub fn next(self) -> Option<Round> {
        match self {
            Round::RoundOf16 => Some(Round::Quarterfinals),
            Round::Quarterfinals => Some(Round::Semifinals),
            Round::Semifinals => Some(Round::Final),
            Round::Final => None,
        }
    }

    /// The round feeding this one, `None` for the round of 16
    pub fn previous(self) -> Option<Round> {
        match self {
            Round::RoundOf16 => None,
            Round::Quarterfinals => Some(Round::RoundOf16),
            Round::Semifinals => Some(Round::Quarterfinals),
            Round::Final => Some(Round::Semifinals),
        }
    }

    /// Best result of an entrant eliminated in this round
    pub fn loser_label(self) -> ResultLabel {
        match self {
            Round::RoundOf16 => ResultLabel::RoundOf16,
            Round::Quarterfinals => ResultLabel::Quarterfinalist,
            Round::Semifinals => ResultLabel::Semifinalist,
            Round::Final => ResultLabel::Finalist,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Round::RoundOf16 => "round_of_16",
            Round::Quarterfinals => "quarterfinals",
            Round::Semifinals => "semifinals",
            Round::Final => "final",
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Round {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Round::LADDER
            .into_iter()
            .find(|round| round.as_str() == s)
            .ok_or_else(|| BracketError::UnknownValue {
                kind: "round",
                value: s.to_string(),
            })
    }
}

/// Furthest result an entrant reached in a finished tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultLabel {
    Champion,
    Finalist,
    Semifinalist,
    Quarterfinalist,
    #[serde(rename = "round_of_16")]
    RoundOf16,
}

impl ResultLabel {
    pub const CHAMPION_POINTS: i64 = 1000;
    pub const FINALIST_POINTS: i64 = 600;
    pub const SEMIFINALIST_POINTS: i64 = 360;
    pub const QUARTERFINALIST_POINTS: i64 = 180;
    pub const ROUND_OF_16_POINTS: i64 = 90;

    /// Ranking points awarded for this result
    pub fn points(self) -> i64 {
        match self {
            ResultLabel::Champion => Self::CHAMPION_POINTS,
            ResultLabel::Finalist => Self::FINALIST_POINTS,
            ResultLabel::Semifinalist => Self::SEMIFINALIST_POINTS,
            ResultLabel::Quarterfinalist => Self::QUARTERFINALIST_POINTS,
            ResultLabel::RoundOf16 => Self::ROUND_OF_16_POINTS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResultLabel::Champion => "champion",
            ResultLabel::Finalist => "finalist",
            ResultLabel::Semifinalist => "semifinalist",
            ResultLabel::Quarterfinalist => "quarterfinalist",
            ResultLabel::RoundOf16 => "round_of_16",
        }
    }
}

impl fmt::Display for ResultLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultLabel {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "champion" => Ok(ResultLabel::Champion),
            "finalist" => Ok(ResultLabel::Finalist),
            "semifinalist" => Ok(ResultLabel::Semifinalist),
            "quarterfinalist" => Ok(ResultLabel::Quarterfinalist),
            "round_of_16" => Ok(ResultLabel::RoundOf16),
            _ => Err(BracketError::UnknownValue {
                kind: "result",
                value: s.to_string(),
            }),
        }
    }
}

/// Tournament skill division
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "1ra")]
    First,
    #[serde(rename = "2da")]
    Second,
    #[serde(rename = "3ra")]
    Third,
    #[serde(rename = "4ta")]
    Fourth,
    #[serde(rename = "5ta")]
    Fifth,
    #[serde(rename = "6ta")]
    Sixth,
    #[serde(rename = "7ma")]
    Seventh,
}

impl Category {
    pub const COUNT: usize = 7;

    pub const ALL: [Category; Category::COUNT] = [
        Category::First,
        Category::Second,
        Category::Third,
        Category::Fourth,
        Category::Fifth,
        Category::Sixth,
        Category::Seventh,
    ];

    /// Position of the category in [`Category::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::First => "1ra",
            Category::Second => "2da",
            Category::Third => "3ra",
            Category::Fourth => "4ta",
            Category::Fifth => "5ta",
            Category::Sixth => "6ta",
            Category::Seventh => "7ma",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| BracketError::UnknownValue {
                kind: "category",
                value: s.to_string(),
            })
    }
}

/// Tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Accepting registrations, bracket may be (re)generated
    Open,
    /// Bracket generated, matches being played
    InProgress,
    /// Final played and points allocated
    Finished,
}

impl TournamentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TournamentStatus::Open => "open",
            TournamentStatus::InProgress => "in_progress",
            TournamentStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentStatus {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TournamentStatus::Open),
            "in_progress" => Ok(TournamentStatus::InProgress),
            "finished" => Ok(TournamentStatus::Finished),
            _ => Err(BracketError::UnknownValue {
                kind: "tournament status",
                value: s.to_string(),
            }),
        }
    }
}

/// Tournament as seen by the bracket engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub category: Category,
    pub status: TournamentStatus,
    pub created_at: DateTime<Utc>,
}

/// Registered entrant: a single player or a fixed pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub id: EntrantId,
    pub tournament_id: TournamentId,
    pub display_name: String,
    /// One member for singles, two for a pair
    pub member_ids: Vec<MemberId>,
}

/// Entrant occupying a match slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntrant {
    pub entrant_id: EntrantId,
    pub display_name: String,
    pub member_ids: Vec<MemberId>,
}

impl From<&Entrant> for SlotEntrant {
    fn from(entrant: &Entrant) -> Self {
        Self {
            entrant_id: entrant.id,
            display_name: entrant.display_name.clone(),
            member_ids: entrant.member_ids.clone(),
        }
    }
}

/// Occupant of one side of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Slot {
    Entrant(SlotEntrant),
    /// No opponent, the other side advances without playing
    Bye,
    /// Waiting for the winner of an earlier match
    Tbd,
}

impl Slot {
    pub fn entrant(&self) -> Option<&SlotEntrant> {
        match self {
            Slot::Entrant(entrant) => Some(entrant),
            Slot::Bye | Slot::Tbd => None,
        }
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, Slot::Bye)
    }

    pub fn is_tbd(&self) -> bool {
        matches!(self, Slot::Tbd)
    }

    /// Name shown on a bracket sheet
    pub fn label(&self) -> &str {
        match self {
            Slot::Entrant(entrant) => &entrant.display_name,
            Slot::Bye => "BYE",
            Slot::Tbd => "TBD",
        }
    }
}

/// Slot 1 or slot 2 of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPosition {
    First,
    Second,
}

impl SlotPosition {
    pub fn other(self) -> SlotPosition {
        match self {
            SlotPosition::First => SlotPosition::Second,
            SlotPosition::Second => SlotPosition::First,
        }
    }
}

/// Score of one set, as reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    pub slot1: i32,
    pub slot2: i32,
}

impl SetScore {
    pub fn new(slot1: i32, slot2: i32) -> Self {
        Self { slot1, slot2 }
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Completed,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Completed => "completed",
        }
    }
}

impl FromStr for MatchStatus {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "completed" => Ok(MatchStatus::Completed),
            _ => Err(BracketError::UnknownValue {
                kind: "match status",
                value: s.to_string(),
            }),
        }
    }
}

/// Bracket match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Match ID (0 until stored)
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round: Round,
    /// 1-based position within the round
    pub match_number: u32,
    pub slot1: Slot,
    pub slot2: Slot,
    pub sets: Vec<SetScore>,
    pub winner_id: Option<EntrantId>,
    pub winner_name: Option<String>,
    pub status: MatchStatus,
    /// Optimistic concurrency counter, bumped by every store write
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Create an unsaved pending match
    pub fn draft(
        tournament_id: TournamentId,
        round: Round,
        match_number: u32,
        slot1: Slot,
        slot2: Slot,
    ) -> Self {
        Self {
            id: 0,
            tournament_id,
            round,
            match_number,
            slot1,
            slot2,
            sets: Vec::new(),
            winner_id: None,
            winner_name: None,
            status: MatchStatus::Pending,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn slot(&self, position: SlotPosition) -> &Slot {
        match position {
            SlotPosition::First => &self.slot1,
            SlotPosition::Second => &self.slot2,
        }
    }

    pub fn slot_mut(&mut self, position: SlotPosition) -> &mut Slot {
        match position {
            SlotPosition::First => &mut self.slot1,
            SlotPosition::Second => &mut self.slot2,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Both slots hold real entrants
    pub fn is_playable(&self) -> bool {
        self.slot1.entrant().is_some() && self.slot2.entrant().is_some()
    }

    /// Completed without being played because one side is a BYE
    pub fn is_walkover(&self) -> bool {
        self.is_completed() && (self.slot1.is_bye() || self.slot2.is_bye())
    }

    /// Slot entrant with the given ID, if one side holds it
    pub fn entrant(&self, entrant_id: EntrantId) -> Option<&SlotEntrant> {
        [&self.slot1, &self.slot2]
            .into_iter()
            .filter_map(Slot::entrant)
            .find(|entrant| entrant.entrant_id == entrant_id)
    }

    pub fn winner(&self) -> Option<&SlotEntrant> {
        self.entrant(self.winner_id?)
    }

    /// The other side of a decided match, when it is a real entrant
    pub fn loser(&self) -> Option<&SlotEntrant> {
        let winner_id = self.winner_id?;
        [&self.slot1, &self.slot2]
            .into_iter()
            .filter_map(Slot::entrant)
            .find(|entrant| entrant.entrant_id != winner_id)
    }

    /// Complete the match when a BYE makes playing it unnecessary.
    ///
    /// One real entrant against a BYE wins outright; two BYEs make a void
    /// match with no winner. Returns whether the match was settled.
    pub fn settle_byes(&mut self) -> bool {
        if self.is_completed() || self.slot1.is_tbd() || self.slot2.is_tbd() {
            return false;
        }

        let winner = match (&self.slot1, &self.slot2) {
            (Slot::Entrant(entrant), Slot::Bye) | (Slot::Bye, Slot::Entrant(entrant)) => {
                Some(entrant.clone())
            }
            (Slot::Bye, Slot::Bye) => None,
            _ => return false,
        };

        self.winner_id = winner.as_ref().map(|entrant| entrant.entrant_id);
        self.winner_name = winner.map(|entrant| entrant.display_name);
        self.status = MatchStatus::Completed;
        true
    }

    /// What this match sends to its successor slot, once decided
    pub fn carried_slot(&self) -> Option<Slot> {
        if !self.is_completed() {
            return None;
        }
        match self.winner() {
            Some(winner) => Some(Slot::Entrant(winner.clone())),
            None if self.winner_id.is_none() => Some(Slot::Bye),
            None => None,
        }
    }
}

/// Matches of one tournament grouped by round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketView {
    pub tournament_id: TournamentId,
    /// Every ladder round is present, each sorted by match number
    pub rounds: BTreeMap<Round, Vec<Match>>,
}

impl BracketView {
    pub fn group(tournament_id: TournamentId, matches: Vec<Match>) -> Self {
        let mut rounds: BTreeMap<Round, Vec<Match>> =
            Round::LADDER.into_iter().map(|r| (r, Vec::new())).collect();

        for m in matches {
            rounds.entry(m.round).or_default().push(m);
        }
        for matches in rounds.values_mut() {
            matches.sort_by_key(|m| m.match_number);
        }

        Self {
            tournament_id,
            rounds,
        }
    }

    pub fn round(&self, round: Round) -> &[Match] {
        self.rounds.get(&round).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn find(&self, round: Round, match_number: u32) -> Option<&Match> {
        self.round(round)
            .iter()
            .find(|m| m.match_number == match_number)
    }

    pub fn match_count(&self) -> usize {
        self.rounds.values().map(Vec::len).sum()
    }
}

/// Outcome of bracket generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedBracket {
    pub tournament_id: TournamentId,
    pub match_count: usize,
    pub bracket_size: usize,
    pub starting_round: Round,
    /// Matches completed at creation because of BYEs
    pub byes_resolved: usize,
    /// Entrants left without a first-round seat
    pub unplaced: Vec<EntrantId>,
}

impl GeneratedBracket {
    pub fn new(
        tournament_id: TournamentId,
        layout: BracketLayout,
        match_count: usize,
        byes_resolved: usize,
        unplaced: Vec<EntrantId>,
    ) -> Self {
        Self {
            tournament_id,
            match_count,
            bracket_size: layout.bracket_size,
            starting_round: layout.starting_round,
            byes_resolved,
            unplaced,
        }
    }
}

/// Outcome of a recorded match result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedResult {
    pub match_id: MatchId,
    pub winner_id: EntrantId,
    pub winner_name: String,
    /// The final has been played and points are allocated
    pub tournament_finished: bool,
}
