//! Bracket error types.

use super::models::{EntrantId, MatchId, MemberId, TournamentId, TournamentStatus};
use thiserror::Error;

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    #[error("Tournament not in correct state: expected {expected}, got {actual}")]
    InvalidState {
        expected: TournamentStatus,
        actual: TournamentStatus,
    },

    #[error("Tournament {0} already has recorded results")]
    ResultsAlreadyRecorded(TournamentId),

    #[error("Insufficient entrants: need {needed}, have {current}")]
    InsufficientEntrants { needed: usize, current: usize },

    #[error("Unsupported bracket size: at most {max} entrants, have {current}")]
    UnsupportedSize { max: usize, current: usize },

    #[error("Entrant {winner_id} is not playing in match {match_id}")]
    InvalidWinner {
        match_id: MatchId,
        winner_id: EntrantId,
    },

    #[error("A result needs 2 or 3 sets, got {0}")]
    InvalidSets(usize),

    #[error("Match {0} does not have two entrants yet")]
    MatchNotPlayable(MatchId),

    #[error("Successor match {0} has already been decided")]
    SuccessorDecided(MatchId),

    #[error("Match {0} was modified concurrently")]
    Conflict(MatchId),

    #[error("Unknown {kind} value: {value}")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BracketError {
    /// Whether the error means the requested tournament, match or member is absent
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BracketError::TournamentNotFound(_)
                | BracketError::MatchNotFound(_)
                | BracketError::MemberNotFound(_)
        )
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_)
            | BracketError::Serialization(_)
            | BracketError::UnknownValue { .. } => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
