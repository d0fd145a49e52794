//! Bracket module for single-elimination padel tournaments.
//!
//! This module provides the bracket engine:
//! - Round ladder and bracket layout computation
//! - Bracket construction from a registered entrant list
//! - Automatic BYE resolution with multi-round cascades
//! - Deterministic winner advancement
//! - Result recording with optimistic concurrency
//! - Completion detection and points allocation
//!
//! ## Example
//!
//! ```no_run
//! use padel_bracket::bracket::{BracketManager, SetScore};
//! use padel_bracket::db::{Database, PgBracketRepository};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let repo = Arc::new(PgBracketRepository::new(db.pool().clone()));
//!     let manager = BracketManager::new(repo);
//!
//!     let generated = manager.generate_bracket(1).await?;
//!     println!("Created {} matches", generated.match_count);
//!
//!     let sets = vec![SetScore::new(6, 4), SetScore::new(6, 3)];
//!     let recorded = manager.record_result(10, sets, 7).await?;
//!     println!("Winner: {}", recorded.winner_name);
//!
//!     Ok(())
//! }
//! ```

pub mod advancement;
pub mod builder;
pub mod byes;
pub mod completion;
pub mod errors;
pub mod layout;
pub mod manager;
pub mod models;

pub use advancement::{Advancement, Placement, successor};
pub use builder::{BracketBuilder, BracketPlan};
pub use completion::{CompletionCheck, CompletionSummary, Standing};
pub use errors::{BracketError, BracketResult};
pub use layout::{BracketLayout, MAX_ENTRANTS, MIN_ENTRANTS};
pub use manager::BracketManager;
pub use models::{
    BracketView, Category, Entrant, EntrantId, GeneratedBracket, Match, MatchId, MatchStatus,
    MemberId, RecordedResult, ResultLabel, Round, SetScore, Slot, SlotEntrant, SlotPosition,
    Tournament, TournamentId, TournamentStatus,
};
