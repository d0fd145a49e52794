//! # Padel Bracket
//!
//! A single-elimination bracket engine for padel tournaments.
//!
//! Given the entrants registered for a tournament (single players or fixed
//! pairs), the engine builds the elimination tree, resolves BYEs, records match
//! results, cascades winners forward and, once the final is played, allocates
//! ranking points to every member of every placing entrant.
//!
//! ## Architecture
//!
//! The bracket runs on a fixed four-level round ladder:
//!
//! - **Round of 16**: up to 8 matches
//! - **Quarterfinals**: up to 4 matches
//! - **Semifinals**: up to 2 matches
//! - **Final**: exactly one match
//!
//! State lives in a record store behind the [`db::BracketRepository`] and
//! [`db::RankingRepository`] traits. Two stores ship with the crate: a
//! PostgreSQL store built on sqlx and an in-memory store.
//!
//! ## Core Modules
//!
//! - [`bracket`]: round ladder, bracket builder, BYE resolution, advancement,
//!   completion detection and the [`BracketManager`] that drives them
//! - [`ranking`]: cumulative points, per-category accumulators and history
//! - [`db`]: connection pooling and the record stores
//!
//! ## Example
//!
//! ```
//! use padel_bracket::bracket::{BracketLayout, Round};
//!
//! // Three entrants play on a four-slot bracket starting at the semifinals
//! let layout = BracketLayout::for_entrants(3).unwrap();
//! assert_eq!(layout.bracket_size, 4);
//! assert_eq!(layout.starting_round, Round::Semifinals);
//! ```

/// Bracket construction, advancement and completion.
pub mod bracket;

/// Database pooling and record stores.
pub mod db;

/// Ranking read model.
pub mod ranking;

pub use bracket::{BracketError, BracketManager, BracketResult};
pub use ranking::RankingManager;
