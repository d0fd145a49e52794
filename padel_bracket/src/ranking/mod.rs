//! Ranking module exposing cumulative points to the rest of the system.
//!
//! Points are written by the bracket engine when a tournament finishes. This
//! module only reads them back:
//! - Global and per-category ranking tables
//! - Member standings with per-category accumulators
//! - Append-only points history

pub mod manager;
pub mod models;

pub use manager::RankingManager;
pub use models::{CategoryPoints, MemberStanding, PointsAward, PointsHistoryEntry, RankingEntry};
