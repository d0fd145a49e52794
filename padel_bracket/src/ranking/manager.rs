//! Ranking manager implementation.

use super::models::{MemberStanding, PointsHistoryEntry, RankingEntry};
use crate::bracket::errors::BracketResult;
use crate::bracket::models::{Category, MemberId};
use crate::db::RankingRepository;
use std::sync::Arc;

/// Largest page a ranking or history query returns
pub const MAX_PAGE_SIZE: i64 = 500;

/// Ranking manager
#[derive(Clone)]
pub struct RankingManager {
    repo: Arc<dyn RankingRepository>,
}

impl RankingManager {
    /// Create a new ranking manager
    pub fn new(repo: Arc<dyn RankingRepository>) -> Self {
        Self { repo }
    }

    /// Members with points, best first.
    ///
    /// With a category the table is ordered by that category's accumulator
    /// and members without points in it are left out.
    pub async fn ranking(
        &self,
        limit: i64,
        category: Option<Category>,
    ) -> BracketResult<Vec<RankingEntry>> {
        let members = self
            .repo
            .ranked_members(clamp_limit(limit), category)
            .await?;

        Ok(members
            .into_iter()
            .enumerate()
            .map(|(index, member)| RankingEntry {
                position: index + 1,
                member_id: member.id,
                display_name: member.display_name,
                points: match category {
                    Some(category) => member.points_by_category[category],
                    None => member.total_points,
                },
                tournaments_played: member.tournaments_played,
            })
            .collect())
    }

    /// Points history of a member, newest first
    pub async fn points_history(
        &self,
        member_id: MemberId,
        limit: i64,
    ) -> BracketResult<Vec<PointsHistoryEntry>> {
        self.repo.get_member(member_id).await?;
        self.repo.points_history(member_id, clamp_limit(limit)).await
    }

    /// Totals and category accumulators of a member
    pub async fn member_standing(&self, member_id: MemberId) -> BracketResult<MemberStanding> {
        self.repo.get_member(member_id).await
    }
}

fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-5), 1);
        assert_eq!(clamp_limit(20), 20);
        assert_eq!(clamp_limit(10_000), MAX_PAGE_SIZE);
    }
}
