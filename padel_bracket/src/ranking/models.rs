//! Ranking data models.

use crate::bracket::models::{Category, EntrantId, MemberId, ResultLabel, TournamentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Index;

/// One points accumulator per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<Category, i64>",
    into = "BTreeMap<Category, i64>"
)]
pub struct CategoryPoints([i64; Category::COUNT]);

impl CategoryPoints {
    pub fn get(&self, category: Category) -> i64 {
        self.0[category.index()]
    }

    pub fn add(&mut self, category: Category, points: i64) {
        self.0[category.index()] += points;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, i64)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    pub fn total(&self) -> i64 {
        self.0.iter().sum()
    }
}

impl Index<Category> for CategoryPoints {
    type Output = i64;

    fn index(&self, category: Category) -> &i64 {
        &self.0[category.index()]
    }
}

impl From<BTreeMap<Category, i64>> for CategoryPoints {
    fn from(map: BTreeMap<Category, i64>) -> Self {
        let mut points = Self::default();
        for (category, value) in map {
            points.add(category, value);
        }
        points
    }
}

impl From<CategoryPoints> for BTreeMap<Category, i64> {
    fn from(points: CategoryPoints) -> Self {
        points.iter().collect()
    }
}

/// Cumulative standing of one member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberStanding {
    pub id: MemberId,
    pub display_name: String,
    pub total_points: i64,
    pub tournaments_played: i64,
    pub points_by_category: CategoryPoints,
}

/// Points owed to one member for a finished tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsAward {
    pub member_id: MemberId,
    pub entrant_id: EntrantId,
    pub points: i64,
    pub result: ResultLabel,
    pub category: Category,
}

/// Points history entry (append-only, one per member and tournament)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsHistoryEntry {
    pub id: i64,
    pub member_id: MemberId,
    pub tournament_id: TournamentId,
    pub tournament_name: String,
    pub category: Category,
    pub points: i64,
    pub result: ResultLabel,
    pub created_at: DateTime<Utc>,
}

/// Row of the ranking table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingEntry {
    /// 1-based position
    pub position: usize,
    pub member_id: MemberId,
    pub display_name: String,
    /// Total points, or the category accumulator for a category ranking
    pub points: i64,
    pub tournaments_played: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_points_accumulate() {
        let mut points = CategoryPoints::default();
        points.add(Category::Fifth, 600);
        points.add(Category::Fifth, 90);
        points.add(Category::Second, 1000);

        assert_eq!(points.get(Category::Fifth), 690);
        assert_eq!(points[Category::Second], 1000);
        assert_eq!(points[Category::First], 0);
        assert_eq!(points.total(), 1690);
    }

    #[test]
    fn test_category_points_serialize_every_key() {
        let mut points = CategoryPoints::default();
        points.add(Category::Third, 360);

        let json = serde_json::to_value(points).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), Category::COUNT);
        assert_eq!(json["3ra"], 360);
        assert_eq!(json["7ma"], 0);

        let back: CategoryPoints = serde_json::from_value(json).unwrap();
        assert_eq!(back, points);
    }

    #[test]
    fn test_partial_map_deserializes() {
        let points: CategoryPoints = serde_json::from_str(r#"{"4ta": 180}"#).unwrap();
        assert_eq!(points[Category::Fourth], 180);
        assert_eq!(points.total(), 180);
    }
}
