use serde::{Deserialize, Serialize};

/// File statistics aggregated by extension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub extension: String,
    pub count: u64,
    pub total_size: u64,
}

/// One of the largest files in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargestItem {
    pub name: String,
    pub size: u64,
    pub path: String,
}

/// Secondary statistics shown next to the selected snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotAnalytics {
    pub categories: Vec<CategoryStat>,
    pub top_items: Vec<LargestItem>,
}

impl SnapshotAnalytics {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.top_items.is_empty()
    }

    pub fn categorized_size(&self) -> u64 {
        self.categories
            .iter()
            .map(|c| c.total_size)
            .fold(0, u64::saturating_add)
    }
}

/// Cache key: one snapshot of one owner (backup job).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsKey {
    pub owner_id: String,
    pub timestamp: i64,
}

impl AnalyticsKey {
    pub fn new(owner_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            owner_id: owner_id.into(),
            timestamp,
        }
    }
}
