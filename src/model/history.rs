use crate::model::{Amount, LedgerCategory, Month};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a ledger's audit log. Rows are appended by the portal every time a cell is saved and
/// are never changed afterwards.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub car_id: String,
    pub year: i32,
    pub category: LedgerCategory,
    pub field: String,
    pub month: Month,
    pub old_value: Amount,
    pub new_value: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    /// The user who saved the change.
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// The signed difference introduced by this change.
    pub fn delta(&self) -> Amount {
        self.new_value - self.old_value
    }
}

/// Narrows the history log. Unset fields match everything.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<LedgerCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<Month>,
}

impl HistoryFilter {
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        self.category.map_or(true, |c| c == entry.category)
            && self.month.map_or(true, |m| m == entry.month)
    }
}
