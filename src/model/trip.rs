//! Turo trips and portal notifications, both shown in paginated lists.

use crate::model::Amount;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A rental booked through Turo.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuroTrip {
    pub id: String,
    pub reservation_id: String,
    pub car_id: String,
    pub guest_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub earnings: Amount,
    #[serde(default)]
    pub status: String,
}

impl TuroTrip {
    /// Number of days the car was out, counting a same-day trip as one day.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days().max(0) + 1
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
