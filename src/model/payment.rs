use crate::model::{Amount, Month};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Overdue,
    Refunded,
}

serde_plain::derive_display_from_serialize!(PaymentStatus);
serde_plain::derive_fromstr_from_deserialize!(PaymentStatus);

/// A payment made by (or owed by) a client for a car.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub car_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub amount: Amount,
    pub status: PaymentStatus,
    pub month: Month,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_on: Option<NaiveDate>,
    #[serde(default)]
    pub note: String,
}

/// The filters of the payments search. The search itself runs on the portal; these values are
/// sent as-is in the request body.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<Month>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Free text matched by the portal against car, client and note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl PaymentFilter {
    /// True when `payment` satisfies every set filter. The free-text `search` is left to the
    /// portal and ignored here.
    pub fn matches(&self, payment: &Payment) -> bool {
        self.status.map_or(true, |s| s == payment.status)
            && self.month.map_or(true, |m| m == payment.month)
            && self.year.map_or(true, |y| y == payment.year)
    }
}
