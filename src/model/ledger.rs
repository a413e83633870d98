use crate::model::Amount;
use crate::Result;
use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A calendar month, 1 (January) through 12 (December).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Month(u8);

impl Month {
    pub fn new(month: u8) -> Result<Self> {
        ensure!(
            (1..=12).contains(&month),
            "Month must be between 1 and 12, got {month}"
        );
        Ok(Self(month))
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    /// All twelve months in calendar order.
    pub fn all() -> impl Iterator<Item = Month> {
        (1..=12).map(Month)
    }

    /// The three-letter English abbreviation, e.g. `Jan`.
    pub fn abbrev(&self) -> &'static str {
        const NAMES: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        NAMES[(self.0 - 1) as usize]
    }
}

impl TryFrom<u8> for Month {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Month::new(value).map_err(|e| e.to_string())
    }
}

impl From<Month> for u8 {
    fn from(value: Month) -> Self {
        value.0
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.abbrev())
    }
}

impl FromStr for Month {
    type Err = anyhow::Error;

    /// Accepts a month number (`3`) or an English name or abbreviation (`mar`, `March`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u8>() {
            return Month::new(n);
        }
        let lower = s.to_ascii_lowercase();
        if lower.len() >= 3 {
            if let Some(m) = Month::all().find(|m| {
                let abbrev = m.abbrev().to_ascii_lowercase();
                lower.starts_with(&abbrev)
            }) {
                return Ok(m);
            }
        }
        bail!("'{s}' is not a month")
    }
}

/// Whether values in a category may go below zero.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SignPolicy {
    /// Adjustments and refunds are allowed to be negative.
    Signed,
    /// Costs are entered as positive numbers.
    NonNegative,
}

/// A named group of ledger fields.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LedgerCategory {
    Income,
    Cogs,
    DirectDelivery,
    ParkingFeeLabor,
    ReimbursedBills,
    OperatingExpense,
}

serde_plain::derive_display_from_serialize!(LedgerCategory);
serde_plain::derive_fromstr_from_deserialize!(LedgerCategory);

impl LedgerCategory {
    pub const ALL: [LedgerCategory; 6] = [
        LedgerCategory::Income,
        LedgerCategory::Cogs,
        LedgerCategory::DirectDelivery,
        LedgerCategory::ParkingFeeLabor,
        LedgerCategory::ReimbursedBills,
        LedgerCategory::OperatingExpense,
    ];

    /// The heading shown for the category in the ledger grid.
    pub fn title(&self) -> &'static str {
        match self {
            LedgerCategory::Income => "Income",
            LedgerCategory::Cogs => "COGS",
            LedgerCategory::DirectDelivery => "Direct Delivery",
            LedgerCategory::ParkingFeeLabor => "Parking Fee & Labor",
            LedgerCategory::ReimbursedBills => "Reimbursed Bills",
            LedgerCategory::OperatingExpense => "Operating Expenses",
        }
    }

    pub fn sign_policy(&self) -> SignPolicy {
        match self {
            LedgerCategory::Income | LedgerCategory::ReimbursedBills => SignPolicy::Signed,
            _ => SignPolicy::NonNegative,
        }
    }

    /// True for categories whose values add to the car's income.
    pub fn is_income(&self) -> bool {
        matches!(
            self,
            LedgerCategory::Income | LedgerCategory::ReimbursedBills
        )
    }

    /// Checks `value` against the category's sign policy.
    pub fn validate(&self, value: Amount) -> Result<()> {
        if self.sign_policy() == SignPolicy::NonNegative && value.is_negative() {
            bail!("{} values cannot be negative, got {value}", self.title());
        }
        Ok(())
    }
}

/// Identifies a cell within a single car/year ledger.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellKey {
    pub category: LedgerCategory,
    pub field: String,
    pub month: Month,
}

impl CellKey {
    pub fn new(category: LedgerCategory, field: impl Into<String>, month: Month) -> Self {
        Self {
            category,
            field: field.into(),
            month,
        }
    }
}

impl Display for CellKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.category, self.field, self.month)
    }
}

/// An image attached to a ledger cell.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub url: String,
    #[serde(default)]
    pub name: String,
}

/// A single editable monetary value in a year ledger.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerCell {
    #[serde(flatten)]
    pub key: CellKey,
    pub value: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(default)]
    pub receipts: Vec<Receipt>,
}

impl LedgerCell {
    pub fn zero(key: CellKey) -> Self {
        Self {
            key,
            value: Amount::ZERO,
            remark: None,
            receipts: Vec::new(),
        }
    }
}

/// The change sent to the portal when a cell edit is saved.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellChange {
    pub category: LedgerCategory,
    pub field: String,
    pub month: Month,
    pub value: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

impl CellChange {
    pub fn key(&self) -> CellKey {
        CellKey::new(self.category, self.field.clone(), self.month)
    }
}

/// All income and expense cells of one car for one year.
///
/// The portal returns every cell it knows about; cells it has never stored read as zero. Keys are
/// unique: if the server sends the same (category, field, month) twice, the later cell wins.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "LedgerWire", into = "LedgerWire")]
pub struct YearLedger {
    car_id: String,
    year: i32,
    cells: BTreeMap<CellKey, LedgerCell>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerWire {
    car_id: String,
    year: i32,
    #[serde(default)]
    cells: Vec<LedgerCell>,
}

impl From<LedgerWire> for YearLedger {
    fn from(wire: LedgerWire) -> Self {
        YearLedger::new(wire.car_id, wire.year, wire.cells)
    }
}

impl From<YearLedger> for LedgerWire {
    fn from(ledger: YearLedger) -> Self {
        LedgerWire {
            car_id: ledger.car_id,
            year: ledger.year,
            cells: ledger.cells.into_values().collect(),
        }
    }
}

impl YearLedger {
    pub fn new(
        car_id: impl Into<String>,
        year: i32,
        cells: impl IntoIterator<Item = LedgerCell>,
    ) -> Self {
        Self {
            car_id: car_id.into(),
            year,
            cells: cells.into_iter().map(|c| (c.key.clone(), c)).collect(),
        }
    }

    pub fn car_id(&self) -> &str {
        &self.car_id
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn cells(&self) -> impl Iterator<Item = &LedgerCell> {
        self.cells.values()
    }

    pub fn cell(&self, key: &CellKey) -> Option<&LedgerCell> {
        self.cells.get(key)
    }

    /// The value of a cell, zero when the cell does not exist.
    pub fn value(&self, key: &CellKey) -> Amount {
        self.cell(key).map(|c| c.value).unwrap_or_default()
    }

    /// Replaces (or creates) a cell with the authoritative copy returned by the portal.
    pub fn upsert(&mut self, cell: LedgerCell) {
        self.cells.insert(cell.key.clone(), cell);
    }

    /// The distinct field names of `category`, sorted.
    pub fn fields(&self, category: LedgerCategory) -> Vec<&str> {
        let mut fields: Vec<&str> = self
            .cells
            .keys()
            .filter(|k| k.category == category)
            .map(|k| k.field.as_str())
            .collect();
        fields.dedup();
        fields
    }

    /// One field's values for January through December.
    pub fn row(&self, category: LedgerCategory, field: &str) -> [Amount; 12] {
        let mut row = [Amount::ZERO; 12];
        for (ix, month) in Month::all().enumerate() {
            row[ix] = self.value(&CellKey::new(category, field, month));
        }
        row
    }

    /// Sum of one field across the year.
    pub fn field_total(&self, category: LedgerCategory, field: &str) -> Amount {
        self.cells
            .values()
            .filter(|c| c.key.category == category && c.key.field == field)
            .map(|c| c.value)
            .sum()
    }

    /// Sum of every field of `category` in `month`.
    pub fn month_total(&self, category: LedgerCategory, month: Month) -> Amount {
        self.cells
            .values()
            .filter(|c| c.key.category == category && c.key.month == month)
            .map(|c| c.value)
            .sum()
    }

    /// Sum of every field of `category` across the year.
    pub fn category_total(&self, category: LedgerCategory) -> Amount {
        self.cells
            .values()
            .filter(|c| c.key.category == category)
            .map(|c| c.value)
            .sum()
    }

    /// Income minus expenses for `month`.
    pub fn net(&self, month: Month) -> Amount {
        LedgerCategory::ALL
            .iter()
            .map(|cat| {
                let total = self.month_total(*cat, month);
                if cat.is_income() {
                    total
                } else {
                    -total
                }
            })
            .sum()
    }

    /// Income minus expenses for the whole year.
    pub fn yearly_net(&self) -> Amount {
        Month::all().map(|m| self.net(m)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(n: u8) -> Month {
        Month::new(n).unwrap()
    }

    fn cell(category: LedgerCategory, field: &str, m: u8, value: i64) -> LedgerCell {
        LedgerCell {
            key: CellKey::new(category, field, month(m)),
            value: Amount::from(value),
            remark: None,
            receipts: Vec::new(),
        }
    }

    fn sample() -> YearLedger {
        YearLedger::new(
            "car-1",
            2025,
            vec![
                cell(LedgerCategory::Income, "rentalIncome", 1, 1000),
                cell(LedgerCategory::Income, "rentalIncome", 2, 1500),
                cell(LedgerCategory::Income, "deliveryIncome", 1, 100),
                cell(LedgerCategory::Cogs, "autoBodyShop", 1, 300),
                cell(LedgerCategory::ParkingFeeLabor, "parkingFee", 2, 50),
                cell(LedgerCategory::ReimbursedBills, "tolls", 2, -20),
            ],
        )
    }

    #[test]
    fn test_month_bounds() {
        assert!(Month::new(0).is_err());
        assert!(Month::new(13).is_err());
        assert_eq!(Month::new(12).unwrap().abbrev(), "Dec");
        assert_eq!(Month::all().count(), 12);
    }

    #[test]
    fn test_month_from_str() {
        assert_eq!("3".parse::<Month>().unwrap(), month(3));
        assert_eq!("march".parse::<Month>().unwrap(), month(3));
        assert_eq!("Sep".parse::<Month>().unwrap(), month(9));
        assert!("ma".parse::<Month>().is_err());
        assert!("13".parse::<Month>().is_err());
    }

    #[test]
    fn test_month_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Month>("13").is_err());
        assert_eq!(serde_json::from_str::<Month>("7").unwrap(), month(7));
    }

    #[test]
    fn test_category_names() {
        assert_eq!(LedgerCategory::ParkingFeeLabor.to_string(), "parkingFeeLabor");
        assert_eq!(
            "directDelivery".parse::<LedgerCategory>().unwrap(),
            LedgerCategory::DirectDelivery
        );
        assert_eq!(LedgerCategory::Cogs.title(), "COGS");
    }

    #[test]
    fn test_sign_policy() {
        assert!(LedgerCategory::Cogs.validate(Amount::from(-1)).is_err());
        assert!(LedgerCategory::Cogs.validate(Amount::ZERO).is_ok());
        assert!(LedgerCategory::Income.validate(Amount::from(-1)).is_ok());
    }

    #[test]
    fn test_missing_cell_reads_zero() {
        let ledger = sample();
        let key = CellKey::new(LedgerCategory::DirectDelivery, "fuel", month(5));
        assert!(ledger.cell(&key).is_none());
        assert_eq!(ledger.value(&key), Amount::ZERO);
    }

    #[test]
    fn test_duplicate_keys_keep_last() {
        let ledger = YearLedger::new(
            "car-1",
            2025,
            vec![
                cell(LedgerCategory::Cogs, "tires", 4, 10),
                cell(LedgerCategory::Cogs, "tires", 4, 25),
            ],
        );
        assert_eq!(ledger.cells().count(), 1);
        assert_eq!(
            ledger.value(&CellKey::new(LedgerCategory::Cogs, "tires", month(4))),
            Amount::from(25)
        );
    }

    #[test]
    fn test_totals() {
        let ledger = sample();
        assert_eq!(
            ledger.field_total(LedgerCategory::Income, "rentalIncome"),
            Amount::from(2500)
        );
        assert_eq!(
            ledger.month_total(LedgerCategory::Income, month(1)),
            Amount::from(1100)
        );
        assert_eq!(
            ledger.category_total(LedgerCategory::Income),
            Amount::from(2600)
        );
        // Jan: 1100 - 300; Feb: 1500 - 20 - 50
        assert_eq!(ledger.net(month(1)), Amount::from(800));
        assert_eq!(ledger.net(month(2)), Amount::from(1430));
        assert_eq!(ledger.yearly_net(), Amount::from(2230));
    }

    #[test]
    fn test_fields_and_row() {
        let ledger = sample();
        assert_eq!(
            ledger.fields(LedgerCategory::Income),
            vec!["deliveryIncome", "rentalIncome"]
        );
        let row = ledger.row(LedgerCategory::Income, "rentalIncome");
        assert_eq!(row[0], Amount::from(1000));
        assert_eq!(row[1], Amount::from(1500));
        assert!(row[2..].iter().all(|a| a.is_zero()));
    }

    #[test]
    fn test_ledger_from_wire_json() {
        let json = r#"{
            "carId": "car-9",
            "year": 2024,
            "cells": [
                {"category": "cogs", "field": "oilChange", "month": 3, "value": 89.5,
                 "remark": "synthetic", "receipts": [{"url": "/r/1.jpg", "name": "r1"}]},
                {"category": "income", "field": "rentalIncome", "month": 3, "value": 0}
            ]
        }"#;
        let ledger: YearLedger = serde_json::from_str(json).unwrap();
        assert_eq!(ledger.car_id(), "car-9");
        let key = CellKey::new(LedgerCategory::Cogs, "oilChange", month(3));
        let c = ledger.cell(&key).unwrap();
        assert_eq!(c.remark.as_deref(), Some("synthetic"));
        assert_eq!(c.receipts.len(), 1);
        assert_eq!(c.value, "89.50".parse::<Amount>().unwrap());
    }
}
