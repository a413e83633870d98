//! Amount type for handling monetary values.
//!
//! The portal sends amounts as JSON numbers, while people type them with dollar signs, commas and
//! sometimes accountant-style parentheses. `Amount` wraps `Decimal` and handles both.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

/// How negative amounts are written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegativeStyle {
    /// `-$1,234.50`
    #[default]
    Sign,
    /// `($1,234.50)`
    Parentheses,
}

/// Represents a dollar amount.
///
/// Equality and ordering are numeric; two amounts with the same value are equal regardless of how
/// they were written.
///
/// # Examples
///
/// ```
/// # use fleetdesk::model::{Amount, NegativeStyle};
/// # use std::str::FromStr;
/// let amount = Amount::from_str("(1,234.5)").unwrap();
/// assert_eq!(amount.to_string(), "-$1,234.50");
/// assert_eq!(amount.format(NegativeStyle::Parentheses), "($1,234.50)");
/// assert_eq!(Amount::ZERO.to_string(), "$0.00");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly below zero.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Rounds to cents, with halves going away from zero.
    pub fn round(&self) -> Amount {
        Amount(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Formats the amount with a dollar sign, thousands separators and two decimal places, writing
    /// negative values in the given `style`.
    pub fn format(&self, style: NegativeStyle) -> String {
        let rounded = self.round();
        let mut magnitude = rounded.0.abs();
        magnitude.rescale(2);
        let text = magnitude.to_string();
        let (int_part, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));
        let digits = format!("{}.{cents}", group_digits(int_part));
        match (rounded.is_negative(), style) {
            (false, _) => format!("${digits}"),
            (true, NegativeStyle::Sign) => format!("-${digits}"),
            (true, NegativeStyle::Parentheses) => format!("(${digits})"),
        }
    }
}

fn group_digits(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (ix, ch) in digits.chars().enumerate() {
        if ix > 0 && (digits.len() - ix) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

impl Debug for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(NegativeStyle::Sign))
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError {
    input: String,
    source: Option<rust_decimal::Error>,
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid amount", self.input)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |source: Option<rust_decimal::Error>| AmountError {
            input: s.to_string(),
            source,
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::ZERO);
        }

        // Accountant-style negatives: (50.00) or ($50.00)
        let (negative, body) = match trimmed.strip_prefix('(') {
            Some(inner) => match inner.strip_suffix(')') {
                Some(inner) => (true, inner.trim()),
                None => return Err(err(None)),
            },
            None => match trimmed.strip_prefix('-') {
                Some(rest) => (true, rest.trim()),
                None => (false, trimmed),
            },
        };

        let body = body.strip_prefix('$').unwrap_or(body);
        if body.starts_with('-') || body.starts_with('+') {
            return Err(err(None));
        }
        let digits = body.replace(',', "");
        let value = Decimal::from_str(&digits).map_err(|e| err(Some(e)))?;
        Ok(Amount(if negative { -value } else { value }))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // A JSON number is only written when it reads back as the same value.
        match self.0.to_f64() {
            Some(f) if Decimal::from_str(&f.to_string()).ok() == Some(self.0) => {
                serializer.serialize_f64(f)
            }
            _ => serializer.serialize_str(&self.0.normalize().to_string()),
        }
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a string holding a dollar amount")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Decimal::from_f64(v)
            .map(|d| Amount(d).round())
            .ok_or_else(|| E::custom(format!("{v} cannot be represented as an amount")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Amount, E> {
        Ok(Amount::ZERO)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount(Decimal::from(value))
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Amount {
        iter.copied().sum()
    }
}
