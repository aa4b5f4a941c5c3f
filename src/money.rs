//! Fixed-point money amounts stored as integer minor units (cents).

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// The number of minor units in one major unit, e.g. cents in a dollar.
const MINOR_UNITS: i64 = 100;

/// A signed amount of money in minor units (cents).
///
/// Transactions and targets only ever store positive amounts, but derived
/// values such as a balance may be negative, so the type itself is signed.
///
/// Parsed amounts are limited to [Amount::MAX] in magnitude. Arithmetic is
/// only available in checked form; totals that would not fit are reported as
/// [Error::AmountOverflow].
///
/// Amounts are serialized as decimal strings with two fractional digits,
/// e.g. `"1234.50"`, and parsed from decimal strings with at most two
/// fractional digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// The largest amount accepted from user input: one hundred billion.
    pub const MAX: Amount = Amount(10_000_000_000_000);

    /// Create an amount from minor units (cents).
    pub const fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// Whether the amount is strictly greater than zero.
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Whether the amount is strictly less than zero.
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Add two amounts.
    ///
    /// # Errors
    /// Returns [Error::AmountOverflow] if the sum does not fit in an amount.
    pub fn checked_add(self, rhs: Amount) -> Result<Amount, Error> {
        self.0
            .checked_add(rhs.0)
            .map(Amount)
            .ok_or(Error::AmountOverflow)
    }

    /// Subtract `rhs` from this amount.
    ///
    /// # Errors
    /// Returns [Error::AmountOverflow] if the difference does not fit in an amount.
    pub fn checked_sub(self, rhs: Amount) -> Result<Amount, Error> {
        self.0
            .checked_sub(rhs.0)
            .map(Amount)
            .ok_or(Error::AmountOverflow)
    }

    /// Sum `amounts`, stopping at the first overflow.
    ///
    /// # Errors
    /// Returns [Error::AmountOverflow] if the total does not fit in an amount.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Amount>) -> Result<Amount, Error> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, Amount::checked_add)
    }

    /// Parse a positive amount from user input.
    ///
    /// # Errors
    /// Returns [Error::Validation] if `text` is not a valid amount or is not
    /// greater than zero.
    pub fn parse_positive(text: &str) -> Result<Self, Error> {
        let amount: Amount = text.parse()?;

        if amount.is_positive() {
            Ok(amount)
        } else {
            Err(Error::Validation(format!(
                "amount must be greater than zero, got {amount}"
            )))
        }
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let major = abs / MINOR_UNITS as u64;
        let minor = abs % MINOR_UNITS as u64;

        write!(f, "{sign}{major}.{minor:02}")
    }
}

impl FromStr for Amount {
    type Err = Error;

    /// Parse a decimal string such as `"12"`, `"12.5"` or `"-12.34"`.
    ///
    /// At most two fractional digits are accepted; anything more precise is
    /// rejected rather than rounded.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::Validation(format!("\"{text}\" is not a valid amount"));

        let trimmed = text.trim();
        let (sign, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (major_text, minor_text) = match unsigned.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (unsigned, ""),
        };

        if major_text.is_empty()
            || !major_text.chars().all(|c| c.is_ascii_digit())
            || minor_text.len() > 2
            || !minor_text.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let major: i64 = major_text.parse().map_err(|_| invalid())?;
        let minor: i64 = match minor_text.len() {
            0 => 0,
            1 => minor_text.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => minor_text.parse().map_err(|_| invalid())?,
        };

        let too_large = || {
            Error::Validation(format!(
                "\"{text}\" is larger than the maximum amount of {}",
                Amount::MAX
            ))
        };

        major
            .checked_mul(MINOR_UNITS)
            .and_then(|value| value.checked_add(minor))
            .filter(|value| *value <= Amount::MAX.0)
            .map(|value| Amount(sign * value))
            .ok_or_else(too_large)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Amount)
    }
}
