//! Integer-cents monetary value type.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::DomainError;

/// Monetary value in signed integer cents.
///
/// All internal arithmetic is integer-only; decimal values exist solely at
/// the system boundary (raw charge payloads in, display amounts out).
/// Negative values are legal and represent refunds/adjustments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a Money value from integer cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents.
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Converts a boundary decimal amount to cents, rounding half-up
    /// (midpoint away from zero).
    pub fn from_decimal(value: Decimal) -> Result<Self, DomainError> {
        let cents = (value * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        cents.to_i64().map(Self).ok_or(DomainError::Overflow)
    }

    /// Parses a decimal string like `"100.00"` or `"-12.345"` into cents.
    pub fn parse_decimal(s: &str) -> Result<Self, DomainError> {
        let value = Decimal::from_str(s.trim())
            .map_err(|_| DomainError::Validation(format!("invalid decimal amount: {s:?}")))?;
        Self::from_decimal(value)
    }

    /// Display-only conversion back to a decimal with two places.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Checked addition. Overflow is a hard error, never a silent wrap.
    pub fn checked_add(self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(DomainError::Overflow)
    }

    /// Checked subtraction. Overflow is a hard error, never a silent wrap.
    pub fn checked_sub(self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or(DomainError::Overflow)
    }

    /// Returns the negated amount (refund direction).
    pub fn negated(self) -> Result<Money, DomainError> {
        self.0.checked_neg().map(Money).ok_or(DomainError::Overflow)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = (self.0 as i128).abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, cents / 100, cents % 100)
    }
}
