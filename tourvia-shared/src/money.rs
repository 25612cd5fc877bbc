use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

/// Smallest representable fraction of a commission rate: 1 basis point.
pub const BPS_SCALE: i64 = 10_000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount must not be negative: {0}")]
    Negative(i64),
    #[error("amount overflow")]
    Overflow,
    #[error("commission rate must be strictly between 0 and 1, got {0} bps")]
    RateOutOfRange(i64),
}

/// An exact amount in Vietnamese đồng. The đồng has no circulating
/// sub-unit, so one unit of the inner integer is one đ.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// A non-negative amount. Ledger figures and prices are never negative;
    /// subtraction that would go below zero is an error at the call site.
    pub fn new(units: i64) -> Result<Self, MoneyError> {
        if units < 0 {
            return Err(MoneyError::Negative(units));
        }
        Ok(Money(units))
    }

    pub fn units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(MoneyError::Overflow)
    }

    pub fn checked_sub(self, other: Money) -> Result<Money, MoneyError> {
        match self.0.checked_sub(other.0) {
            Some(v) if v >= 0 => Ok(Money(v)),
            Some(v) => Err(MoneyError::Negative(v)),
            None => Err(MoneyError::Overflow),
        }
    }

    pub fn checked_mul(self, factor: u32) -> Result<Money, MoneyError> {
        self.0
            .checked_mul(i64::from(factor))
            .map(Money)
            .ok_or(MoneyError::Overflow)
    }

    /// Saturating subtraction used by read-side projections where a
    /// negative intermediate means "nothing left", never an error.
    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }
}

impl Sum for Money {
    /// Saturating fold. Only read-side projections sum entries, and there a
    /// clamped total beats a wrapped one.
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| Money(acc.0.saturating_add(m.0)))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        write!(f, "{}đ", grouped)
    }
}

/// A guide commission rate, held in basis points so splits stay exact.
/// Valid range is (0, 10000) exclusive: a 0% or 100% commission is a
/// configuration mistake, not a business case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommissionRate(i64);

impl CommissionRate {
    pub fn from_bps(bps: i64) -> Result<Self, MoneyError> {
        if bps <= 0 || bps >= BPS_SCALE {
            return Err(MoneyError::RateOutOfRange(bps));
        }
        Ok(CommissionRate(bps))
    }

    /// Convenience for config files that express the rate as a fraction,
    /// e.g. 0.15. Rounded to the nearest basis point.
    pub fn from_fraction(fraction: f64) -> Result<Self, MoneyError> {
        if !fraction.is_finite() {
            return Err(MoneyError::RateOutOfRange(-1));
        }
        Self::from_bps((fraction * BPS_SCALE as f64).round() as i64)
    }

    pub fn bps(&self) -> i64 {
        self.0
    }

    /// Split a gross amount into platform fee and guide share.
    ///
    /// The integer-division remainder goes to the platform: the fee is
    /// rounded up to the next whole đ and the guide share is whatever is
    /// left, so `fee + net == gross` holds for every input.
    pub fn split(&self, gross: Money) -> CommissionSplit {
        let raw = i128::from(gross.0) * i128::from(self.0);
        let quotient = raw / i128::from(BPS_SCALE);
        let remainder = raw % i128::from(BPS_SCALE);
        let fee = quotient + if remainder > 0 { 1 } else { 0 };
        let fee = Money(fee as i64);
        CommissionSplit {
            gross,
            fee,
            net: Money(gross.0 - fee.0),
        }
    }
}

/// Result of dividing a paid amount between platform and guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    pub gross: Money,
    pub fee: Money,
    pub net: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vnd(units: i64) -> Money {
        Money::new(units).unwrap()
    }

    #[test]
    fn split_is_exact_for_round_amounts() {
        // 15% of 1,000,000đ
        let rate = CommissionRate::from_bps(1500).unwrap();
        let split = rate.split(vnd(1_000_000));
        assert_eq!(split.fee, vnd(150_000));
        assert_eq!(split.net, vnd(850_000));
    }

    #[test]
    fn remainder_goes_to_platform() {
        // 15% of 333 = 49.95 → fee rounds up to 50, guide gets 283
        let rate = CommissionRate::from_bps(1500).unwrap();
        let split = rate.split(vnd(333));
        assert_eq!(split.fee, vnd(50));
        assert_eq!(split.net, vnd(283));
    }

    #[test]
    fn fee_plus_net_equals_gross_for_odd_amounts() {
        let rate = CommissionRate::from_bps(1733).unwrap();
        for units in [0, 1, 7, 99, 101, 12_345, 999_999, 1_000_001, 77_777_777] {
            let split = rate.split(vnd(units));
            assert_eq!(
                split.fee.checked_add(split.net).unwrap(),
                vnd(units),
                "leakage at {} units",
                units
            );
            assert!(split.net.units() >= 0);
        }
    }

    #[test]
    fn rate_bounds_are_exclusive() {
        assert!(CommissionRate::from_bps(0).is_err());
        assert!(CommissionRate::from_bps(10_000).is_err());
        assert!(CommissionRate::from_bps(1).is_ok());
        assert!(CommissionRate::from_bps(9_999).is_ok());
    }

    #[test]
    fn from_fraction_rounds_to_bps() {
        assert_eq!(
            CommissionRate::from_fraction(0.15).unwrap(),
            CommissionRate::from_bps(1500).unwrap()
        );
        assert!(CommissionRate::from_fraction(0.0).is_err());
        assert!(CommissionRate::from_fraction(1.0).is_err());
        assert!(CommissionRate::from_fraction(f64::NAN).is_err());
    }

    #[test]
    fn money_rejects_negatives_and_underflow() {
        assert!(Money::new(-1).is_err());
        assert!(vnd(100).checked_sub(vnd(200)).is_err());
        assert_eq!(vnd(100).saturating_sub(vnd(200)), Money::ZERO);
    }

    #[test]
    fn sum_saturates_instead_of_wrapping() {
        let total: Money = [Money::new(i64::MAX).unwrap(), vnd(1)].into_iter().sum();
        assert_eq!(total.units(), i64::MAX);
    }

    #[test]
    fn display_groups_thousands() {
        assert_eq!(vnd(1_500_000).to_string(), "1.500.000đ");
        assert_eq!(vnd(42).to_string(), "42đ");
    }
}
