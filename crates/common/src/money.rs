//! Money amount kept in minor units.

use serde::{Deserialize, Serialize};

/// Money amount represented in minor units (halalas, cents) to avoid
/// floating point drift in totals.
///
/// On the wire it is a plain decimal number in major units (`12.5`), which is
/// what the storefront backend sends and expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from minor units.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a Money amount from whole major units.
    pub const fn from_major(units: i64) -> Self {
        Self { cents: units * 100 }
    }

    /// Creates a Money amount from a decimal major-unit value, rounded to the
    /// nearest minor unit. Non-finite input becomes zero.
    pub fn from_decimal(value: f64) -> Self {
        if !value.is_finite() {
            return Self::zero();
        }
        Self {
            cents: (value * 100.0).round() as i64,
        }
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in minor units.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the amount as a decimal major-unit value.
    pub fn to_decimal(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * i64::from(quantity),
        }
    }

    /// Returns `percent`% of this amount, rounded half away from zero to the
    /// nearest minor unit.
    pub fn percentage(&self, percent: u32) -> Money {
        let scaled = self.cents.abs() * i64::from(percent);
        let rounded = (scaled + 50) / 100;
        Money {
            cents: if self.cents < 0 { -rounded } else { rounded },
        }
    }

    /// Clamps negative amounts to zero.
    pub fn non_negative(self) -> Money {
        if self.cents < 0 { Money::zero() } else { self }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<f64> for Money {
    fn from(value: f64) -> Self {
        Money::from_decimal(value)
    }
}

impl From<Money> for f64 {
    fn from(money: Money) -> Self {
        money.to_decimal()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.cents -= rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decimal_rounds_to_minor_units() {
        assert_eq!(Money::from_decimal(12.345).cents(), 1235);
        assert_eq!(Money::from_decimal(0.1 + 0.2).cents(), 30);
        assert_eq!(Money::from_decimal(f64::NAN), Money::zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        assert_eq!(Money::from_major(90).percentage(15).cents(), 1350);
        // 0.15 * 0.10 = 0.015 -> 0.02
        assert_eq!(Money::from_cents(10).percentage(15).cents(), 2);
        assert_eq!(Money::from_cents(-10).percentage(15).cents(), -2);
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_major(10);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
        assert_eq!(b.multiply(4).cents(), 1000);
        assert_eq!((b - a).non_negative(), Money::zero());
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_cents(100), Money::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total.cents(), 350);
    }

    #[test]
    fn test_serializes_as_major_units() {
        let json = serde_json::to_string(&Money::from_cents(1350)).unwrap();
        assert_eq!(json, "13.5");
        let parsed: Money = serde_json::from_str("8").unwrap();
        assert_eq!(parsed, Money::from_major(8));
    }
}
