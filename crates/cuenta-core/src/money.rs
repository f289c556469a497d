//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    10.10 + 0.20 = 10.299999999999999  ❌ WRONG!                         │
//! │                                                                         │
//! │  OUR SOLUTION: 96-bit decimal (rust_decimal)                           │
//! │    10.10 + 0.20 = 10.30                ✅ exact                         │
//! │                                                                         │
//! │  Intermediate math (IVA on a discounted base) keeps full precision.   │
//! │  Rounding happens once, half-up, to 2 places, when a currency amount   │
//! │  is produced for display or storage.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cuenta_core::money::Money;
//!
//! let price: Money = "10.10".parse().unwrap();
//! let total = price.add(Money::from_cents(20));
//! assert_eq!(total.to_fixed_string(), "10.30");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::types::TaxRate;

/// Decimal places used for currency amounts (Mexican Peso).
pub const CURRENCY_DECIMALS: u32 = 2;

/// Symbol used by [`Money::to_display_string`].
pub const CURRENCY_SYMBOL: &str = "$";

// =============================================================================
// Money Type
// =============================================================================

/// An immutable monetary value backed by an exact decimal.
///
/// ## Design Decisions
/// - **Decimal, not cents**: tax on a discounted base needs more than two
///   places internally; `Decimal` keeps 28 significant digits.
/// - **Copy**: every operation returns a new value, nothing mutates in place.
/// - **Signed**: change and remaining balances can be negative before they
///   are floored for display.
///
/// ## Range
/// The operators panic past `Decimal`'s ±7.9e28, like integer overflow.
/// Prices, discounts and payments are capped at [`crate::MAX_AMOUNT`] and
/// line quantities at [`crate::MAX_LINE_QUANTITY`] by validation, which keeps
/// every cart, account and settlement figure far inside that range.
///
/// ## Where Money Flows
/// ```text
/// Product.sale_price ──► LineItem.unit_price ──► LineItem.subtotal()
///                                                     │
///                    Cart/Account Totals ◄────────────┘
///                           │
///                           ▼
///                 Settlement (tendered, remaining, change)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero pesos.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wraps an existing decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money::ZERO
    }

    /// Creates a Money value from whole currency units.
    ///
    /// ```rust
    /// use cuenta_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(100).to_fixed_string(), "100.00");
    /// ```
    #[inline]
    pub fn from_major(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use cuenta_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).to_fixed_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, CURRENCY_DECIMALS))
    }

    /// Creates a Money value from a binary float.
    ///
    /// The float is read through its shortest round-trip text form, so
    /// `19.995` becomes exactly `19.995` rather than `19.99499999...`.
    ///
    /// ## Errors
    /// `InvalidAmount` for NaN, infinity, or values outside the decimal range.
    pub fn from_f64(value: f64) -> CoreResult<Self> {
        if !value.is_finite() {
            return Err(CoreError::invalid_amount(value.to_string(), "not a finite number"));
        }
        value.to_string().parse()
    }

    /// Returns the underlying decimal.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    // -------------------------------------------------------------------------
    // Arithmetic
    // -------------------------------------------------------------------------

    /// Returns `self + other`.
    #[inline]
    pub fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }

    /// Returns `self - other`.
    #[inline]
    pub fn subtract(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }

    /// Multiplies by a decimal factor (a quantity, a rate, or another amount).
    ///
    /// ```rust
    /// use cuenta_core::money::Money;
    ///
    /// let unit = Money::from_cents(299);
    /// assert_eq!(unit.multiply(3).to_fixed_string(), "8.97");
    /// ```
    #[inline]
    pub fn multiply(self, factor: impl Into<Decimal>) -> Money {
        Money(self.0 * factor.into())
    }

    /// Divides by a decimal divisor.
    ///
    /// ## Errors
    /// `DivisionByZero` when the divisor is zero.
    pub fn divide(self, divisor: impl Into<Decimal>) -> CoreResult<Money> {
        let divisor = divisor.into();
        self.0
            .checked_div(divisor)
            .map(Money)
            .ok_or(CoreError::DivisionByZero)
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(self) -> Money {
        Money(self.0.abs())
    }

    /// Rounds half-up to currency precision (2 places).
    ///
    /// ```rust
    /// use cuenta_core::money::Money;
    ///
    /// let m: Money = "0.125".parse().unwrap();
    /// assert_eq!(m.round_currency().to_fixed_string(), "0.13");
    /// ```
    pub fn round_currency(self) -> Money {
        let rounded = self
            .0
            .round_dp_with_strategy(CURRENCY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
        if rounded.is_zero() {
            Money::ZERO
        } else {
            Money(rounded)
        }
    }

    /// Floors negative amounts at zero (for display of balances).
    #[inline]
    pub fn floor_at_zero(self) -> Money {
        if self.is_negative() {
            Money::ZERO
        } else {
            self
        }
    }

    /// Calculates tax at the given rate, rounded to currency precision.
    ///
    /// ```rust
    /// use cuenta_core::money::Money;
    /// use cuenta_core::types::TaxRate;
    ///
    /// let base = Money::from_major(80);
    /// assert_eq!(base.calculate_tax(TaxRate::IVA).to_fixed_string(), "12.80");
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        tax(*self, rate.percent()).round_currency()
    }

    // -------------------------------------------------------------------------
    // Comparisons
    // -------------------------------------------------------------------------

    /// Value equality (`10.1` equals `10.10`).
    #[inline]
    pub fn equals(&self, other: &Money) -> bool {
        self.0 == other.0
    }

    #[inline]
    pub fn greater_than(&self, other: &Money) -> bool {
        self.0 > other.0
    }

    #[inline]
    pub fn less_than(&self, other: &Money) -> bool {
        self.0 < other.0
    }

    #[inline]
    pub fn greater_than_or_equal(&self, other: &Money) -> bool {
        self.0 >= other.0
    }

    #[inline]
    pub fn less_than_or_equal(&self, other: &Money) -> bool {
        self.0 <= other.0
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    // -------------------------------------------------------------------------
    // Conversions
    // -------------------------------------------------------------------------

    /// Lossy conversion for charting and interop only. Never feed it back.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// Two-decimal text, rounded half-up: `19.995` -> `"20.00"`.
    pub fn to_fixed_string(&self) -> String {
        let mut rounded = self.round_currency().0;
        rounded.rescale(CURRENCY_DECIMALS);
        rounded.to_string()
    }

    /// Peso display format with thousands separators: `$1,234.56`.
    ///
    /// ```rust
    /// use cuenta_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(123456).to_display_string(), "$1,234.56");
    /// assert_eq!(Money::from_cents(-550).to_display_string(), "-$5.50");
    /// ```
    pub fn to_display_string(&self) -> String {
        let rounded = self.round_currency();
        let fixed = rounded.abs().to_fixed_string();
        let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        let sign = if rounded.is_negative() { "-" } else { "" };
        format!("{sign}{CURRENCY_SYMBOL}{grouped}.{frac}")
    }
}

// =============================================================================
// Percentage Helpers
// =============================================================================

/// `amount × percent / 100`, exact (no rounding).
pub fn percentage_of(amount: Money, percent: Decimal) -> Money {
    Money(amount.0 * percent / Decimal::ONE_HUNDRED)
}

/// Tax on `amount` at `rate_percent`. Same math as [`percentage_of`].
pub fn tax(amount: Money, rate_percent: Decimal) -> Money {
    percentage_of(amount, rate_percent)
}

/// `paid - total`. Negative means the payer still owes.
pub fn change(total: Money, paid: Money) -> Money {
    paid.subtract(total)
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl FromStr for Money {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Decimal::from_str(trimmed)
            .map(Money)
            .map_err(|e| CoreError::invalid_amount(trimmed, e.to_string()))
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl From<i64> for Money {
    fn from(units: i64) -> Self {
        Money::from_major(units)
    }
}

impl Add for Money {
    type Output = Money;

    #[inline]
    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    #[inline]
    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Money;

    #[inline]
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Money;

    #[inline]
    fn mul(self, qty: i64) -> Money {
        Money(self.0 * Decimal::from(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn m(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn test_decimal_addition_is_exact() {
        let total = m("10.10").add(m("0.20"));
        assert_eq!(total.to_fixed_string(), "10.30");
        assert_eq!(total, m("10.3"));
    }

    #[test]
    fn test_many_small_amounts_sum_exactly() {
        let total: Money = std::iter::repeat(m("0.10")).take(1000).sum();
        assert_eq!(total, Money::from_major(100));
    }

    #[test]
    fn test_from_f64_rounds_half_up() {
        let money = Money::from_f64(19.995).unwrap();
        assert_eq!(money.to_fixed_string(), "20.00");
        assert_eq!(m("19.994").to_fixed_string(), "19.99");
        assert_eq!(m("-0.005").to_fixed_string(), "-0.01");
    }

    #[test]
    fn test_from_f64_rejects_non_finite() {
        assert!(matches!(Money::from_f64(f64::NAN), Err(CoreError::InvalidAmount { .. })));
        assert!(matches!(
            Money::from_f64(f64::INFINITY),
            Err(CoreError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!("doce".parse::<Money>(), Err(CoreError::InvalidAmount { .. })));
        assert_eq!(m(" 12.5 ").to_fixed_string(), "12.50");
    }

    #[test]
    fn test_arithmetic_returns_new_values() {
        let a = Money::from_major(10);
        let b = Money::from_major(4);

        assert_eq!(a.subtract(b), Money::from_major(6));
        assert_eq!(a.multiply(3), Money::from_major(30));
        assert_eq!(a.multiply(dec!(0.5)), Money::from_major(5));
        assert_eq!(a.divide(4).unwrap(), m("2.5"));
        assert_eq!(a, Money::from_major(10));
        assert_eq!(a * 2, Money::from_major(20));
        assert_eq!(-a, Money::from_major(-10));
    }

    #[test]
    fn test_divide_by_zero() {
        let result = Money::from_major(10).divide(0);
        assert!(matches!(result, Err(CoreError::DivisionByZero)));
        let result = Money::from_major(10).divide(Money::ZERO);
        assert!(matches!(result, Err(CoreError::DivisionByZero)));
    }

    #[test]
    fn test_comparisons_and_predicates() {
        let ten = m("10.0");
        let also_ten = m("10.00");
        let five = Money::from_major(5);

        assert!(ten.equals(&also_ten));
        assert!(ten.greater_than(&five));
        assert!(five.less_than(&ten));
        assert!(ten.greater_than_or_equal(&also_ten));
        assert!(five.less_than_or_equal(&ten));

        assert!(Money::ZERO.is_zero());
        assert!(five.is_positive());
        assert!((-five).is_negative());
        assert!(!Money::ZERO.is_positive());
    }

    #[test]
    fn test_percentage_helpers() {
        assert_eq!(percentage_of(Money::from_major(200), dec!(15)), Money::from_major(30));
        assert_eq!(tax(Money::from_major(100), dec!(16)), Money::from_major(16));
        assert_eq!(change(Money::from_major(100), Money::from_major(150)), Money::from_major(50));
        assert_eq!(change(Money::from_major(100), Money::from_major(90)), Money::from_major(-10));
    }

    #[test]
    fn test_calculate_tax_keeps_precision_until_rounding() {
        // 16% of 0.33 = 0.0528 -> 0.05
        assert_eq!(m("0.33").calculate_tax(TaxRate::IVA), m("0.05"));
        // 16% of 1.5625 = 0.25
        assert_eq!(m("1.5625").calculate_tax(TaxRate::IVA), m("0.25"));
    }

    #[test]
    fn test_display_string() {
        assert_eq!(Money::from_cents(1099).to_display_string(), "$10.99");
        assert_eq!(Money::from_major(0).to_display_string(), "$0.00");
        assert_eq!(Money::from_cents(123456789).to_display_string(), "$1,234,567.89");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::from_major(100).to_display_string(), "$100.00");
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(m("12.25").to_f64(), 12.25);
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&m("10.30")).unwrap();
        assert_eq!(json, "\"10.30\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m("10.3"));
    }
}
