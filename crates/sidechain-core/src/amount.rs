//! Value types for the native asset and registered tokens.
//!
//! The native asset is valued in [`Fixed64`], a signed 64-bit fixed-point
//! number at 10^-8 scale. Every other asset carries an arbitrary-precision
//! [`TokenValue`].

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

/// Decimal places of one native unit.
pub const NATIVE_PRECISION: u8 = 8;

/// Decimal exponent token amounts are expressed in.
pub const TOKEN_PRECISION: u8 = 18;

const NATIVE_SCALE: i64 = 100_000_000;

/// Arbitrary-precision amount of a non-native asset.
pub type TokenValue = BigInt;

/// Native amount in units of 10^-8.
///
/// Arithmetic operators panic on overflow in every build profile; an
/// overflowing sum is a defect in the caller, never a value. Use
/// [`Fixed64::checked_add`] / [`Fixed64::checked_sub`] where the operands are
/// untrusted.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Fixed64(pub i64);

impl Fixed64 {
    pub const ZERO: Self = Self(0);

    /// Create from raw 10^-8 units.
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Create from whole native coins.
    pub const fn from_coins(coins: i64) -> Self {
        Self(coins * NATIVE_SCALE)
    }

    /// Raw 10^-8 units.
    pub const fn raw(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Convert a main-chain amount into side-chain units.
    ///
    /// Computed as `amount * rate` in `f64` and truncated toward zero, which
    /// is the chain's reference rounding; for non-negative amounts this is
    /// the floor.
    pub fn exchange(self, rate: f64) -> Self {
        Self((self.0 as f64 * rate) as i64)
    }
}

impl Add for Fixed64 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        match self.0.checked_add(rhs.0) {
            Some(v) => Self(v),
            None => panic!("Fixed64 overflow: {} + {}", self.0, rhs.0),
        }
    }
}

impl Sub for Fixed64 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Self(v),
            None => panic!("Fixed64 overflow: {} - {}", self.0, rhs.0),
        }
    }
}

impl AddAssign for Fixed64 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fixed64 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Fixed64 {
    type Output = Self;

    fn neg(self) -> Self {
        Fixed64::ZERO - self
    }
}

impl Sum for Fixed64 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Fixed64::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Fixed64> for Fixed64 {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Debug for Fixed64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed64({})", self)
    }
}

impl fmt::Display for Fixed64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = NATIVE_SCALE as u64;
        write!(f, "{}{}.{:08}", sign, abs / scale, abs % scale)
    }
}

/// Whether a native amount is representable at an asset's declared precision.
///
/// `amount` is in units of `10^-target`; it must be a multiple of
/// `10^(target - precision)`. A precision finer than the target never fits.
pub fn check_amount_precise(amount: Fixed64, precision: u8, target: u8) -> bool {
    let Some(exp) = target.checked_sub(precision) else {
        return false;
    };
    match 10i64.checked_pow(u32::from(exp)) {
        Some(step) => amount.0 % step == 0,
        None => false,
    }
}

/// Token counterpart of [`check_amount_precise`].
pub fn check_token_precise(amount: &TokenValue, precision: u8, target: u8) -> bool {
    let Some(exp) = target.checked_sub(precision) else {
        return false;
    };
    let step = BigInt::from(10u8).pow(u32::from(exp));
    (amount % step).is_zero()
}

/// Whether a token value is strictly positive.
pub fn is_positive_token(value: &TokenValue) -> bool {
    value.is_positive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Fixed64::from_raw(150_000_000).to_string(), "1.50000000");
        assert_eq!(Fixed64::from_raw(-1).to_string(), "-0.00000001");
        assert_eq!(Fixed64::ZERO.to_string(), "0.00000000");
    }

    #[test]
    fn test_exchange_truncates() {
        // 100 coins at 0.8 credits exactly 80 coins.
        let credited = Fixed64::from_raw(100_00000000).exchange(0.8);
        assert_eq!(credited, Fixed64::from_raw((100_00000000i64 as f64 * 0.8) as i64));
        assert_eq!(credited, Fixed64::from_raw(80_00000000));

        // Fractions of a unit are dropped, not rounded.
        assert_eq!(Fixed64::from_raw(3).exchange(0.5), Fixed64::from_raw(1));
    }

    #[test]
    fn test_precision_native() {
        // precision 2 at target 8 needs multiples of 10^6.
        assert!(check_amount_precise(Fixed64::from_raw(3_000_000), 2, 8));
        assert!(!check_amount_precise(Fixed64::from_raw(3_000_001), 2, 8));
        assert!(check_amount_precise(Fixed64::from_raw(1), 8, 8));
        assert!(!check_amount_precise(Fixed64::from_raw(0), 9, 8));
    }

    #[test]
    fn test_precision_token() {
        let step = BigInt::from(10u8).pow(10);
        assert!(check_token_precise(&(step.clone() * 7), 8, 18));
        assert!(!check_token_precise(&(step + 1), 8, 18));
        assert!(check_token_precise(&BigInt::from(123), 18, 18));
    }

    #[test]
    fn test_checked_ops() {
        assert_eq!(Fixed64::from_raw(i64::MAX).checked_add(Fixed64::from_raw(1)), None);
        assert_eq!(
            Fixed64::from_raw(5).checked_sub(Fixed64::from_raw(7)),
            Some(Fixed64::from_raw(-2))
        );
    }

    #[test]
    #[should_panic(expected = "Fixed64 overflow")]
    fn test_add_overflow_panics() {
        let _ = Fixed64::from_raw(i64::MAX) + Fixed64::from_raw(1);
    }

    #[test]
    fn test_sum() {
        let values = [Fixed64::from_raw(1), Fixed64::from_raw(2), Fixed64::from_raw(3)];
        assert_eq!(values.iter().sum::<Fixed64>(), Fixed64::from_raw(6));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_native_precision_matches_token_precision(raw in any::<i64>(), precision in 0u8..=8) {
                prop_assert_eq!(
                    check_amount_precise(Fixed64::from_raw(raw), precision, NATIVE_PRECISION),
                    check_token_precise(&BigInt::from(raw), precision, NATIVE_PRECISION)
                );
            }

            #[test]
            fn test_exchange_at_unit_rate_is_identity(raw in 0i64..(1i64 << 53)) {
                prop_assert_eq!(Fixed64::from_raw(raw).exchange(1.0), Fixed64::from_raw(raw));
            }
        }
    }
}
