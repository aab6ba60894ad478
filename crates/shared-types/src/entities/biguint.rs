//! Arbitrary-precision unsigned integer for wei-denominated values.
//!
//! Wraps [`primitive_types::U256`] rather than a fixed 64-bit integer so
//! that gas costs and transfer values (which routinely exceed `u64::MAX`
//! in wei) never silently truncate. Always serializes as a decimal string,
//! per the store and push-channel wire format.

use primitive_types::U256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct BigUint(U256);

impl BigUint {
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub fn from_u64(v: u64) -> Self {
        Self(U256::from(v))
    }

    pub fn from_u128(v: u128) -> Self {
        Self(U256::from(v))
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn to_decimal_string(&self) -> String {
        self.0.to_string()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn saturating_sub(&self, other: &Self) -> Self {
        if self.0 >= other.0 {
            Self(self.0 - other.0)
        } else {
            Self::zero()
        }
    }

    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_mul(&self, other: &Self) -> Option<Self> {
        self.0.checked_mul(other.0).map(Self)
    }

    /// Integer square root via Newton's method, exact for perfect squares
    /// and floor-rounded otherwise. Used by the baseline job to derive
    /// gas/value standard deviations from a sum of squared deviations
    /// without ever downcasting to floats (§4.6).
    pub fn isqrt(&self) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        let n = self.0;
        // Initial guess: a power of two above the true root, found via
        // bit length, guarantees convergence from above.
        let bits = n.bits();
        let mut x = U256::one() << bits.div_ceil(2);
        loop {
            // y = (x + n/x) / 2
            let y = (x + n / x) >> 1;
            if y >= x {
                break;
            }
            x = y;
        }
        Self(x)
    }
}

impl Add for BigUint {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for BigUint {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul for BigUint {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Div for BigUint {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        Self(self.0 / rhs.0)
    }
}

impl fmt::Display for BigUint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BigUint {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_dec_str(s)
            .map(Self)
            .map_err(|_| "invalid decimal big integer")
    }
}

impl From<u64> for BigUint {
    fn from(v: u64) -> Self {
        Self::from_u64(v)
    }
}

impl Serialize for BigUint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for BigUint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(|_| D::Error::custom(format!("invalid decimal big integer: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_decimal_string() {
        let v = BigUint::from_u128(50_000_000_000_000_000_000u128);
        let s = v.to_decimal_string();
        let parsed: BigUint = s.parse().unwrap();
        assert_eq!(v, parsed);
    }

    #[test]
    fn isqrt_is_exact_for_perfect_squares() {
        let v = BigUint::from_u64(144);
        assert_eq!(v.isqrt(), BigUint::from_u64(12));
    }

    #[test]
    fn isqrt_floors_for_non_squares() {
        let v = BigUint::from_u64(10);
        assert_eq!(v.isqrt(), BigUint::from_u64(3));
    }

    #[test]
    fn isqrt_of_zero_is_zero() {
        assert_eq!(BigUint::zero().isqrt(), BigUint::zero());
    }

    #[test]
    fn isqrt_handles_large_wei_values() {
        // (10^18)^2 = 10^36, well beyond u128.
        let big = BigUint::from_u128(1_000_000_000_000_000_000u128)
            .checked_mul(&BigUint::from_u128(1_000_000_000_000_000_000u128))
            .unwrap();
        assert_eq!(big.isqrt(), BigUint::from_u128(1_000_000_000_000_000_000u128));
    }
}
