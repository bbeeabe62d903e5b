use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------     MoneyCents       --------------------------------------------------------
/// An amount of money in the smallest currency unit (cents).
///
/// All ledger arithmetic in the settlement engine happens on this type. It is a plain `i64` under the hood, so sums
/// and differences are exact; floating point never enters any money calculation.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MoneyCents(i64);

op!(binary MoneyCents, Add, add);
op!(binary MoneyCents, Sub, sub);
op!(inplace MoneyCents, SubAssign, sub_assign);
op!(unary MoneyCents, Neg, neg);

impl Mul<i64> for MoneyCents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for MoneyCents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for MoneyCents {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MoneyCents {}

impl TryFrom<u64> for MoneyCents {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to MoneyCents", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for MoneyCents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl MoneyCents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_whole(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiplies the amount by a rate given in basis points (1 bps = 0.01%), rounding half-up.
    ///
    /// This is the only scaling operation the fee calculator is allowed to use. It is exact integer arithmetic, so
    /// re-running it on the same inputs always yields the same result.
    pub fn scale_bps(&self, bps: i64) -> Self {
        let numerator = self.0 * bps;
        // round half-up, away from zero for negative amounts
        let rounded = if numerator >= 0 { (numerator + 5_000) / 10_000 } else { (numerator - 5_000) / 10_000 };
        Self(rounded)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_formats_cents() {
        assert_eq!(MoneyCents::from(12995).to_string(), "129.95");
        assert_eq!(MoneyCents::from(5).to_string(), "0.05");
        assert_eq!(MoneyCents::from(-150).to_string(), "-1.50");
    }

    #[test]
    fn scale_bps_rounds_half_up() {
        // 10000 * 10% = 1000, exact
        assert_eq!(MoneyCents::from(10000).scale_bps(1000), MoneyCents::from(1000));
        // 11500 * 13% = 1495.0, exact
        assert_eq!(MoneyCents::from(11500).scale_bps(1300), MoneyCents::from(1495));
        // 999 * 5% = 49.95 -> 50
        assert_eq!(MoneyCents::from(999).scale_bps(500), MoneyCents::from(50));
        // 989 * 5% = 49.45 -> 49
        assert_eq!(MoneyCents::from(989).scale_bps(500), MoneyCents::from(49));
        // 10 * 2.5% = 0.25 -> 0
        assert_eq!(MoneyCents::from(10).scale_bps(250), MoneyCents::from(0));
        // 20 * 2.5% = 0.50 -> rounds up to 1 (half-up)
        assert_eq!(MoneyCents::from(20).scale_bps(250), MoneyCents::from(1));
    }

    #[test]
    fn sums_are_exact() {
        let total: MoneyCents = (1..=100).map(MoneyCents::from).sum();
        assert_eq!(total, MoneyCents::from(5050));
    }
}
