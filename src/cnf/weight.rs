use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use thiserror::Error;

/// Exact clause weight. Integral weights print as integers, everything else
/// as `p/q`; decimal tokens such as `2.5` or `1.5e-3` are read without
/// rounding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Weight(BigRational);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a weight")]
pub struct WeightParseError(pub String);

impl Weight {
    pub fn zero() -> Self {
        Self(BigRational::zero())
    }

    pub fn one() -> Self {
        Self(BigRational::one())
    }

    pub fn from_int(v: i64) -> Self {
        Self(BigRational::from_integer(BigInt::from(v)))
    }

    pub fn from_ratio(numer: i64, denom: i64) -> Option<Self> {
        if denom == 0 {
            return None;
        }
        Some(Self(BigRational::new(BigInt::from(numer), BigInt::from(denom))))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_integer() {
            write!(f, "{}", self.0.numer())
        } else {
            write!(f, "{}/{}", self.0.numer(), self.0.denom())
        }
    }
}

impl FromStr for Weight {
    type Err = WeightParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || WeightParseError(s.to_owned());
        let t = s.trim();
        if t.is_empty() || t.contains('_') {
            return Err(err());
        }

        if let Some((numer, denom)) = t.split_once('/') {
            let numer = numer.parse::<BigInt>().map_err(|_| err())?;
            let denom = denom.parse::<BigInt>().map_err(|_| err())?;
            if denom.is_zero() {
                return Err(err());
            }
            return Ok(Self(BigRational::new(numer, denom)));
        }

        let (mantissa, exp) = match t.split_once(['e', 'E']) {
            Some((m, e)) => (m, e.parse::<i32>().map_err(|_| err())?),
            None => (t, 0),
        };
        if exp.unsigned_abs() > MAX_EXPONENT {
            return Err(err());
        }
        let value = parse_decimal(mantissa).ok_or_else(err)?;
        let scale = BigRational::from_integer(BigInt::from(10u32).pow(exp.unsigned_abs()));
        if exp < 0 {
            Ok(Self(value / scale))
        } else {
            Ok(Self(value * scale))
        }
    }
}

// decimal exponents past the f64 range are refused
const MAX_EXPONENT: u32 = 308;

fn parse_decimal(t: &str) -> Option<BigRational> {
    if let Some((int, frac)) = t.split_once('.') {
        let digits_ok = !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit());
        let unsigned = int.trim_start_matches(['-', '+']);
        if !digits_ok
            || int.len() > unsigned.len() + 1
            || !unsigned.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let numer = format!("{int}{frac}").parse::<BigInt>().ok()?;
        let exp = u32::try_from(frac.len()).ok()?;
        return Some(BigRational::new(numer, BigInt::from(10u32).pow(exp)));
    }
    t.parse::<BigInt>().ok().map(BigRational::from_integer)
}

impl Add for Weight {
    type Output = Weight;

    fn add(self, rhs: Weight) -> Weight {
        Weight(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Weight> for &'a Weight {
    type Output = Weight;

    fn add(self, rhs: &'a Weight) -> Weight {
        Weight(&self.0 + &rhs.0)
    }
}

impl AddAssign<&Weight> for Weight {
    fn add_assign(&mut self, rhs: &Weight) {
        self.0 += &rhs.0;
    }
}

impl Sub for Weight {
    type Output = Weight;

    fn sub(self, rhs: Weight) -> Weight {
        Weight(self.0 - rhs.0)
    }
}

impl Neg for Weight {
    type Output = Weight;

    fn neg(self) -> Weight {
        Weight(-self.0)
    }
}

impl Sum for Weight {
    fn sum<I: Iterator<Item = Weight>>(iter: I) -> Weight {
        iter.fold(Weight::zero(), |acc, w| acc + w)
    }
}

impl<'a> Sum<&'a Weight> for Weight {
    fn sum<I: Iterator<Item = &'a Weight>>(iter: I) -> Weight {
        let mut total = Weight::zero();
        for w in iter {
            total += w;
        }
        total
    }
}

impl From<i64> for Weight {
    fn from(v: i64) -> Self {
        Weight::from_int(v)
    }
}
