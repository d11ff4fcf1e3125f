//! Arbitrary-precision decimal floating point.
//!
//! A value is `mantissa × 10^exponent` with a precision (significant digits)
//! carried alongside it. Precision `0` means exact: sums, differences and
//! products of exact values never round, and a quotient of exact values stays
//! exact only when its expansion terminates within [`DEFAULT_PRECISION`] digits.
//! Mixed operands take the larger of the two non-zero precisions.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use std::str::FromStr;

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{Num, One, Signed, Zero};
use thiserror::Error;

/// Digits used for a quotient of two exact values that does not terminate.
pub const DEFAULT_PRECISION: u32 = 50;

/// Largest decimal exponent magnitude accepted when parsing.
pub const MAX_EXPONENT: i64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot parse decimal literal '{0}'")]
pub struct ParseDecimalError(pub String);

#[derive(Debug, Clone)]
pub struct Decimal {
    mantissa: BigInt,
    exponent: i64,
    precision: u32,
}

/// `10^k`. Exponent gaps stay far below `u32::MAX` because parsed
/// exponents are bounded by [`MAX_EXPONENT`].
fn pow10(k: u64) -> BigInt {
    let k = u32::try_from(k).unwrap_or(u32::MAX);
    BigInt::from(10u32).pow(k)
}

fn digit_count(m: &BigInt) -> u64 {
    if m.is_zero() {
        0
    } else {
        m.magnitude().to_str_radix(10).len() as u64
    }
}

/// Integer quotient rounded half away from zero.
fn round_div(n: &BigInt, d: &BigInt) -> BigInt {
    let (q, r) = n.div_rem(d);
    let twice = r.abs() * 2u32;
    if twice >= d.abs() {
        if n.is_negative() != d.is_negative() {
            q - 1
        } else {
            q + 1
        }
    } else {
        q
    }
}

fn merge_precision(a: u32, b: u32) -> u32 {
    match (a, b) {
        (0, p) | (p, 0) => p,
        (a, b) => a.max(b),
    }
}

impl Decimal {
    pub fn new(mantissa: BigInt, exponent: i64) -> Self {
        Self {
            mantissa,
            exponent,
            precision: 0,
        }
        .normalize()
    }

    pub fn from_bigint(n: BigInt) -> Self {
        Self::new(n, 0)
    }

    /// Convert a finite `f64` using its shortest round-trip representation.
    pub fn from_f64(x: f64) -> Option<Self> {
        if !x.is_finite() {
            return None;
        }
        format!("{x:e}").parse().ok()
    }

    /// Round `r` to `precision` significant digits (0 selects [`DEFAULT_PRECISION`]).
    pub fn from_big_rational(r: &BigRational, precision: u32) -> Self {
        let precision = if precision == 0 { DEFAULT_PRECISION } else { precision };
        let numer = Self::from_bigint(r.numer().clone()).with_precision(precision);
        let denom = Self::from_bigint(r.denom().clone());
        numer / denom
    }

    pub fn to_big_rational(&self) -> BigRational {
        if self.exponent >= 0 {
            BigRational::from_integer(&self.mantissa * pow10(self.exponent as u64))
        } else {
            BigRational::new(self.mantissa.clone(), pow10(self.exponent.unsigned_abs()))
        }
    }

    pub fn to_f64(&self) -> f64 {
        format!("{}e{}", self.mantissa, self.exponent)
            .parse()
            .unwrap_or(f64::NAN)
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    /// Re-round to `precision` significant digits; `0` marks the value exact.
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self.normalize()
    }

    /// Power of ten just above the leading digit.
    fn magnitude(&self) -> i64 {
        self.exponent + digit_count(&self.mantissa) as i64
    }

    fn normalize(mut self) -> Self {
        if self.mantissa.is_zero() {
            self.exponent = 0;
            return self;
        }
        if self.precision > 0 {
            let digits = digit_count(&self.mantissa);
            let limit = self.precision as u64;
            if digits > limit {
                let drop = digits - limit;
                self.mantissa = round_div(&self.mantissa, &pow10(drop));
                self.exponent += drop as i64;
            }
        }
        let ten = BigInt::from(10u32);
        loop {
            let (q, r) = self.mantissa.div_rem(&ten);
            if !r.is_zero() || q.is_zero() {
                break;
            }
            self.mantissa = q;
            self.exponent += 1;
        }
        self
    }

    fn aligned(&self, other: &Self) -> (BigInt, BigInt, i64) {
        let e = self.exponent.min(other.exponent);
        let a = &self.mantissa * pow10((self.exponent - e) as u64);
        let b = &other.mantissa * pow10((other.exponent - e) as u64);
        (a, b, e)
    }

    fn add_ref(&self, other: &Self) -> Self {
        let precision = merge_precision(self.precision, other.precision);
        if other.is_zero() {
            return self.clone().with_precision(precision);
        }
        if self.is_zero() {
            return other.clone().with_precision(precision);
        }
        if precision > 0 {
            let reach = precision as i64 + 1;
            if other.magnitude() < self.magnitude() - reach {
                return self.clone().with_precision(precision);
            }
            if self.magnitude() < other.magnitude() - reach {
                return other.clone().with_precision(precision);
            }
        }
        let (a, b, exponent) = self.aligned(other);
        Self {
            mantissa: a + b,
            exponent,
            precision,
        }
        .normalize()
    }

    fn mul_ref(&self, other: &Self) -> Self {
        Self {
            mantissa: &self.mantissa * &other.mantissa,
            exponent: self.exponent + other.exponent,
            precision: merge_precision(self.precision, other.precision),
        }
        .normalize()
    }

    fn div_ref(&self, other: &Self) -> Self {
        assert!(!other.is_zero(), "attempt to divide a Decimal by zero");
        let exact = self.precision == 0 && other.precision == 0;
        let precision = if exact {
            DEFAULT_PRECISION
        } else {
            merge_precision(self.precision, other.precision)
        };
        if self.is_zero() {
            return Self::zero().with_precision(if exact { 0 } else { precision });
        }

        let shift = (precision as i64 + 2 + digit_count(&other.mantissa) as i64
            - digit_count(&self.mantissa) as i64)
            .max(0) as u64;
        let scaled = &self.mantissa * pow10(shift);
        let (q, r) = scaled.div_rem(&other.mantissa);
        let exponent = self.exponent - other.exponent - shift as i64;

        if r.is_zero() {
            let precision = if exact { 0 } else { precision };
            return Self {
                mantissa: q,
                exponent,
                precision,
            }
            .normalize();
        }
        // Sticky digit so that ties below the guard digits round correctly.
        let sticky = if self.mantissa.is_negative() != other.mantissa.is_negative() {
            -1
        } else {
            1
        };
        Self {
            mantissa: q * 10u32 + sticky,
            exponent: exponent - 1,
            precision,
        }
        .normalize()
    }

    /// Render with `digits` significant digits, plain notation for moderate
    /// magnitudes and `d.ddde±X` otherwise.
    pub fn sig_string(&self, digits: u32) -> String {
        let value = if digits > 0 {
            self.clone().with_precision(digits)
        } else {
            self.clone()
        };
        if value.is_zero() {
            return "0".to_string();
        }
        let sign = if value.mantissa.is_negative() { "-" } else { "" };
        let body = value.mantissa.magnitude().to_str_radix(10);
        let len = body.len() as i64;
        let sci = value.exponent + len - 1;

        if (-5..16).contains(&sci) {
            if value.exponent >= 0 {
                format!("{sign}{body}{}", "0".repeat(value.exponent as usize))
            } else if len > -value.exponent {
                let split = (len + value.exponent) as usize;
                format!("{sign}{}.{}", &body[..split], &body[split..])
            } else {
                let zeros = (-value.exponent - len) as usize;
                format!("{sign}0.{}{body}", "0".repeat(zeros))
            }
        } else {
            let tail = if body.len() > 1 {
                format!(".{}", &body[1..])
            } else {
                String::new()
            };
            let exp_sign = if sci < 0 { "-" } else { "+" };
            format!("{sign}{}{tail}e{exp_sign}{}", &body[..1], sci.abs())
        }
    }
}

impl From<i64> for Decimal {
    fn from(n: i64) -> Self {
        Self::from_bigint(BigInt::from(n))
    }
}

impl From<BigInt> for Decimal {
    fn from(n: BigInt) -> Self {
        Self::from_bigint(n)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.mantissa == other.mantissa && self.exponent == other.exponent
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let (a, b, _) = self.aligned(other);
        Some(a.cmp(&b))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sig_string(0))
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError(s.to_string());
        let trimmed = s.trim();
        let (coeff, exp) = match trimmed.find(['e', 'E']) {
            Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
            None => (trimmed, "0"),
        };
        let exp: i64 = exp.parse().map_err(|_| err())?;
        let (negative, coeff) = match coeff.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, coeff.strip_prefix('+').unwrap_or(coeff)),
        };
        let (int_part, frac_part) = coeff.split_once('.').unwrap_or((coeff, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        let digits = format!("{int_part}{frac_part}");
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let magnitude = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(err)?;
        let mantissa = if negative { -magnitude } else { magnitude };
        let exponent = i64::try_from(frac_part.len())
            .ok()
            .and_then(|frac| exp.checked_sub(frac))
            .filter(|e| e.abs() <= MAX_EXPONENT)
            .ok_or_else(err)?;
        Ok(Self::new(mantissa, exponent))
    }
}

impl Zero for Decimal {
    fn zero() -> Self {
        Self {
            mantissa: BigInt::zero(),
            exponent: 0,
            precision: 0,
        }
    }

    fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }
}

impl One for Decimal {
    fn one() -> Self {
        Self {
            mantissa: BigInt::one(),
            exponent: 0,
            precision: 0,
        }
    }
}

impl Neg for Decimal {
    type Output = Decimal;
    fn neg(self) -> Self::Output {
        Self {
            mantissa: -self.mantissa,
            ..self
        }
    }
}

impl Add for Decimal {
    type Output = Decimal;
    fn add(self, rhs: Self) -> Self::Output {
        self.add_ref(&rhs)
    }
}

impl Sub for Decimal {
    type Output = Decimal;
    fn sub(self, rhs: Self) -> Self::Output {
        self.add_ref(&-rhs)
    }
}

impl Mul for Decimal {
    type Output = Decimal;
    fn mul(self, rhs: Self) -> Self::Output {
        self.mul_ref(&rhs)
    }
}

impl Div for Decimal {
    type Output = Decimal;
    fn div(self, rhs: Self) -> Self::Output {
        self.div_ref(&rhs)
    }
}

impl Rem for Decimal {
    type Output = Decimal;
    fn rem(self, rhs: Self) -> Self::Output {
        assert!(!rhs.is_zero(), "attempt to take a Decimal remainder by zero");
        let (a, b, _) = self.aligned(&rhs);
        let quotient = Decimal::from_bigint(a / b);
        let product = rhs.mul_ref(&quotient);
        self.add_ref(&-product)
    }
}

impl Num for Decimal {
    type FromStrRadixErr = ParseDecimalError;

    fn from_str_radix(s: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
        if radix != 10 {
            return Err(ParseDecimalError(format!("{s} (radix {radix})")));
        }
        s.parse()
    }
}

impl Signed for Decimal {
    fn abs(&self) -> Self {
        Self {
            mantissa: self.mantissa.abs(),
            ..self.clone()
        }
    }

    fn abs_sub(&self, other: &Self) -> Self {
        if self <= other {
            Self::zero()
        } else {
            self.clone() - other.clone()
        }
    }

    fn signum(&self) -> Self {
        match self.mantissa.sign() {
            Sign::Minus => -Self::one(),
            Sign::NoSign => Self::zero(),
            Sign::Plus => Self::one(),
        }
    }

    fn is_positive(&self) -> bool {
        self.mantissa.is_positive()
    }

    fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }
}
