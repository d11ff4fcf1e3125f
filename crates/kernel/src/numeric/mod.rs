//! Numeric backends shared by the series, projection and mesh code.
//!
//! Every algorithm in the kernel is written once against [`Scalar`]; complex
//! values are `num_complex::Complex<S>`. Three backends are provided:
//! - [`BigRational`]: exact rational arithmetic.
//! - [`Decimal`]: arbitrary-precision decimal floating point.
//! - `f64`: hardware floats for interactive use.

pub mod decimal;

use std::fmt;
use std::ops::Neg;

use num_bigint::BigInt;
use num_complex::{Complex, Complex64};
use num_rational::BigRational;
use num_traits::{Num, ToPrimitive, Zero};

use crate::error::{KernelError, KernelResult};

pub use decimal::{Decimal, DEFAULT_PRECISION};

/// Real field operations needed by the lattice sums.
pub trait Scalar:
    Clone + fmt::Debug + fmt::Display + PartialEq + PartialOrd + Num + Neg<Output = Self>
{
    fn from_int(n: i64) -> Self;

    /// `numer / denom`; `denom` must be non-zero.
    fn from_ratio(numer: i64, denom: i64) -> Self;

    /// Nearest `f64`, possibly infinite or NaN for out-of-range values.
    fn as_f64(&self) -> f64;

    /// Round to `digits` significant decimal digits.
    fn round_sig(&self, digits: u32) -> Self;

    /// Decimal rendering with `digits` significant digits.
    fn sig_string(&self, digits: u32) -> String;

    fn is_finite(&self) -> bool {
        true
    }

    /// Working precision hint; only meaningful for [`Decimal`].
    fn with_precision(self, _digits: u32) -> Self {
        self
    }
}

impl Scalar for f64 {
    fn from_int(n: i64) -> Self {
        n as f64
    }

    fn from_ratio(numer: i64, denom: i64) -> Self {
        numer as f64 / denom as f64
    }

    fn as_f64(&self) -> f64 {
        *self
    }

    fn round_sig(&self, digits: u32) -> Self {
        if !f64::is_finite(*self) || *self == 0.0 || digits == 0 {
            return *self;
        }
        let places = (digits - 1) as usize;
        format!("{:.*e}", places, self).parse().unwrap_or(*self)
    }

    fn sig_string(&self, digits: u32) -> String {
        match Decimal::from_f64(*self) {
            Some(d) => d.sig_string(digits),
            None => self.to_string(),
        }
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
}

impl Scalar for BigRational {
    fn from_int(n: i64) -> Self {
        BigRational::from_integer(BigInt::from(n))
    }

    fn from_ratio(numer: i64, denom: i64) -> Self {
        debug_assert!(denom != 0, "from_ratio with zero denominator");
        BigRational::new(BigInt::from(numer), BigInt::from(denom))
    }

    fn as_f64(&self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }

    fn round_sig(&self, digits: u32) -> Self {
        if self.is_zero() {
            return self.clone();
        }
        Decimal::from_big_rational(self, digits).to_big_rational()
    }

    fn sig_string(&self, digits: u32) -> String {
        Decimal::from_big_rational(self, digits).sig_string(digits)
    }
}

impl Scalar for Decimal {
    fn from_int(n: i64) -> Self {
        Decimal::from(n)
    }

    fn from_ratio(numer: i64, denom: i64) -> Self {
        Decimal::from(numer) / Decimal::from(denom)
    }

    fn as_f64(&self) -> f64 {
        self.to_f64()
    }

    fn round_sig(&self, digits: u32) -> Self {
        self.clone().with_precision(digits)
    }

    fn sig_string(&self, digits: u32) -> String {
        Decimal::sig_string(self, digits)
    }

    fn with_precision(self, digits: u32) -> Self {
        Decimal::with_precision(self, digits)
    }
}

/// `re + im·i` from integers.
pub fn c_int<S: Scalar>(re: i64, im: i64) -> Complex<S> {
    Complex::new(S::from_int(re), S::from_int(im))
}

/// Embed a real scalar.
pub fn c_real<S: Scalar>(re: S) -> Complex<S> {
    Complex::new(re, S::zero())
}

/// `1 / z`, failing instead of dividing by an exact zero.
pub fn checked_inv<S: Scalar>(z: &Complex<S>, context: &'static str) -> KernelResult<Complex<S>> {
    let norm = z.norm_sqr();
    if norm.is_zero() {
        return Err(KernelError::DivisionByZero { context });
    }
    Ok(Complex::new(
        z.re.clone() / norm.clone(),
        -z.im.clone() / norm,
    ))
}

pub fn checked_div<S: Scalar>(
    a: &Complex<S>,
    b: &Complex<S>,
    context: &'static str,
) -> KernelResult<Complex<S>> {
    Ok(a.clone() * checked_inv(b, context)?)
}

pub fn round_complex<S: Scalar>(z: &Complex<S>, digits: u32) -> Complex<S> {
    Complex::new(z.re.round_sig(digits), z.im.round_sig(digits))
}

/// Apply an optional post-hoc rounding step.
pub fn round_opt<S: Scalar>(z: Complex<S>, precision: Option<u32>) -> Complex<S> {
    match precision {
        Some(digits) => round_complex(&z, digits),
        None => z,
    }
}

pub fn with_precision_complex<S: Scalar>(z: Complex<S>, digits: u32) -> Complex<S> {
    Complex::new(z.re.with_precision(digits), z.im.with_precision(digits))
}

pub fn to_complex64<S: Scalar>(z: &Complex<S>) -> Complex64 {
    Complex64::new(z.re.as_f64(), z.im.as_f64())
}

pub fn is_finite_complex<S: Scalar>(z: &Complex<S>) -> bool {
    z.re.is_finite() && z.im.is_finite()
}

/// `re ± im·i` with both parts at `digits` significant digits.
///
/// An imaginary part more than `digits` orders of magnitude below the real
/// part is summation noise at that precision and is left out.
pub fn complex_sig_string<S: Scalar>(z: &Complex<S>, digits: u32) -> String {
    let floor = z.re.as_f64().abs() * 10f64.powi(-(digits as i32));
    if z.im.is_zero() || z.im.as_f64().abs() <= floor {
        return z.re.sig_string(digits);
    }
    let im = z.im.sig_string(digits);
    match im.strip_prefix('-') {
        Some(abs) => format!("{} - {}*I", z.re.sig_string(digits), abs),
        None => format!("{} + {}*I", z.re.sig_string(digits), im),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_checked_inv_rejects_zero() {
        let zero: Complex<BigRational> = c_int(0, 0);
        assert_eq!(
            checked_inv(&zero, "test"),
            Err(KernelError::DivisionByZero { context: "test" })
        );
    }

    #[test]
    fn test_checked_inv_exact() {
        let z: Complex<BigRational> = c_int(3, 4);
        let inv = checked_inv(&z, "test").unwrap();
        assert_eq!(inv.re, BigRational::from_ratio(3, 25));
        assert_eq!(inv.im, BigRational::from_ratio(-4, 25));
        assert_eq!(z * inv, c_int(1, 0));
    }

    #[test]
    fn test_f64_round_sig() {
        assert_relative_eq!(std::f64::consts::PI.round_sig(3), 3.14);
        assert_relative_eq!((-123456.0f64).round_sig(2), -120000.0);
        assert!(f64::NAN.round_sig(3).is_nan());
    }

    #[test]
    fn test_rational_round_sig() {
        let third = BigRational::from_ratio(1, 3);
        assert_eq!(third.round_sig(4), BigRational::from_ratio(3333, 10000));
        assert_eq!(third.sig_string(4), "0.3333");
    }

    #[test]
    fn test_backends_agree_on_sig_string() {
        let x = 2.0f64 / 7.0;
        let d = Decimal::from_ratio(2, 7);
        let r = BigRational::from_ratio(2, 7);
        assert_eq!(x.sig_string(8), "0.28571429");
        assert_eq!(d.sig_string(8), "0.28571429");
        assert_eq!(r.sig_string(8), "0.28571429");
    }

    #[test]
    fn test_complex_sig_string() {
        let z: Complex<f64> = Complex::new(1.5, -0.25);
        assert_eq!(complex_sig_string(&z, 8), "1.5 - 0.25*I");
        let w: Complex<f64> = Complex::new(2.0, 0.0);
        assert_eq!(complex_sig_string(&w, 8), "2");
        let noisy: Complex<f64> = Complex::new(130.5, 3e-15);
        assert_eq!(complex_sig_string(&noisy, 8), "130.5");
        let imaginary: Complex<f64> = Complex::new(0.0, 3e-15);
        assert_eq!(complex_sig_string(&imaginary, 2), "0 + 3e-15*I");
    }
}
