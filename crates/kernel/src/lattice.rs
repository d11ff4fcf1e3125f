//! Period lattices `ℤω₁ + ℤω₂` in the complex plane.
//!
//! Sublattices scale both periods by `2^(-d)`: `L_d(p, q) = ℤ(p·2^(-d)) + ℤ(q·2^(-d)·i)`,
//! so `L_0` is the primary lattice and negative degrees are rejected.

use num_bigint::BigInt;
use num_complex::Complex;
use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KernelError, KernelResult};
use crate::numeric::{checked_div, Scalar};

/// Per-axis point count used by [`discrete_ld_points`] at degree 0 when no cap is given.
pub const DEGREE_ZERO_RANGE: u64 = 20;
/// Per-axis cap used by [`discrete_ld_points`] at positive degree when no cap is given.
pub const DEFAULT_DISCRETE_CAP: usize = 50;

/// A lattice given by two fundamental periods.
///
/// Construction is unchecked; callers that cannot guarantee ℝ-independent
/// periods should call [`Lattice::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice<S> {
    pub omega1: Complex<S>,
    pub omega2: Complex<S>,
}

impl<S: Scalar> Lattice<S> {
    pub fn new(omega1: Complex<S>, omega2: Complex<S>) -> Self {
        Self { omega1, omega2 }
    }

    pub fn periods(&self) -> (&Complex<S>, &Complex<S>) {
        (&self.omega1, &self.omega2)
    }

    /// τ = ω₂/ω₁.
    pub fn tau(&self) -> KernelResult<Complex<S>> {
        checked_div(&self.omega2, &self.omega1, "lattice ratio tau")
    }

    /// The lattice point `m·ω₁ + n·ω₂`.
    pub fn point(&self, m: i64, n: i64) -> Complex<S> {
        self.omega1.clone() * S::from_int(m) + self.omega2.clone() * S::from_int(n)
    }

    /// ω₁/4 + ω₂/4, the default projection basepoint.
    pub fn quarter_period(&self) -> Complex<S> {
        (self.omega1.clone() + self.omega2.clone()) * S::from_ratio(1, 4)
    }

    /// The lattice with both periods multiplied by `lambda`.
    pub fn scaled(&self, lambda: &Complex<S>) -> Self {
        Self::new(
            self.omega1.clone() * lambda.clone(),
            self.omega2.clone() * lambda.clone(),
        )
    }

    /// True when ω₁ and ω₂ are linearly dependent over ℝ (including a zero period).
    pub fn is_degenerate(&self) -> bool {
        let cross = self.omega1.re.clone() * self.omega2.im.clone()
            - self.omega1.im.clone() * self.omega2.re.clone();
        cross.is_zero()
    }

    pub fn validate(&self) -> KernelResult<()> {
        if self.is_degenerate() {
            Err(KernelError::DependentPeriods)
        } else {
            Ok(())
        }
    }
}

/// The primary lattice `ℤp + ℤ(q·i)`.
pub fn primary_lattice<S: Scalar>(p: S, q: S) -> Lattice<S> {
    Lattice::new(
        Complex::new(p, S::zero()),
        Complex::new(S::zero(), q),
    )
}

/// The degree-`d` sublattice `ℤ(p·2^(-d)) + ℤ(q·2^(-d)·i)`.
pub fn sublattice<S: Scalar>(p: S, q: S, degree: i64) -> KernelResult<Lattice<S>> {
    if degree < 0 {
        return Err(KernelError::invalid(format!(
            "sublattice degree must be non-negative, got {degree}"
        )));
    }
    let half = S::from_ratio(1, 2);
    let mut scale = S::one();
    for _ in 0..degree {
        scale = scale * half.clone();
    }
    debug!(degree, "building sublattice");
    Ok(primary_lattice(p * scale.clone(), q * scale))
}

/// All `n₁ω₁ + n₂ω₂` with `|n₁|, |n₂| ≤ n_max`, origin excluded, in
/// lexicographic `(n₁, n₂)` order. Yields `(2·n_max + 1)² − 1` points.
pub fn lattice_points<S: Scalar>(lattice: &Lattice<S>, n_max: u32) -> Vec<Complex<S>> {
    let n = n_max as i64;
    let side = (2 * n + 1) as usize;
    let mut points = Vec::with_capacity(side * side - 1);
    for n1 in -n..=n {
        for n2 in -n..=n {
            if n1 == 0 && n2 == 0 {
                continue;
            }
            points.push(lattice.point(n1, n2));
        }
    }
    points
}

/// Grid points `m/p^d + i·n/q^d` for `0 ≤ m < min(p^d, cap)`, `0 ≤ n < min(q^d, cap)`,
/// in exact rational arithmetic.
///
/// At degree 0 the grid is `m + i·n` over `cap` (or `min(p, 20)` / `min(q, 20)`) values
/// per axis instead of the single point `p^0 = 1` would give.
pub fn discrete_ld_points(
    p: u64,
    q: u64,
    degree: u32,
    cap: Option<usize>,
) -> KernelResult<Vec<Complex<BigRational>>> {
    if p == 0 || q == 0 {
        return Err(KernelError::invalid(format!(
            "discrete lattice seeds must be positive, got p={p}, q={q}"
        )));
    }

    let (p_den, q_den) = (BigInt::from(p).pow(degree), BigInt::from(q).pow(degree));
    let axis_count = |seed: u64, den: &BigInt| -> usize {
        if degree == 0 {
            cap.unwrap_or(seed.min(DEGREE_ZERO_RANGE) as usize)
        } else {
            let limit = cap.unwrap_or(DEFAULT_DISCRETE_CAP);
            den.to_usize().map_or(limit, |d| d.min(limit))
        }
    };
    let m_count = axis_count(p, &p_den);
    let n_count = axis_count(q, &q_den);

    let mut points = Vec::with_capacity(m_count * n_count);
    for m in 0..m_count {
        for n in 0..n_count {
            let re = BigRational::new(BigInt::from(m), p_den.clone());
            let im = BigRational::new(BigInt::from(n), q_den.clone());
            points.push(Complex::new(re, im));
        }
    }
    debug!(p, q, degree, m_count, n_count, "generated discrete lattice points");
    Ok(points)
}

/// `p^d` as an exact rational, used to check discrete points lie on the grid.
pub fn grid_denominator(seed: u64, degree: u32) -> BigRational {
    if degree == 0 {
        return BigRational::one();
    }
    BigRational::from_integer(BigInt::from(seed).pow(degree))
}
