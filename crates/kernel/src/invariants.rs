//! Eisenstein-series invariants `g₂`, `g₃` and the quantities derived from them.
//!
//! The lattice sums are truncated to the square window `|m|, |n| ≤ n_max` and
//! accumulated in lexicographic `(m, n)` order, so a given backend always
//! produces the same digits for the same inputs.

use num_complex::Complex;
use num_traits::Zero;
use tracing::{info, instrument};

use crate::error::{KernelError, KernelResult};
use crate::lattice::{sublattice, Lattice};
use crate::numeric::{checked_div, checked_inv, round_complex, Decimal, Scalar};

/// Extra digits carried while summing in [`invariants_numeric`].
pub const GUARD_DIGITS: u32 = 10;

/// Σ' (mω₁ + nω₂)^(-exponent) over the truncated window.
fn eisenstein_sum<S: Scalar>(
    omega1: &Complex<S>,
    omega2: &Complex<S>,
    n_max: u32,
    exponent: u32,
) -> KernelResult<Complex<S>> {
    let lattice = Lattice::new(omega1.clone(), omega2.clone());
    let n = n_max as i64;
    let mut sum = Complex::<S>::zero();
    for m in -n..=n {
        for k in -n..=n {
            if m == 0 && k == 0 {
                continue;
            }
            let inv = checked_inv(&lattice.point(m, k), "Eisenstein term")
                .map_err(|_| KernelError::DegenerateLattice { m, n: k })?;
            sum = sum + inv.powu(exponent);
        }
    }
    Ok(sum)
}

/// g₂ = 60 Σ' (mω₁ + nω₂)⁻⁴.
#[instrument(level = "debug", skip(omega1, omega2))]
pub fn eisenstein_g2<S: Scalar>(
    omega1: &Complex<S>,
    omega2: &Complex<S>,
    n_max: u32,
) -> KernelResult<Complex<S>> {
    Ok(eisenstein_sum(omega1, omega2, n_max, 4)? * S::from_int(60))
}

/// g₃ = 140 Σ' (mω₁ + nω₂)⁻⁶.
#[instrument(level = "debug", skip(omega1, omega2))]
pub fn eisenstein_g3<S: Scalar>(
    omega1: &Complex<S>,
    omega2: &Complex<S>,
    n_max: u32,
) -> KernelResult<Complex<S>> {
    Ok(eisenstein_sum(omega1, omega2, n_max, 6)? * S::from_int(140))
}

/// Δ = g₂³ − 27g₃².
pub fn discriminant<S: Scalar>(g2: &Complex<S>, g3: &Complex<S>) -> Complex<S> {
    g2.powu(3) - g3.powu(2) * S::from_int(27)
}

/// j = 1728·g₂³/Δ; fails with [`KernelError::SingularCurve`] when Δ = 0.
pub fn j_invariant<S: Scalar>(g2: &Complex<S>, g3: &Complex<S>) -> KernelResult<Complex<S>> {
    let delta = discriminant(g2, g3);
    if delta.is_zero() {
        return Err(KernelError::SingularCurve);
    }
    checked_div(&(g2.powu(3) * S::from_int(1728)), &delta, "j-invariant")
}

/// The Weierstrass curve y² = 4x³ − g₂x − g₃ of a lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct EllipticCurve<S> {
    pub g2: Complex<S>,
    pub g3: Complex<S>,
    pub discriminant: Complex<S>,
}

impl<S: Scalar> EllipticCurve<S> {
    pub fn from_invariants(g2: Complex<S>, g3: Complex<S>) -> Self {
        let discriminant = discriminant(&g2, &g3);
        Self {
            g2,
            g3,
            discriminant,
        }
    }

    pub fn is_singular(&self) -> bool {
        self.discriminant.is_zero()
    }

    pub fn j_invariant(&self) -> KernelResult<Complex<S>> {
        if self.is_singular() {
            return Err(KernelError::SingularCurve);
        }
        checked_div(
            &(self.g2.powu(3) * S::from_int(1728)),
            &self.discriminant,
            "j-invariant",
        )
    }
}

pub fn elliptic_curve<S: Scalar>(lattice: &Lattice<S>, n_max: u32) -> KernelResult<EllipticCurve<S>> {
    let g2 = eisenstein_g2(&lattice.omega1, &lattice.omega2, n_max)?;
    let g3 = eisenstein_g3(&lattice.omega1, &lattice.omega2, n_max)?;
    Ok(EllipticCurve::from_invariants(g2, g3))
}

pub fn g2_for_sublattice<S: Scalar>(p: S, q: S, degree: i64, n_max: u32) -> KernelResult<Complex<S>> {
    let l = sublattice(p, q, degree)?;
    eisenstein_g2(&l.omega1, &l.omega2, n_max)
}

pub fn g3_for_sublattice<S: Scalar>(p: S, q: S, degree: i64, n_max: u32) -> KernelResult<Complex<S>> {
    let l = sublattice(p, q, degree)?;
    eisenstein_g3(&l.omega1, &l.omega2, n_max)
}

pub fn curve_for_sublattice<S: Scalar>(
    p: S,
    q: S,
    degree: i64,
    n_max: u32,
) -> KernelResult<EllipticCurve<S>> {
    elliptic_curve(&sublattice(p, q, degree)?, n_max)
}

/// Invariants of `L_d(p, q)` rounded to a fixed number of significant digits.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantSet {
    pub g2: Complex<Decimal>,
    pub g3: Complex<Decimal>,
    pub discriminant: Complex<Decimal>,
    pub j: Complex<Decimal>,
    pub precision: u32,
}

/// Build `L_d(p, q)`, sum both series at `precision + GUARD_DIGITS` digits and
/// round g₂, g₃, Δ and j to `precision` significant digits.
///
/// Raising `n_max` converges towards the true invariants but is not guaranteed
/// to change, or improve, any particular printed digit.
#[instrument(skip(p, q), fields(p = %p, q = %q))]
pub fn invariants_numeric(
    p: Decimal,
    q: Decimal,
    degree: i64,
    n_max: u32,
    precision: u32,
) -> KernelResult<InvariantSet> {
    if n_max == 0 {
        return Err(KernelError::invalid("truncation n_max must be positive"));
    }
    if precision == 0 {
        return Err(KernelError::invalid("precision must be positive"));
    }
    let working = precision + GUARD_DIGITS;
    let lattice = sublattice(p.with_precision(working), q.with_precision(working), degree)?;
    let curve = elliptic_curve(&lattice, n_max)?;
    let j = curve.j_invariant()?;

    let set = InvariantSet {
        g2: round_complex(&curve.g2, precision),
        g3: round_complex(&curve.g3, precision),
        discriminant: round_complex(&curve.discriminant, precision),
        j: round_complex(&j, precision),
        precision,
    };
    info!(g2 = %set.g2.re, g3 = %set.g3.re, j = %set.j.re, "invariants computed");
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::primary_lattice;
    use crate::numeric::{c_int, with_precision_complex};
    use approx::assert_relative_eq;
    use num_rational::BigRational;

    fn rat(n: i64) -> BigRational {
        BigRational::from_int(n)
    }

    #[test]
    fn test_square_lattice_g3_vanishes() {
        // ℤ + ℤi is invariant under z ↦ iz, which negates every z⁻⁶ term.
        let l = primary_lattice(rat(1), rat(1));
        let g3 = eisenstein_g3(&l.omega1, &l.omega2, 3).unwrap();
        assert!(g3.is_zero());
        let g2 = eisenstein_g2(&l.omega1, &l.omega2, 3).unwrap();
        assert!(g2.im.is_zero());
        assert!(g2.re > rat(0));
    }

    #[test]
    fn test_square_lattice_j_is_1728() {
        let l = primary_lattice(rat(1), rat(1));
        let curve = elliptic_curve(&l, 2).unwrap();
        assert_eq!(curve.j_invariant().unwrap(), c_int(1728, 0));
    }

    #[test]
    fn test_rectangular_lattice_invariants_are_real() {
        let l = primary_lattice(rat(2), rat(3));
        let curve = elliptic_curve(&l, 2).unwrap();
        assert!(curve.g2.im.is_zero());
        assert!(curve.g3.im.is_zero());
    }

    #[test]
    fn test_discriminant_identity_exact() {
        let g2: Complex<BigRational> = Complex::new(BigRational::from_ratio(7, 3), rat(2));
        let g3: Complex<BigRational> = Complex::new(rat(-5), BigRational::from_ratio(1, 9));
        let expected = g2.clone() * g2.clone() * g2.clone()
            - g3.clone() * g3.clone() * rat(27);
        assert_eq!(discriminant(&g2, &g3), expected);
    }

    #[test]
    fn test_j_invariant_singular_curve() {
        // g₂ = 3, g₃ = 1: 27 − 27 = 0.
        let err = j_invariant::<BigRational>(&c_int(3, 0), &c_int(1, 0)).unwrap_err();
        assert_eq!(err, KernelError::SingularCurve);
    }

    #[test]
    fn test_degenerate_lattice_reports_term() {
        let err = eisenstein_g2::<f64>(&c_int(1, 0), &c_int(2, 0), 2).unwrap_err();
        assert_eq!(err, KernelError::DegenerateLattice { m: -2, n: 1 });
    }

    #[test]
    fn test_scaling_law_exact() {
        let l = primary_lattice(rat(2), rat(3));
        let lambda: Complex<BigRational> = c_int(2, 0);
        let scaled = l.scaled(&lambda);
        let g2 = eisenstein_g2(&l.omega1, &l.omega2, 2).unwrap();
        let g2_scaled = eisenstein_g2(&scaled.omega1, &scaled.omega2, 2).unwrap();
        assert_eq!(g2_scaled * rat(16), g2);
        let g3 = eisenstein_g3(&l.omega1, &l.omega2, 2).unwrap();
        let g3_scaled = eisenstein_g3(&scaled.omega1, &scaled.omega2, 2).unwrap();
        assert_eq!(g3_scaled * rat(64), g3);
    }

    #[test]
    fn test_sublattice_wrappers_match_curve() {
        let curve = curve_for_sublattice(rat(2), rat(3), 1, 2).unwrap();
        assert_eq!(g2_for_sublattice(rat(2), rat(3), 1, 2).unwrap(), curve.g2);
        assert_eq!(g3_for_sublattice(rat(2), rat(3), 1, 2).unwrap(), curve.g3);
        // Halving the periods multiplies g₂ by 2⁴.
        let prim = curve_for_sublattice(rat(2), rat(3), 0, 2).unwrap();
        assert_eq!(prim.g2 * rat(16), curve.g2);
    }

    #[test]
    fn test_invariants_numeric_end_to_end() {
        let set = invariants_numeric(Decimal::from(2), Decimal::from(3), 0, 10, 20).unwrap();
        assert_eq!(set.precision, 20);
        assert!(set.g2.re.is_finite() && set.g3.re.is_finite());

        let wide = |z: &Complex<Decimal>| with_precision_complex(z.clone(), 60);
        let recomputed = discriminant(&wide(&set.g2), &wide(&set.g3));
        let residual = (recomputed - set.discriminant.clone()).norm_sqr().to_f64().sqrt();
        let scale = set.discriminant.norm_sqr().to_f64().sqrt();
        assert!(residual / scale < 1e-15, "relative residual {}", residual / scale);
    }

    #[test]
    fn test_invariants_numeric_matches_float_series() {
        let set = invariants_numeric(Decimal::from(2), Decimal::from(3), 1, 6, 15).unwrap();
        let l = crate::lattice::sublattice(2.0f64, 3.0, 1).unwrap();
        let g2 = eisenstein_g2(&l.omega1, &l.omega2, 6).unwrap();
        let g3 = eisenstein_g3(&l.omega1, &l.omega2, 6).unwrap();
        assert_relative_eq!(set.g2.re.to_f64(), g2.re, max_relative = 1e-12);
        assert_relative_eq!(set.g3.re.to_f64(), g3.re, max_relative = 1e-12);
    }

    #[test]
    fn test_invariants_numeric_rejects_bad_arguments() {
        assert!(invariants_numeric(Decimal::from(2), Decimal::from(3), -1, 4, 10).is_err());
        assert!(invariants_numeric(Decimal::from(2), Decimal::from(3), 0, 0, 10).is_err());
        assert!(invariants_numeric(Decimal::from(2), Decimal::from(3), 0, 4, 0).is_err());
    }

    #[test]
    fn test_f64_backend_converges() {
        let l = primary_lattice(1.0f64, 1.0);
        let coarse = eisenstein_g2(&l.omega1, &l.omega2, 20).unwrap().re;
        let fine = eisenstein_g2(&l.omega1, &l.omega2, 60).unwrap().re;
        // g₂(ℤ + ℤi) = Γ(1/4)⁸ / (256π²) ≈ 189.0727201...
        assert!((fine - 189.072_720_1).abs() < (coarse - 189.072_720_1).abs());
        assert_relative_eq!(fine, 189.072_720_1, max_relative = 1e-3);
    }
}
