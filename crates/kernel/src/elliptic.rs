//! Weierstrass ℘ and its derivatives.
//!
//! Two evaluation paths are provided:
//! - the truncated lattice sum, given a [`Lattice`];
//! - the Laurent expansion about the origin, given only `g₂` and `g₃`. This
//!   path is valid for `|z|` below the smallest non-zero period and feeds the
//!   addition and duplication formulas.
//!
//! A requested precision is applied by rounding every returned value after
//! summation; it does not change how the sums are carried out.

use num_complex::Complex;
use num_traits::{One, Zero};
use tracing::instrument;

use crate::config::SeriesConfig;
use crate::error::{KernelError, KernelResult};
use crate::lattice::{primary_lattice, sublattice, Lattice};
use crate::numeric::{checked_div, checked_inv, round_opt, Scalar};

/// ℘ and ℘′ at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct WpValues<S> {
    pub wp: Complex<S>,
    pub wp_prime: Complex<S>,
    /// The point was shifted off a lattice point before summation.
    pub perturbed: bool,
}

impl<S: Scalar> WpValues<S> {
    fn rounded(self, precision: Option<u32>) -> Self {
        Self {
            wp: round_opt(self.wp, precision),
            wp_prime: round_opt(self.wp_prime, precision),
            perturbed: self.perturbed,
        }
    }
}

/// ℘(z) and ℘′(z) from the truncated lattice sums
///
/// ℘(z) = 1/z² + Σ' [1/(z − ω)² − 1/ω²],  ℘′(z) = −2/z³ + Σ' −2/(z − ω)³,
///
/// accumulated in a single pass over the window.
#[instrument(level = "trace", skip_all, fields(n_max = config.n_max))]
pub fn wp_and_wp_prime_with<S: Scalar>(
    z: &Complex<S>,
    lattice: &Lattice<S>,
    config: &SeriesConfig,
) -> KernelResult<WpValues<S>> {
    config.validate()?;
    let (z, perturbed) = config.singularity.resolve(z, lattice, config.n_max);
    let minus_two = S::from_int(-2);

    let inv_z = checked_inv(&z, "wp principal part")?;
    let inv_z2 = inv_z.clone() * inv_z.clone();
    let mut wp = inv_z2.clone();
    let mut wp_prime = inv_z2 * inv_z * minus_two.clone();

    let n = config.n_max as i64;
    for m in -n..=n {
        for k in -n..=n {
            if m == 0 && k == 0 {
                continue;
            }
            let omega = lattice.point(m, k);
            let inv_omega = checked_inv(&omega, "lattice point")
                .map_err(|_| KernelError::DegenerateLattice { m, n: k })?;
            let inv_d = checked_inv(&(z.clone() - omega), "wp lattice term")?;
            let inv_d2 = inv_d.clone() * inv_d.clone();
            wp = wp + inv_d2.clone() - inv_omega.clone() * inv_omega;
            wp_prime = wp_prime + inv_d2 * inv_d * minus_two.clone();
        }
    }

    Ok(WpValues {
        wp,
        wp_prime,
        perturbed,
    }
    .rounded(config.precision))
}

/// ℘(z) and ℘′(z) with the default singularity policy.
pub fn wp_and_wp_prime<S: Scalar>(
    z: &Complex<S>,
    lattice: &Lattice<S>,
    n_max: u32,
    precision: Option<u32>,
) -> KernelResult<WpValues<S>> {
    wp_and_wp_prime_with(z, lattice, &SeriesConfig::new(n_max, precision))
}

/// ℘(z) from the truncated lattice sum.
pub fn wp<S: Scalar>(
    z: &Complex<S>,
    lattice: &Lattice<S>,
    n_max: u32,
    precision: Option<u32>,
) -> KernelResult<Complex<S>> {
    Ok(wp_and_wp_prime(z, lattice, n_max, precision)?.wp)
}

/// ℘′(z) from the truncated lattice sum.
pub fn wp_prime<S: Scalar>(
    z: &Complex<S>,
    lattice: &Lattice<S>,
    n_max: u32,
    precision: Option<u32>,
) -> KernelResult<Complex<S>> {
    Ok(wp_and_wp_prime(z, lattice, n_max, precision)?.wp_prime)
}

/// ℘″ = 6℘² − g₂/2.
pub fn wp_second_derivative<S: Scalar>(g2: &Complex<S>, wp_z: &Complex<S>) -> Complex<S> {
    wp_z.clone() * wp_z.clone() * S::from_int(6) - g2.clone() * S::from_ratio(1, 2)
}

/// ℘ and ℘′ on the primary lattice `ℤp + ℤ(q·i)`.
pub fn wp_on_primary<S: Scalar>(
    p: S,
    q: S,
    z: &Complex<S>,
    n_max: u32,
    precision: Option<u32>,
) -> KernelResult<WpValues<S>> {
    wp_and_wp_prime(z, &primary_lattice(p, q), n_max, precision)
}

/// ℘ and ℘′ on the sublattice `L_d(p, q)`.
pub fn wp_on_sublattice<S: Scalar>(
    p: S,
    q: S,
    degree: i64,
    z: &Complex<S>,
    n_max: u32,
    precision: Option<u32>,
) -> KernelResult<WpValues<S>> {
    wp_and_wp_prime(z, &sublattice(p, q, degree)?, n_max, precision)
}

/// Laurent coefficients `c₂ … c_{terms+1}` of ℘(z) − 1/z² = Σ c_k z^(2k−2).
///
/// c₂ = g₂/20, c₃ = g₃/28, c_k = 3/((2k+1)(k−3)) Σ_{m=2}^{k−2} c_m c_{k−m}.
/// Index `i` of the result holds `c_{i+2}`.
pub fn laurent_coefficients<S: Scalar>(
    g2: &Complex<S>,
    g3: &Complex<S>,
    terms: usize,
) -> Vec<Complex<S>> {
    let mut c: Vec<Complex<S>> = Vec::with_capacity(terms);
    for k in 2..terms + 2 {
        let ck = match k {
            2 => g2.clone() * S::from_ratio(1, 20),
            3 => g3.clone() * S::from_ratio(1, 28),
            _ => {
                let mut acc = Complex::<S>::zero();
                for m in 2..=k - 2 {
                    acc = acc + c[m - 2].clone() * c[k - m - 2].clone();
                }
                let k = k as i64;
                acc * S::from_ratio(3, (2 * k + 1) * (k - 3))
            }
        };
        c.push(ck);
    }
    c
}

/// ℘(z), ℘′(z) from the Laurent expansion with `terms` coefficients.
pub fn wp_from_invariants<S: Scalar>(
    z: &Complex<S>,
    g2: &Complex<S>,
    g3: &Complex<S>,
    terms: usize,
    precision: Option<u32>,
) -> KernelResult<WpValues<S>> {
    let inv_z = checked_inv(z, "Laurent principal part")?;
    let z2 = z.clone() * z.clone();
    let inv_z2 = inv_z.clone() * inv_z.clone();

    let mut wp = inv_z2.clone();
    let mut wp_prime = inv_z2 * inv_z.clone() * S::from_int(-2);
    let mut z_pow = Complex::<S>::one();
    for (i, ck) in laurent_coefficients(g2, g3, terms).into_iter().enumerate() {
        let k = i as i64 + 2;
        // z_pow = z^(2k-2)
        z_pow = z_pow * z2.clone();
        wp = wp + ck.clone() * z_pow.clone();
        wp_prime = wp_prime + ck * z_pow.clone() * inv_z.clone() * S::from_int(2 * k - 2);
    }

    Ok(WpValues {
        wp,
        wp_prime,
        perturbed: false,
    }
    .rounded(precision))
}

/// ℘(z₁ + z₂) = (℘′(z₁) − ℘′(z₂))² / (4(℘(z₁) − ℘(z₂))²) − ℘(z₁) − ℘(z₂).
///
/// Fails with a division error when ℘(z₁) = ℘(z₂).
pub fn add_wp_values<S: Scalar>(a: &WpValues<S>, b: &WpValues<S>) -> KernelResult<Complex<S>> {
    let slope = a.wp_prime.clone() - b.wp_prime.clone();
    let diff = a.wp.clone() - b.wp.clone();
    let denom = diff.clone() * diff * S::from_int(4);
    let quotient = checked_div(&(slope.clone() * slope), &denom, "wp addition formula")?;
    Ok(quotient - a.wp.clone() - b.wp.clone())
}

/// ℘(2z) = ℘″(z)² / (4℘′(z)²) − 2℘(z).
///
/// Fails with a division error when ℘′(z) = 0 (z a half period).
pub fn duplicate_wp_value<S: Scalar>(v: &WpValues<S>, g2: &Complex<S>) -> KernelResult<Complex<S>> {
    let second = wp_second_derivative(g2, &v.wp);
    let denom = v.wp_prime.clone() * v.wp_prime.clone() * S::from_int(4);
    let quotient = checked_div(&(second.clone() * second), &denom, "wp duplication formula")?;
    Ok(quotient - v.wp.clone() * S::from_int(2))
}

/// ℘(z₁ + z₂) for the curve with invariants `g₂`, `g₃`.
pub fn wp_addition<S: Scalar>(
    z1: &Complex<S>,
    z2: &Complex<S>,
    g2: &Complex<S>,
    g3: &Complex<S>,
    terms: usize,
    precision: Option<u32>,
) -> KernelResult<Complex<S>> {
    let a = wp_from_invariants(z1, g2, g3, terms, precision)?;
    let b = wp_from_invariants(z2, g2, g3, terms, precision)?;
    Ok(round_opt(add_wp_values(&a, &b)?, precision))
}

/// ℘(2z) for the curve with invariants `g₂`, `g₃`.
pub fn wp_duplication<S: Scalar>(
    z: &Complex<S>,
    g2: &Complex<S>,
    g3: &Complex<S>,
    terms: usize,
    precision: Option<u32>,
) -> KernelResult<Complex<S>> {
    let v = wp_from_invariants(z, g2, g3, terms, precision)?;
    Ok(round_opt(duplicate_wp_value(&v, g2)?, precision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SingularityPolicy;
    use crate::invariants::{eisenstein_g2, eisenstein_g3};
    use crate::numeric::{c_int, Decimal};
    use approx::assert_relative_eq;
    use num_complex::Complex64;
    use num_rational::BigRational;

    fn close(a: Complex64, b: Complex64, tol: f64) -> bool {
        (a - b).norm() <= tol * b.norm().max(1.0)
    }

    fn rect_lattice() -> Lattice<f64> {
        primary_lattice(2.0, 3.0)
    }

    fn rect_invariants(n_max: u32) -> (Complex64, Complex64) {
        let l = rect_lattice();
        (
            eisenstein_g2(&l.omega1, &l.omega2, n_max).unwrap(),
            eisenstein_g3(&l.omega1, &l.omega2, n_max).unwrap(),
        )
    }

    #[test]
    fn test_wp_is_even_and_wp_prime_is_odd() {
        let l = rect_lattice();
        let z = Complex64::new(0.3, 0.7);
        let a = wp_and_wp_prime(&z, &l, 10, None).unwrap();
        let b = wp_and_wp_prime(&-z, &l, 10, None).unwrap();
        assert!(close(a.wp, b.wp, 1e-12));
        assert!(close(a.wp_prime, -b.wp_prime, 1e-12));
    }

    #[test]
    fn test_wp_real_on_real_axis_of_rectangular_lattice() {
        let l = rect_lattice();
        let v = wp_and_wp_prime(&Complex64::new(0.5, 0.0), &l, 10, None).unwrap();
        assert!(v.wp.im.abs() < 1e-12);
        assert!(!v.perturbed);
    }

    #[test]
    fn test_wp_is_nearly_periodic() {
        let l = rect_lattice();
        let z = Complex64::new(0.4, 0.9);
        let a = wp(&z, &l, 60, None).unwrap();
        let b = wp(&(z + l.omega1), &l, 60, None).unwrap();
        assert!(close(a, b, 5e-2), "{a} vs {b}");
    }

    #[test]
    fn test_pole_perturbation_is_visible() {
        let l = primary_lattice(BigRational::from_int(2), BigRational::from_int(3));
        let offset = SingularityPolicy::default().offset::<BigRational>();
        let shifted: Complex<BigRational> = Complex::new(offset, BigRational::zero());

        let at_origin = wp_and_wp_prime(&c_int(0, 0), &l, 2, None).unwrap();
        let near_origin = wp_and_wp_prime(&shifted, &l, 2, None).unwrap();
        assert!(at_origin.perturbed);
        assert!(!near_origin.perturbed);
        assert_eq!(at_origin.wp, near_origin.wp);
        assert_eq!(at_origin.wp_prime, near_origin.wp_prime);

        // On a non-zero lattice point the same shift applies.
        let period: Complex<BigRational> = c_int(2, 0);
        let at_period = wp_and_wp_prime(&period, &l, 2, None).unwrap();
        let beside_period = wp_and_wp_prime(&(period + shifted), &l, 2, None).unwrap();
        assert!(at_period.perturbed);
        assert_eq!(at_period.wp, beside_period.wp);
    }

    #[test]
    fn test_invalid_singularity_offset_is_rejected() {
        let mut config = SeriesConfig::new(3, None);
        config.singularity.offset_denom = 0;

        let l = primary_lattice(Decimal::from(2), Decimal::from(3));
        let err = wp_and_wp_prime_with(&c_int(0, 0), &l, &config).unwrap_err();
        assert!(matches!(err, KernelError::InvalidArgument(_)));

        let l = primary_lattice(BigRational::from_int(2), BigRational::from_int(3));
        assert!(wp_and_wp_prime_with(&c_int(0, 0), &l, &config).is_err());

        let err = wp_and_wp_prime_with(&Complex64::new(0.0, 0.0), &rect_lattice(), &config).unwrap_err();
        assert!(matches!(err, KernelError::InvalidArgument(_)));
    }

    #[test]
    fn test_perturbed_value_is_large_but_finite() {
        let v = wp_and_wp_prime(&Complex64::new(0.0, 0.0), &rect_lattice(), 8, None).unwrap();
        // ℘ ≈ 1/offset² near the pole.
        assert_relative_eq!(v.wp.re, 1e8, max_relative = 1e-6);
        assert!(v.wp.re.is_finite() && v.wp_prime.re.is_finite());
    }

    #[test]
    fn test_second_derivative_identity() {
        let g2: Complex<BigRational> = Complex::new(BigRational::from_ratio(5, 3), BigRational::from_int(1));
        let wp_z: Complex<BigRational> = Complex::new(BigRational::from_int(-2), BigRational::from_ratio(1, 7));
        let expected = wp_z.clone() * wp_z.clone() * BigRational::from_int(6)
            - g2.clone() / Complex::new(BigRational::from_int(2), BigRational::zero());
        assert_eq!(wp_second_derivative(&g2, &wp_z), expected);
    }

    #[test]
    fn test_precision_rounds_results() {
        let l = sublattice(Decimal::from(2), Decimal::from(3), 1).unwrap();
        let z = l.quarter_period();
        let v = wp_and_wp_prime(&z, &l, 3, Some(12)).unwrap();
        for part in [&v.wp.re, &v.wp.im, &v.wp_prime.re, &v.wp_prime.im] {
            assert!(part.mantissa().to_string().trim_start_matches('-').len() <= 12);
        }
        let unrounded = wp_and_wp_prime(&z, &l, 3, None).unwrap();
        assert_relative_eq!(v.wp.re.to_f64(), unrounded.wp.re.to_f64(), max_relative = 1e-11);
    }

    #[test]
    fn test_laurent_matches_lattice_sum() {
        let (g2, g3) = rect_invariants(40);
        let z = Complex64::new(0.3, 0.2);
        let series = wp_and_wp_prime(&z, &rect_lattice(), 40, None).unwrap();
        let laurent = wp_from_invariants(&z, &g2, &g3, 12, None).unwrap();
        assert!(close(laurent.wp, series.wp, 1e-4), "{} vs {}", laurent.wp, series.wp);
        assert!(close(laurent.wp_prime, series.wp_prime, 1e-4));
    }

    #[test]
    fn test_laurent_first_coefficients() {
        let g2: Complex<BigRational> = c_int(20, 0);
        let g3: Complex<BigRational> = c_int(28, 0);
        let c = laurent_coefficients(&g2, &g3, 4);
        assert_eq!(c[0], c_int(1, 0));
        assert_eq!(c[1], c_int(1, 0));
        // c₄ = c₂²/3, c₅ = 3c₂c₃/11
        assert_eq!(c[2], Complex::new(BigRational::from_ratio(1, 3), BigRational::zero()));
        assert_eq!(c[3], Complex::new(BigRational::from_ratio(3, 11), BigRational::zero()));
    }

    #[test]
    fn test_laurent_satisfies_differential_equation() {
        let (g2, g3) = rect_invariants(20);
        let z = Complex64::new(0.25, -0.1);
        let v = wp_from_invariants(&z, &g2, &g3, 20, None).unwrap();
        let lhs = v.wp_prime * v.wp_prime;
        let rhs = v.wp * v.wp * v.wp * 4.0 - g2 * v.wp - g3;
        assert!(close(lhs, rhs, 1e-9), "{lhs} vs {rhs}");
    }

    #[test]
    fn test_addition_formula_matches_direct_evaluation() {
        let (g2, g3) = rect_invariants(20);
        let z1 = Complex64::new(0.2, 0.1);
        let z2 = Complex64::new(0.15, -0.25);
        let sum = wp_addition(&z1, &z2, &g2, &g3, 20, None).unwrap();
        let direct = wp_from_invariants(&(z1 + z2), &g2, &g3, 20, None).unwrap();
        assert!(close(sum, direct.wp, 1e-8), "{sum} vs {}", direct.wp);
    }

    #[test]
    fn test_addition_squares_the_wp_difference() {
        let a = WpValues::<BigRational> {
            wp: c_int(3, 0),
            wp_prime: c_int(5, 0),
            perturbed: false,
        };
        let b = WpValues::<BigRational> {
            wp: c_int(1, 0),
            wp_prime: c_int(1, 0),
            perturbed: false,
        };
        // 4² / (4·2²) − 3 − 1
        assert_eq!(add_wp_values(&a, &b).unwrap(), c_int(-3, 0));
    }

    #[test]
    fn test_duplication_formula_matches_direct_evaluation() {
        let (g2, g3) = rect_invariants(20);
        let z = Complex64::new(0.2, 0.15);
        let doubled = wp_duplication(&z, &g2, &g3, 20, None).unwrap();
        let direct = wp_from_invariants(&(z * 2.0), &g2, &g3, 20, None).unwrap();
        assert!(close(doubled, direct.wp, 1e-8), "{doubled} vs {}", direct.wp);
    }

    #[test]
    fn test_addition_fails_on_equal_wp() {
        let g2: Complex<BigRational> = c_int(3, 0);
        let g3: Complex<BigRational> = c_int(2, 0);
        let z: Complex<BigRational> = Complex::new(BigRational::from_ratio(1, 5), BigRational::zero());
        let err = wp_addition(&z, &z, &g2, &g3, 4, None).unwrap_err();
        assert!(matches!(err, KernelError::DivisionByZero { .. }));
    }

    #[test]
    fn test_duplication_fails_on_zero_derivative() {
        let v = WpValues::<BigRational> {
            wp: c_int(1, 0),
            wp_prime: c_int(0, 0),
            perturbed: false,
        };
        let err = duplicate_wp_value(&v, &c_int(4, 0)).unwrap_err();
        assert!(matches!(err, KernelError::DivisionByZero { .. }));
    }

    #[test]
    fn test_sublattice_shorthand_matches_explicit_lattice() {
        let z = Complex64::new(0.3, 0.2);
        let short = wp_on_sublattice(2.0, 3.0, 1, &z, 6, None).unwrap();
        let l = sublattice(2.0, 3.0, 1).unwrap();
        let long = wp_and_wp_prime(&z, &l, 6, None).unwrap();
        assert_eq!(short, long);
        let prim = wp_on_primary(2.0, 3.0, &z, 6, None).unwrap();
        assert_eq!(prim, wp_and_wp_prime(&z, &rect_lattice(), 6, None).unwrap());
    }
}
