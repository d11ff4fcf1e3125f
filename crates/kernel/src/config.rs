//! Configuration for the truncated lattice-sum evaluators.

use num_complex::Complex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KernelError, KernelResult};
use crate::lattice::Lattice;
use crate::numeric::Scalar;

/// How evaluation points that land on (or next to) a pole are handled.
///
/// A point within `tolerance` of the origin or of any lattice point in the
/// truncated window is shifted once along the real axis by
/// `offset_numer / offset_denom` before summation. The returned value is then
/// ℘ at the shifted point, not at the pole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SingularityPolicy {
    /// Distance below which a point counts as sitting on a lattice point.
    pub tolerance: f64,
    pub offset_numer: i64,
    pub offset_denom: i64,
}

impl Default for SingularityPolicy {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            offset_numer: 1,
            offset_denom: 10_000,
        }
    }
}

impl SingularityPolicy {
    pub fn validate(&self) -> KernelResult<()> {
        if self.offset_denom <= 0 {
            return Err(KernelError::invalid(format!(
                "singularity offset denominator must be positive, got {}",
                self.offset_denom
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(KernelError::invalid(format!(
                "singularity tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// The real shift, exact in rational and decimal backends.
    pub fn offset<S: Scalar>(&self) -> S {
        S::from_ratio(self.offset_numer, self.offset_denom)
    }

    fn near<S: Scalar>(&self, a: &Complex<S>, b: &Complex<S>) -> bool {
        let d = a.clone() - b.clone();
        d.norm_sqr().as_f64() < self.tolerance * self.tolerance
    }

    /// Return the point actually summed at and whether it was shifted.
    pub fn resolve<S: Scalar>(
        &self,
        z: &Complex<S>,
        lattice: &Lattice<S>,
        n_max: u32,
    ) -> (Complex<S>, bool) {
        let n = n_max as i64;
        let on_pole = (-n..=n)
            .flat_map(|m| (-n..=n).map(move |k| (m, k)))
            .any(|(m, k)| self.near(z, &lattice.point(m, k)));
        if on_pole {
            debug!(offset = self.offset::<f64>(), "evaluation point on a lattice point, shifting");
            (z.clone() + Complex::new(self.offset::<S>(), S::zero()), true)
        } else {
            (z.clone(), false)
        }
    }
}

/// Truncation and rounding parameters shared by the series evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    /// Lattice window half-width: terms with `|m|, |n| ≤ n_max` are summed.
    pub n_max: u32,
    /// Significant digits to round results to, if any.
    pub precision: Option<u32>,
    pub singularity: SingularityPolicy,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            n_max: 20,
            precision: None,
            singularity: SingularityPolicy::default(),
        }
    }
}

impl SeriesConfig {
    pub fn new(n_max: u32, precision: Option<u32>) -> Self {
        Self {
            n_max,
            precision,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> KernelResult<()> {
        self.singularity.validate()
    }

    /// Small window for per-vertex evaluation in interactive meshing.
    pub fn interactive() -> Self {
        Self::new(5, None)
    }

    /// Wide window, rounded to 30 digits.
    pub fn reference() -> Self {
        Self::new(40, Some(30))
    }
}
