//! Linear maps from `(℘, ℘′, ℘″, 1)` to 3D space.

use nalgebra::{Matrix3x4, Point3, Vector4};
use num_complex::{Complex, Complex64};
use serde::{Deserialize, Serialize};
use tracing::debug;

use pqtorus_kernel::invariants::eisenstein_g2;
use pqtorus_kernel::lattice::Lattice;
use pqtorus_kernel::numeric::{to_complex64, Scalar};
use pqtorus_kernel::{wp_and_wp_prime, wp_second_derivative};

use crate::error::{MeshError, MeshResult};

const ONE: Complex64 = Complex64::new(1.0, 0.0);
const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// ℘, ℘′ and ℘″ at the basepoint a projection was built for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasepointSample {
    pub z0: Complex64,
    pub wp: Complex64,
    pub wp_prime: Complex64,
    pub wp_second: Complex64,
    pub perturbed: bool,
}

/// A 3×4 complex matrix; the embedded point is the real part of
/// `M · (℘, ℘′, ℘″, 1)ᵀ`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionMatrix {
    matrix: Matrix3x4<Complex64>,
    basepoint: Option<BasepointSample>,
}

impl ProjectionMatrix {
    pub fn new(matrix: Matrix3x4<Complex64>) -> Self {
        Self {
            matrix,
            basepoint: None,
        }
    }

    /// Build from row vectors; anything but exactly 3 rows of 4 entries is rejected.
    pub fn from_rows(rows: &[Vec<Complex64>]) -> MeshResult<Self> {
        let cols = rows.iter().map(Vec::len).find(|&len| len != 4).unwrap_or(4);
        if rows.len() != 3 || cols != 4 {
            return Err(MeshError::ProjectionShape {
                rows: rows.len(),
                cols,
            });
        }
        let flat: Vec<Complex64> = rows.iter().flatten().copied().collect();
        Ok(Self::new(Matrix3x4::from_row_slice(&flat)))
    }

    /// x = Re ℘, y = Im ℘, z = Re ℘′.
    pub fn standard() -> Self {
        Self::new(Matrix3x4::new(
            ONE, ZERO, ZERO, ZERO, //
            -I, ZERO, ZERO, ZERO, //
            ZERO, ONE, ZERO, ZERO,
        ))
    }

    /// Rows `[2, 0, 0, 1]`, `[0, 2i, 0, 1]`, `[0, 0, 1, −1]`.
    pub fn stereographic() -> Self {
        let two = Complex64::new(2.0, 0.0);
        Self::new(Matrix3x4::new(
            two, ZERO, ZERO, ONE, //
            ZERO, two * I, ZERO, ONE, //
            ZERO, ZERO, ONE, -ONE,
        ))
    }

    pub fn with_basepoint(mut self, sample: BasepointSample) -> Self {
        self.basepoint = Some(sample);
        self
    }

    pub fn matrix(&self) -> &Matrix3x4<Complex64> {
        &self.matrix
    }

    pub fn basepoint(&self) -> Option<&BasepointSample> {
        self.basepoint.as_ref()
    }

    pub fn apply(&self, wp: Complex64, wp_prime: Complex64, wp_second: Complex64) -> Point3<f64> {
        let image = self.matrix * Vector4::new(wp, wp_prime, wp_second, ONE);
        Point3::new(image[0].re, image[1].re, image[2].re)
    }
}

impl Default for ProjectionMatrix {
    fn default() -> Self {
        Self::standard()
    }
}

/// The standard projection, annotated with ℘, ℘′, ℘″ at `z0`
/// (the quarter period `ω₁/4 + ω₂/4` when `z0` is `None`).
///
/// The sample is recorded on the result but does not change the matrix
/// coefficients, which are always those of [`ProjectionMatrix::standard`].
pub fn default_projection<S: Scalar>(
    z0: Option<&Complex<S>>,
    lattice: &Lattice<S>,
    n_max: u32,
) -> MeshResult<ProjectionMatrix> {
    let z0 = z0.cloned().unwrap_or_else(|| lattice.quarter_period());
    let values = wp_and_wp_prime(&z0, lattice, n_max, None)?;
    let g2 = eisenstein_g2(&lattice.omega1, &lattice.omega2, n_max)?;
    let wp_second = wp_second_derivative(&g2, &values.wp);

    let sample = BasepointSample {
        z0: to_complex64(&z0),
        wp: to_complex64(&values.wp),
        wp_prime: to_complex64(&values.wp_prime),
        wp_second: to_complex64(&wp_second),
        perturbed: values.perturbed,
    };
    debug!(z0 = %sample.z0, wp = %sample.wp, "default projection basepoint");
    Ok(ProjectionMatrix::standard().with_basepoint(sample))
}
