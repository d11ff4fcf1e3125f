//! Mesh parameters with their defaults and presets.

use std::f64::consts::TAU;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};

/// Symmetric per-axis clamp box applied to every projected vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClampBounds {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for ClampBounds {
    fn default() -> Self {
        Self {
            x: 20.0,
            y: 20.0,
            z: 10.0,
        }
    }
}

impl ClampBounds {
    pub fn clamp(&self, p: &Point3<f64>) -> [f64; 3] {
        [
            p.x.clamp(-self.x, self.x),
            p.y.clamp(-self.y, self.y),
            p.z.clamp(-self.z, self.z),
        ]
    }

    pub fn contains(&self, v: &[f64; 3]) -> bool {
        v[0].abs() <= self.x && v[1].abs() <= self.y && v[2].abs() <= self.z
    }
}

/// Radii of the classical torus used for degraded cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackTorus {
    pub major_radius: f64,
    pub minor_radius: f64,
}

impl Default for FallbackTorus {
    fn default() -> Self {
        Self {
            major_radius: 2.0,
            minor_radius: 0.5,
        }
    }
}

/// Grid cell `(i, j)` of an `n × n` sampling of the torus
/// `((R + r cos v) cos u, (R + r cos v) sin u, r sin v)`, `u = 2πi/n`, `v = 2πj/n`.
pub fn classical_torus_point(i: usize, j: usize, n: usize, torus: &FallbackTorus) -> Point3<f64> {
    let n = n.max(1) as f64;
    let u = TAU * i as f64 / n;
    let v = TAU * j as f64 / n;
    let ring = torus.major_radius + torus.minor_radius * v.cos();
    Point3::new(ring * u.cos(), ring * u.sin(), torus.minor_radius * v.sin())
}

/// Parameters for [`crate::generate_mesh`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Grid resolution per direction; the mesh has `mesh_density²` vertices.
    pub mesh_density: usize,
    /// Series truncation radius for every ℘ evaluation.
    pub n_max: u32,
    /// Significant digits. `Some` evaluates with the decimal backend,
    /// `None` with `f64`.
    pub precision: Option<u32>,
    pub bounds: ClampBounds,
    pub fallback: FallbackTorus,
    /// Digits used for the g₂, g₃, j strings in the metadata.
    pub report_digits: u32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            mesh_density: 20,
            n_max: 8,
            precision: None,
            bounds: ClampBounds::default(),
            fallback: FallbackTorus::default(),
            report_digits: 8,
        }
    }
}

impl MeshConfig {
    pub fn new(mesh_density: usize, n_max: u32, precision: Option<u32>) -> Self {
        Self {
            mesh_density,
            n_max,
            precision,
            ..Self::default()
        }
    }

    /// Coarse grid and short series for interactive previews.
    pub fn preview() -> Self {
        Self::new(10, 5, None)
    }

    /// Dense grid evaluated at 30 digits.
    pub fn reference() -> Self {
        Self::new(40, 20, Some(30))
    }

    pub fn validate(&self) -> MeshResult<()> {
        if self.mesh_density == 0 {
            return Err(MeshError::invalid("mesh_density must be positive"));
        }
        if self.n_max == 0 {
            return Err(MeshError::invalid("n_max must be positive"));
        }
        if self.precision == Some(0) {
            return Err(MeshError::invalid("precision must be positive when given"));
        }
        if self.report_digits == 0 {
            return Err(MeshError::invalid("report_digits must be positive"));
        }
        let b = &self.bounds;
        if !(b.x > 0.0 && b.y > 0.0 && b.z > 0.0) {
            return Err(MeshError::invalid(format!(
                "clamp bounds must be positive, got ({}, {}, {})",
                b.x, b.y, b.z
            )));
        }
        Ok(())
    }
}
