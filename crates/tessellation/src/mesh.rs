//! Torus meshes sampled from ℘ on a fundamental parallelogram.

use std::fmt;

use nalgebra::Point3;
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use pqtorus_kernel::config::SeriesConfig;
use pqtorus_kernel::invariants::{eisenstein_g2, elliptic_curve, EllipticCurve, GUARD_DIGITS};
use pqtorus_kernel::lattice::{sublattice, Lattice};
use pqtorus_kernel::numeric::{
    complex_sig_string, is_finite_complex, round_opt, to_complex64, Decimal, Scalar,
};
use pqtorus_kernel::{wp_and_wp_prime_with, wp_second_derivative, KernelError};

use crate::config::{classical_torus_point, MeshConfig};
use crate::error::{MeshError, MeshResult};
use crate::projection::{default_projection, ProjectionMatrix};

/// Why a cell was replaced by its classical-torus point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// ℘, ℘′, ℘″ or the projected point was infinite or NaN.
    NonFinite,
    /// The series evaluation itself failed.
    Evaluation(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite => write!(f, "non-finite value"),
            Self::Evaluation(msg) => write!(f, "evaluation failed: {msg}"),
        }
    }
}

/// How a vertex was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellOutcome {
    Exact,
    Fallback { reason: FallbackReason },
}

impl CellOutcome {
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact)
    }
}

/// Request echo and curve data attached to every mesh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshMetadata {
    pub p: u64,
    pub q: u64,
    pub degree: i64,
    pub mesh_density: usize,
    /// ω₁ and ω₂ of `L_d(p, q)`.
    pub lattice_periods: [String; 2],
    pub g2: String,
    pub g3: String,
    /// `"undefined"` when the discriminant vanishes.
    pub j_invariant: String,
    pub n_max: u32,
    pub precision: Option<u32>,
    /// Indices of vertices that came from the classical-torus fallback.
    pub fallback_vertices: Vec<usize>,
}

/// A doubly periodic quad mesh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TorusMesh {
    pub vertices: Vec<[f64; 3]>,
    pub facets: Vec<[usize; 4]>,
    pub metadata: MeshMetadata,
    /// One entry per vertex, in vertex order.
    #[serde(skip)]
    pub outcomes: Vec<CellOutcome>,
}

impl TorusMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    pub fn fallback_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_exact()).count()
    }

    pub fn to_json(&self) -> MeshResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> MeshResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Quads `[current, next_i, next_both, next_j]` over an `n × n` grid with
/// vertex `(i, j)` at index `i·n + j`; both directions wrap modulo `n`.
pub fn torus_facets(n: usize) -> Vec<[usize; 4]> {
    let mut facets = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let i1 = (i + 1) % n;
            let j1 = (j + 1) % n;
            facets.push([i * n + j, i1 * n + j, i1 * n + j1, i * n + j1]);
        }
    }
    facets
}

/// Project one point, or say why it cannot be.
pub(crate) fn evaluate_point<S: Scalar>(
    z: &Complex<S>,
    lattice: &Lattice<S>,
    g2: &Complex<S>,
    series: &SeriesConfig,
    projection: &ProjectionMatrix,
) -> Result<Point3<f64>, FallbackReason> {
    let values = wp_and_wp_prime_with(z, lattice, series)
        .map_err(|e| FallbackReason::Evaluation(e.to_string()))?;
    let wp_second = round_opt(wp_second_derivative(g2, &values.wp), series.precision);

    let inputs = [
        to_complex64(&values.wp),
        to_complex64(&values.wp_prime),
        to_complex64(&wp_second),
    ];
    if !inputs.iter().all(|w| w.re.is_finite() && w.im.is_finite()) {
        return Err(FallbackReason::NonFinite);
    }
    let point = projection.apply(inputs[0], inputs[1], inputs[2]);
    if !point.coords.iter().all(|c| c.is_finite()) {
        return Err(FallbackReason::NonFinite);
    }
    Ok(point)
}

/// Embed one point: ℘, ℘′ and ℘″ at `z`, mapped through `projection`.
///
/// g₂ for ℘″ is summed over the same window. The result is not clamped, and a
/// point that cannot be evaluated is an error rather than a fallback.
pub fn embed_torus_point<S: Scalar>(
    z: &Complex<S>,
    projection: &ProjectionMatrix,
    lattice: &Lattice<S>,
    n_max: u32,
    precision: Option<u32>,
) -> MeshResult<Point3<f64>> {
    let g2 = round_opt(eisenstein_g2(&lattice.omega1, &lattice.omega2, n_max)?, precision);
    let series = SeriesConfig::new(n_max, precision);
    evaluate_point(z, lattice, &g2, &series, projection).map_err(MeshError::PointNotEmbeddable)
}

/// Decimal strings for the metadata block.
#[derive(Debug, Clone, PartialEq)]
struct CurveReport {
    g2: String,
    g3: String,
    j: String,
}

impl CurveReport {
    fn undefined() -> Self {
        let undefined = || "undefined".to_string();
        Self {
            g2: undefined(),
            g3: undefined(),
            j: undefined(),
        }
    }
}

/// Curve strings at `digits` significant digits, or `None` if a value overflowed.
fn report_curve<S: Scalar>(
    curve: &EllipticCurve<S>,
    digits: u32,
) -> MeshResult<Option<CurveReport>> {
    if !is_finite_complex(&curve.g2) || !is_finite_complex(&curve.g3) {
        return Ok(None);
    }
    let j = match curve.j_invariant() {
        Ok(j) if !is_finite_complex(&j) => return Ok(None),
        Ok(j) => complex_sig_string(&j, digits),
        Err(KernelError::SingularCurve) => "undefined".to_string(),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(CurveReport {
        g2: complex_sig_string(&curve.g2, digits),
        g3: complex_sig_string(&curve.g3, digits),
        j,
    }))
}

/// Recompute the report with the decimal backend after an `f64` overflow.
fn decimal_report(p: i64, q: i64, degree: i64, config: &MeshConfig) -> MeshResult<CurveReport> {
    let working = config.report_digits + GUARD_DIGITS;
    let lattice = sublattice(
        Decimal::from(p).with_precision(working),
        Decimal::from(q).with_precision(working),
        degree,
    )?;
    let curve = elliptic_curve(&lattice, config.n_max)?;
    Ok(report_curve(&curve, config.report_digits)?.unwrap_or_else(CurveReport::undefined))
}

struct Sampled {
    vertices: Vec<[f64; 3]>,
    outcomes: Vec<CellOutcome>,
    periods: [String; 2],
    report: Option<CurveReport>,
}

/// Sample `u·ω₁ + v·ω₂` for `u, v ∈ {0, 1/n, …, (n−1)/n}` in row-major `(i, j)` order.
fn sample_grid<S: Scalar>(
    lattice: &Lattice<S>,
    config: &MeshConfig,
    projection: Option<&ProjectionMatrix>,
) -> MeshResult<Sampled> {
    let n = config.mesh_density;
    let curve = elliptic_curve(lattice, config.n_max)?;
    let report = report_curve(&curve, config.report_digits)?;
    let periods = [
        complex_sig_string(&lattice.omega1, config.report_digits),
        complex_sig_string(&lattice.omega2, config.report_digits),
    ];

    let projection = match projection {
        Some(p) => p.clone(),
        None => default_projection(None, lattice, config.n_max)?,
    };
    let series = SeriesConfig::new(config.n_max, config.precision);
    let g2 = round_opt(curve.g2, config.precision);

    // Grid fractions like 1/3 would otherwise pick up the default decimal precision.
    let working = config.precision.map(|digits| digits + GUARD_DIGITS);
    let fraction = |k: usize| {
        let x = S::from_ratio(k as i64, n as i64);
        match working {
            Some(digits) => x.with_precision(digits),
            None => x,
        }
    };

    let mut vertices = Vec::with_capacity(n * n);
    let mut outcomes = Vec::with_capacity(n * n);
    for i in 0..n {
        let u = fraction(i);
        for j in 0..n {
            let v = fraction(j);
            let z = lattice.omega1.clone() * u.clone() + lattice.omega2.clone() * v;
            match evaluate_point(&z, lattice, &g2, &series, &projection) {
                Ok(point) => {
                    vertices.push(config.bounds.clamp(&point));
                    outcomes.push(CellOutcome::Exact);
                }
                Err(reason) => {
                    warn!(i, j, %reason, "cell replaced by classical torus point");
                    let point = classical_torus_point(i, j, n, &config.fallback);
                    vertices.push(config.bounds.clamp(&point));
                    outcomes.push(CellOutcome::Fallback { reason });
                }
            }
        }
    }

    Ok(Sampled {
        vertices,
        outcomes,
        periods,
        report,
    })
}

fn seed_to_i64(name: &str, seed: u64) -> MeshResult<i64> {
    if seed == 0 {
        return Err(MeshError::invalid(format!("{name} must be positive")));
    }
    i64::try_from(seed).map_err(|_| MeshError::invalid(format!("{name} = {seed} is out of range")))
}

/// Mesh the torus `ℂ / L_d(p, q)`.
///
/// Every grid cell yields a vertex: cells whose evaluation fails or is not
/// finite get the classical torus point instead, and are listed in
/// `metadata.fallback_vertices`. The call itself only fails on invalid
/// arguments or a degenerate lattice.
#[instrument(skip(config, projection), fields(density = config.mesh_density, n_max = config.n_max))]
pub fn generate_mesh(
    p: u64,
    q: u64,
    degree: i64,
    config: &MeshConfig,
    projection: Option<&ProjectionMatrix>,
) -> MeshResult<TorusMesh> {
    config.validate()?;
    let (p_int, q_int) = (seed_to_i64("p", p)?, seed_to_i64("q", q)?);

    let sampled = match config.precision {
        Some(digits) => {
            let working = digits + GUARD_DIGITS;
            let lattice = sublattice(
                Decimal::from(p_int).with_precision(working),
                Decimal::from(q_int).with_precision(working),
                degree,
            )?;
            sample_grid(&lattice, config, projection)?
        }
        None => {
            let lattice = sublattice(p_int as f64, q_int as f64, degree)?;
            let mut sampled = sample_grid(&lattice, config, projection)?;
            if sampled.report.is_none() {
                warn!("f64 invariants overflowed, recomputing them in decimal");
                sampled.report = Some(decimal_report(p_int, q_int, degree, config)?);
            }
            sampled
        }
    };
    let report = sampled.report.unwrap_or_else(CurveReport::undefined);

    let fallback_vertices: Vec<usize> = sampled
        .outcomes
        .iter()
        .enumerate()
        .filter(|(_, o)| !o.is_exact())
        .map(|(idx, _)| idx)
        .collect();

    let mesh = TorusMesh {
        vertices: sampled.vertices,
        facets: torus_facets(config.mesh_density),
        metadata: MeshMetadata {
            p,
            q,
            degree,
            mesh_density: config.mesh_density,
            lattice_periods: sampled.periods,
            g2: report.g2,
            g3: report.g3,
            j_invariant: report.j,
            n_max: config.n_max,
            precision: config.precision,
            fallback_vertices,
        },
        outcomes: sampled.outcomes,
    };

    info!(
        vertices = mesh.vertex_count(),
        facets = mesh.facet_count(),
        fallbacks = mesh.metadata.fallback_vertices.len(),
        "mesh generated"
    );
    Ok(mesh)
}
