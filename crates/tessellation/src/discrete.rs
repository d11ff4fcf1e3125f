//! Projection of the discrete grid `m/p^d + i·n/q^d`.

use num_complex::Complex;
use num_rational::BigRational;
use serde::Serialize;
use tracing::{debug, instrument};

use pqtorus_kernel::config::SeriesConfig;
use pqtorus_kernel::invariants::{eisenstein_g2, GUARD_DIGITS};
use pqtorus_kernel::lattice::{discrete_ld_points, sublattice, Lattice};
use pqtorus_kernel::numeric::{round_opt, Decimal, Scalar};

use crate::config::MeshConfig;
use crate::error::{MeshError, MeshResult};
use crate::mesh::{evaluate_point, FallbackReason};
use crate::projection::{default_projection, ProjectionMatrix};

/// One projected grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscreteSample {
    /// The exact grid point.
    pub z: Complex<BigRational>,
    /// Clamped 3D position, or the reason none could be computed.
    pub vertex: Result<[f64; 3], FallbackReason>,
}

impl DiscreteSample {
    pub fn is_exact(&self) -> bool {
        self.vertex.is_ok()
    }
}

fn project_all<S: Scalar>(
    lattice: &Lattice<S>,
    points: Vec<Complex<BigRational>>,
    lift: impl Fn(&BigRational) -> S,
    config: &MeshConfig,
    projection: Option<&ProjectionMatrix>,
) -> MeshResult<Vec<DiscreteSample>> {
    let projection = match projection {
        Some(p) => p.clone(),
        None => default_projection(None, lattice, config.n_max)?,
    };
    let series = SeriesConfig::new(config.n_max, config.precision);
    let g2 = round_opt(
        eisenstein_g2(&lattice.omega1, &lattice.omega2, config.n_max)?,
        config.precision,
    );

    Ok(points
        .into_iter()
        .map(|z| {
            let w = Complex::new(lift(&z.re), lift(&z.im));
            let vertex = evaluate_point(&w, lattice, &g2, &series, &projection)
                .map(|point| config.bounds.clamp(&point));
            DiscreteSample { z, vertex }
        })
        .collect())
}

/// Evaluate and project every [`discrete_ld_points`] entry on the
/// sublattice `L_d(p, q)`.
///
/// The backend follows `config.precision` as in [`crate::generate_mesh`].
/// Points that cannot be evaluated keep their failure reason instead of a
/// position; there is no classical-torus substitute since they have no
/// grid cell.
#[instrument(skip(config, projection), fields(n_max = config.n_max))]
pub fn sample_discrete_points(
    p: u64,
    q: u64,
    degree: u32,
    cap: Option<usize>,
    config: &MeshConfig,
    projection: Option<&ProjectionMatrix>,
) -> MeshResult<Vec<DiscreteSample>> {
    config.validate()?;
    let points = discrete_ld_points(p, q, degree, cap)?;
    // discrete_ld_points has rejected zero seeds; the sublattice only needs them as scalars.
    let (p_int, q_int) = (
        i64::try_from(p).map_err(|_| MeshError::invalid("p is out of range"))?,
        i64::try_from(q).map_err(|_| MeshError::invalid("q is out of range"))?,
    );
    let degree = i64::from(degree);

    let samples = match config.precision {
        Some(digits) => {
            let working = digits + GUARD_DIGITS;
            let lattice = sublattice(
                Decimal::from(p_int).with_precision(working),
                Decimal::from(q_int).with_precision(working),
                degree,
            )?;
            let lift = |r: &BigRational| Decimal::from_big_rational(r, working);
            project_all(&lattice, points, lift, config, projection)?
        }
        None => {
            let lattice = sublattice(p_int as f64, q_int as f64, degree)?;
            project_all(&lattice, points, |r: &BigRational| r.as_f64(), config, projection)?
        }
    };

    debug!(
        points = samples.len(),
        failed = samples.iter().filter(|s| !s.is_exact()).count(),
        "discrete points projected"
    );
    Ok(samples)
}
