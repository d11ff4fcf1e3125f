pub mod config;
pub mod elliptic;
pub mod error;
pub mod invariants;
pub mod lattice;
pub mod numeric;

// Re-export the common entry points at crate root for convenience.
pub use config::{SeriesConfig, SingularityPolicy};
pub use elliptic::{
    add_wp_values, duplicate_wp_value, laurent_coefficients, wp, wp_addition,
    wp_and_wp_prime, wp_and_wp_prime_with, wp_duplication, wp_from_invariants, wp_on_primary,
    wp_on_sublattice, wp_prime, wp_second_derivative, WpValues,
};
pub use error::{KernelError, KernelResult};
pub use invariants::{
    curve_for_sublattice, discriminant, eisenstein_g2, eisenstein_g3, elliptic_curve,
    g2_for_sublattice, g3_for_sublattice, invariants_numeric, j_invariant, EllipticCurve,
    InvariantSet,
};
pub use lattice::{discrete_ld_points, lattice_points, primary_lattice, sublattice, Lattice};
pub use numeric::{Decimal, Scalar};
