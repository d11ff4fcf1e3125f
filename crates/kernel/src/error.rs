use thiserror::Error;

/// Failures raised by the lattice, invariant and elliptic-function layers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Division by zero while computing {context}")]
    DivisionByZero { context: &'static str },

    #[error("Degenerate lattice: period combination ({m}, {n}) vanishes")]
    DegenerateLattice { m: i64, n: i64 },

    #[error("Periods are linearly dependent over the reals")]
    DependentPeriods,

    #[error("Singular curve: discriminant is zero, j-invariant undefined")]
    SingularCurve,
}

impl KernelError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
