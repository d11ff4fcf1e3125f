use pqtorus_kernel::KernelError;
use thiserror::Error;

use crate::mesh::FallbackReason;

/// Failures that abort a whole mesh request.
///
/// Per-cell numeric trouble is not an error: it is recorded as a
/// [`crate::CellOutcome::Fallback`] on the affected vertex.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error("Invalid mesh parameter: {0}")]
    InvalidArgument(String),

    #[error("Projection matrix must be 3x4, got {rows}x{cols}")]
    ProjectionShape { rows: usize, cols: usize },

    #[error("Point cannot be embedded: {0}")]
    PointNotEmbeddable(FallbackReason),

    #[error("Mesh serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl MeshError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

pub type MeshResult<T> = Result<T, MeshError>;
