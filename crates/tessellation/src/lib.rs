//! Quad meshes of the complex torus `ℂ / L_d(p, q)`, embedded
//! in 3D through ℘, ℘′ and ℘″.

pub mod config;
pub mod discrete;
pub mod error;
pub mod mesh;
pub mod projection;

pub use config::{classical_torus_point, ClampBounds, FallbackTorus, MeshConfig};
pub use discrete::{sample_discrete_points, DiscreteSample};
pub use error::{MeshError, MeshResult};
pub use mesh::{
    embed_torus_point, generate_mesh, torus_facets, CellOutcome, FallbackReason, MeshMetadata,
    TorusMesh,
};
pub use projection::{default_projection, BasepointSample, ProjectionMatrix};
