//! # flowmesh: 2D flow fields to animated ribbon meshes
//!
//! Turns a gridded 2D velocity field into a triangle mesh of streamline
//! ribbons whose per-vertex attributes drive a flowing-line animation. The
//! architecture separates the pure numeric stages from the cooperative
//! driver that schedules them.
//!
//! ## Architecture
//!
//! - **Field**: Gaussian smoothing and nearest-cell sampling of a [`VelocityGrid`]
//! - **Trace**: Euler streamline integration, seeded in batches from [`FlowRng`]
//! - **Mesh**: Ribbon quads with a 9-float vertex layout
//! - **Pipeline**: Cancellable, time-sliced driver over the stages above
//! - **Executor**: Local or worker-thread execution behind one contract
//!
//! ## Configuration
//!
//! Pipeline tunables live in [`FlowConfig`], stored as TOML under the
//! platform config directory in `flowmesh/config.toml`.
//!
//! ## Example
//!
//! ```ignore
//! use flowmesh::{CancellationToken, ExecutionContext, FlowConfig, MeshOutcome, VelocityGrid};
//!
//! #[tokio::main]
//! async fn main() -> flowmesh::Result<()> {
//!     let config = FlowConfig::load_or_default();
//!     let context = ExecutionContext::from_config(&config)?;
//!
//!     let grid = VelocityGrid::uniform(64, 64, 1.0, 1.0, 0.0)?;
//!     let cancel = CancellationToken::new();
//!     if let MeshOutcome::Completed(mesh) = context
//!         .compute_mesh(grid, config.smoothing.sigma, &cancel)
//!         .await?
//!     {
//!         println!("{} triangles", mesh.triangle_count());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod field;
pub mod mesh;
pub mod pipeline;
pub mod trace;
pub mod types;

// Re-export commonly used types
pub use config::{ExecutionMode, FlowConfig};
pub use error::{FlowError, Result};
pub use executor::{DelegatedExecutor, ExecutionContext, LocalExecutor};
pub use field::{sample, smooth, Field, GridField};
pub use mesh::{build_mesh, MeshStats, RibbonMeshBuilder};
pub use pipeline::{CancellationToken, MeshOutcome, MeshPipeline, PipelineParams};
pub use trace::{generate_batch, trace, FlowRng, TraceBatch, TraceParams};
pub use types::{Mesh, Streamline, TraceVertex, VelocityGrid};
