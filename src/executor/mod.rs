//! Execution contexts for the mesh pipeline.
//!
//! Callers see one contract, [`ExecutionContext::compute_mesh`], with two
//! interchangeable implementations:
//!
//! - [`LocalExecutor`] - runs the pipeline on the calling task
//! - [`DelegatedExecutor`] - moves the grid to a dedicated worker thread and
//!   moves the mesh buffers back
//!
//! Both drive the same [`crate::pipeline::MeshPipeline`] with the same
//! parameters, so they produce identical meshes.
//!
//! # Example
//!
//! ```ignore
//! use flowmesh::executor::ExecutionContext;
//! use flowmesh::pipeline::{CancellationToken, PipelineParams};
//!
//! let context = ExecutionContext::delegated(PipelineParams::default())?;
//! let cancel = CancellationToken::new();
//! match context.compute_mesh(grid, 1.0, &cancel).await? {
//!     MeshOutcome::Completed(mesh) => upload(mesh),
//!     MeshOutcome::Cancelled => {}
//! }
//! ```

pub mod bridge;
pub mod delegated;
pub mod local;

pub use bridge::{JobId, WorkerBridge, WorkerCommand, WorkerReply};
pub use delegated::DelegatedExecutor;
pub use local::LocalExecutor;

use crate::config::{ExecutionMode, FlowConfig};
use crate::error::Result;
use crate::pipeline::{CancellationToken, MeshOutcome, PipelineParams};
use crate::types::VelocityGrid;

/// Where mesh generation runs.
pub enum ExecutionContext {
    Local(LocalExecutor),
    Delegated(DelegatedExecutor),
}

impl ExecutionContext {
    pub fn local(params: PipelineParams) -> Self {
        ExecutionContext::Local(LocalExecutor::new(params))
    }

    /// Spawns the worker thread.
    pub fn delegated(params: PipelineParams) -> Result<Self> {
        Ok(ExecutionContext::Delegated(DelegatedExecutor::spawn(params)?))
    }

    /// Build the context selected by `config.execution`.
    pub fn from_config(config: &FlowConfig) -> Result<Self> {
        let params = config.pipeline_params();
        match config.execution {
            ExecutionMode::Local => Ok(Self::local(params)),
            ExecutionMode::Delegated => Self::delegated(params),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        match self {
            ExecutionContext::Local(_) => ExecutionMode::Local,
            ExecutionContext::Delegated(_) => ExecutionMode::Delegated,
        }
    }

    /// Generate the ribbon mesh for `grid`, or resolve as cancelled.
    pub async fn compute_mesh(
        &self,
        grid: VelocityGrid,
        sigma: f32,
        cancel: &CancellationToken,
    ) -> Result<MeshOutcome> {
        match self {
            ExecutionContext::Local(exec) => exec.compute_mesh(grid, sigma, cancel).await,
            ExecutionContext::Delegated(exec) => exec.compute_mesh(grid, sigma, cancel).await,
        }
    }
}
