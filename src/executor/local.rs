//! In-process execution on the caller's task.

use crate::error::Result;
use crate::pipeline::{CancellationToken, MeshOutcome, MeshPipeline, PipelineParams};
use crate::types::VelocityGrid;

/// Runs the pipeline directly inside the awaiting task.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    params: PipelineParams,
}

impl LocalExecutor {
    pub fn new(params: PipelineParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    pub async fn compute_mesh(
        &self,
        grid: VelocityGrid,
        sigma: f32,
        cancel: &CancellationToken,
    ) -> Result<MeshOutcome> {
        let mut pipeline = MeshPipeline::new(self.params);
        let outcome = pipeline.run(grid, sigma, cancel).await?;

        let report = pipeline.report();
        tracing::debug!(
            "Local run: {} lines traced, {} segments, {} degenerate, {} yields",
            report.lines_traced,
            report.mesh.segments,
            report.mesh.degenerate_segments,
            report.yields
        );
        for (stage, elapsed) in &report.stage_timings {
            tracing::trace!("  {}: {:?}", stage.name(), elapsed);
        }

        Ok(outcome)
    }
}
