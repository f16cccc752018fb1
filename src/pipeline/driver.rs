//! Cooperative mesh pipeline driver.
//!
//! Runs smoothing, sampling, tracing and mesh building in order. The two
//! per-line stages are chunked: after each line the driver checks the
//! cancellation token, and once a processing quantum has elapsed since the
//! last suspension it yields to the tokio scheduler.
//!
//! ```text
//! Idle → Smoothing → Sampling → Tracing → MeshBuilding → Done
//!   └──────────┴──────────┴─────────┴───────────┴──→ Cancelled
//! ```

use crate::error::Result;
use crate::field::{sample, smooth};
use crate::mesh::{MeshStats, RibbonMeshBuilder, DEFAULT_DISTANCE_UNIT};
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::clock::{Clock, SystemClock};
use crate::trace::{FlowRng, TraceBatch, TraceParams};
use crate::types::{Mesh, Streamline, VelocityGrid};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default processing quantum between suspensions
pub const DEFAULT_QUANTUM: Duration = Duration::from_millis(10);

/// Parameters for one pipeline run, excluding the smoothing sigma.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineParams {
    pub trace: TraceParams,
    /// Number of seeded streamlines
    pub line_count: usize,
    /// Numerator of the per-segment display speed
    pub distance_unit: f32,
    /// Work time allowed between suspensions
    pub quantum: Duration,
    /// Seed for the shared random source
    pub seed: u64,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            trace: TraceParams::default(),
            line_count: 1000,
            distance_unit: DEFAULT_DISTANCE_UNIT,
            quantum: DEFAULT_QUANTUM,
            seed: 0x5EED,
        }
    }
}

impl PipelineParams {
    pub fn validate(&self) -> Result<()> {
        self.trace.validate()?;
        crate::error::ensure_positive("distance_unit", self.distance_unit)
    }
}

/// Driver state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStage {
    #[default]
    Idle,
    Smoothing,
    Sampling,
    Tracing,
    MeshBuilding,
    Done,
    Cancelled,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Cancelled)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Smoothing => "smoothing",
            PipelineStage::Sampling => "sampling",
            PipelineStage::Tracing => "tracing",
            PipelineStage::MeshBuilding => "mesh-building",
            PipelineStage::Done => "done",
            PipelineStage::Cancelled => "cancelled",
        }
    }
}

/// Terminal result of a run. Cancellation carries no data.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshOutcome {
    Completed(Mesh),
    Cancelled,
}

impl MeshOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MeshOutcome::Cancelled)
    }

    pub fn into_mesh(self) -> Option<Mesh> {
        match self {
            MeshOutcome::Completed(mesh) => Some(mesh),
            MeshOutcome::Cancelled => None,
        }
    }
}

/// What the last run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    /// Lines traced (may be short of `line_count` if cancelled)
    pub lines_traced: usize,
    /// Lines added to the mesh
    pub lines_meshed: usize,
    /// Number of suspensions
    pub yields: usize,
    pub mesh: MeshStats,
    /// Time spent in each stage that was entered
    pub stage_timings: Vec<(PipelineStage, Duration)>,
}

/// Tracks elapsed work time and suspends when the quantum runs out.
struct Checkpoint {
    quantum: Duration,
    last_yield: Instant,
    yields: usize,
}

impl Checkpoint {
    fn new(now: Instant, quantum: Duration) -> Self {
        Self {
            quantum,
            last_yield: now,
            yields: 0,
        }
    }

    /// Call after each line. Returns true if the run must stop.
    async fn after_item<C: Clock>(&mut self, clock: &C, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return true;
        }
        let now = clock.now();
        if now.saturating_duration_since(self.last_yield) >= self.quantum {
            tracing::trace!("Quantum elapsed, yielding");
            tokio::task::yield_now().await;
            self.yields += 1;
            self.last_yield = clock.now();
            return cancel.is_cancelled();
        }
        false
    }
}

/// The mesh generation driver.
pub struct MeshPipeline<C: Clock = SystemClock> {
    params: PipelineParams,
    clock: C,
    stage: PipelineStage,
    stage_started: Option<Instant>,
    report: PipelineReport,
}

impl MeshPipeline<SystemClock> {
    pub fn new(params: PipelineParams) -> Self {
        Self::with_clock(params, SystemClock)
    }
}

impl<C: Clock> MeshPipeline<C> {
    pub fn with_clock(params: PipelineParams, clock: C) -> Self {
        Self {
            params,
            clock,
            stage: PipelineStage::Idle,
            stage_started: None,
            report: PipelineReport::default(),
        }
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Current (or final) stage
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Report for the most recent run
    pub fn report(&self) -> &PipelineReport {
        &self.report
    }

    /// Generate the ribbon mesh for `grid`.
    ///
    /// Returns `Ok(MeshOutcome::Cancelled)` if `cancel` fires at any
    /// checkpoint; no partial mesh is ever returned. Errors only on invalid
    /// parameters.
    pub async fn run(
        &mut self,
        grid: VelocityGrid,
        sigma: f32,
        cancel: &CancellationToken,
    ) -> Result<MeshOutcome> {
        self.params.validate()?;
        crate::error::ensure_positive("sigma", sigma)?;

        self.stage = PipelineStage::Idle;
        self.stage_started = None;
        self.report = PipelineReport::default();

        let columns = grid.columns();
        let rows = grid.rows();
        let cell_size = grid.cell_size();
        tracing::info!(
            "Mesh pipeline started: {}x{} grid, sigma {}, {} lines",
            columns,
            rows,
            sigma,
            self.params.line_count
        );

        if self.enter(PipelineStage::Smoothing, cancel) {
            return Ok(self.cancelled());
        }
        let smoothed = smooth(&grid, sigma)?;
        drop(grid);

        if self.enter(PipelineStage::Sampling, cancel) {
            return Ok(self.cancelled());
        }
        let field = sample(Arc::new(smoothed));

        if self.enter(PipelineStage::Tracing, cancel) {
            return Ok(self.cancelled());
        }
        let mut rng = FlowRng::new(self.params.seed);
        let mut checkpoint = Checkpoint::new(self.clock.now(), self.params.quantum);
        let mut lines: Vec<Streamline> = Vec::with_capacity(self.params.line_count);
        let mut interrupted = false;
        {
            let batch = TraceBatch::new(
                &field,
                columns,
                rows,
                self.params.line_count,
                &mut rng,
                self.params.trace,
                cell_size,
            );
            for line in batch {
                lines.push(line);
                if checkpoint.after_item(&self.clock, cancel).await {
                    interrupted = true;
                    break;
                }
            }
        }
        self.report.lines_traced = lines.len();
        if interrupted {
            self.report.yields = checkpoint.yields;
            return Ok(self.cancelled());
        }

        if self.enter(PipelineStage::MeshBuilding, cancel) {
            self.report.yields = checkpoint.yields;
            return Ok(self.cancelled());
        }
        let segments = lines.iter().map(Streamline::segment_count).sum();
        let mut builder = RibbonMeshBuilder::with_capacity(self.params.distance_unit, segments);
        for line in &lines {
            builder.push_line(line, &mut rng);
            self.report.lines_meshed += 1;
            if checkpoint.after_item(&self.clock, cancel).await {
                interrupted = true;
                break;
            }
        }
        self.report.yields = checkpoint.yields;
        self.report.mesh = builder.stats();
        if interrupted {
            return Ok(self.cancelled());
        }

        let mesh = builder.finish();
        self.finish_stage();
        self.stage = PipelineStage::Done;
        tracing::info!(
            "Mesh pipeline finished: {} lines, {} vertices, {} triangles, {} yields",
            self.report.lines_meshed,
            mesh.vertex_count(),
            mesh.triangle_count(),
            self.report.yields
        );
        Ok(MeshOutcome::Completed(mesh))
    }

    /// Transition into `stage`. Returns true if the run must stop instead.
    fn enter(&mut self, stage: PipelineStage, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return true;
        }
        self.finish_stage();
        tracing::debug!("Pipeline stage: {} -> {}", self.stage.name(), stage.name());
        self.stage = stage;
        self.stage_started = Some(self.clock.now());
        false
    }

    fn finish_stage(&mut self) {
        if let Some(started) = self.stage_started.take() {
            let elapsed = self.clock.now().saturating_duration_since(started);
            self.report.stage_timings.push((self.stage, elapsed));
        }
    }

    fn cancelled(&mut self) -> MeshOutcome {
        self.finish_stage();
        tracing::info!("Mesh pipeline cancelled during {}", self.stage.name());
        self.stage = PipelineStage::Cancelled;
        MeshOutcome::Cancelled
    }
}
