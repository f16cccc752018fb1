//! Delegated execution on a dedicated worker thread.
//!
//! The worker owns a current-thread tokio runtime and runs the same
//! [`MeshPipeline`] as the local path, so results are bit-identical. Callers
//! await a oneshot reply while also watching their cancellation token; a
//! cancelled call resolves immediately and any late reply is dropped.
//!
//! # Failure modes
//!
//! - Worker thread gone before the request is queued: [`FlowError::WorkerUnavailable`]
//! - Worker thread gone before replying: [`FlowError::WorkerCrashed`]
//!
//! # Shutdown
//!
//! [`DelegatedExecutor::shutdown`] (also run on drop) raises a stop token
//! before queueing `Shutdown`. The worker answers any still-queued job with
//! `Cancelled` and abandons a running job at its next yield, so the join
//! only waits for one pipeline quantum, not for the whole queue.

use crate::error::{FlowError, Result};
use crate::executor::bridge::{JobId, SendFailure, WorkerBridge, WorkerCommand, WorkerReply};
use crate::pipeline::{CancellationToken, MeshOutcome, MeshPipeline, PipelineParams};
use crate::types::{Mesh, VelocityGrid};
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use tokio::sync::oneshot;

/// Name given to the worker thread
pub const WORKER_THREAD_NAME: &str = "flowmesh-worker";

/// The loop running on the worker thread.
struct MeshWorker {
    params: PipelineParams,
    cmd_rx: Receiver<WorkerCommand>,
    runtime: tokio::runtime::Runtime,
    /// Raised by the owning executor when it shuts down
    stop: CancellationToken,
}

impl MeshWorker {
    fn new(
        params: PipelineParams,
        cmd_rx: Receiver<WorkerCommand>,
        stop: CancellationToken,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        Ok(Self {
            params,
            cmd_rx,
            runtime,
            stop,
        })
    }

    fn run(self) {
        tracing::info!("Mesh worker started");

        while let Ok(cmd) = self.cmd_rx.recv() {
            match cmd {
                WorkerCommand::Compute {
                    job,
                    grid,
                    sigma,
                    cancel,
                    reply,
                } => self.handle_compute(job, grid, sigma, cancel, reply),
                WorkerCommand::Shutdown => break,
            }
        }

        tracing::info!("Mesh worker exiting");
    }

    fn handle_compute(
        &self,
        job: JobId,
        grid: VelocityGrid,
        sigma: f32,
        cancel: CancellationToken,
        reply: oneshot::Sender<WorkerReply>,
    ) {
        // Caller already gave up, or the executor is going away
        if cancel.is_cancelled() || reply.is_closed() || self.stop.is_cancelled() {
            tracing::debug!("Job {} abandoned before start", job);
            let _ = reply.send(WorkerReply::Cancelled);
            return;
        }

        tracing::debug!("Job {} started", job);
        let mut pipeline = MeshPipeline::new(self.params);
        let stop = &self.stop;
        let result = self.runtime.block_on(async {
            tokio::select! {
                biased;
                _ = stop.cancelled() => {
                    tracing::debug!("Job {} abandoned on shutdown", job);
                    Ok(MeshOutcome::Cancelled)
                }
                result = pipeline.run(grid, sigma, &cancel) => result,
            }
        });

        let message = match result {
            Ok(MeshOutcome::Completed(mesh)) => {
                let (vertex_data, index_data) = mesh.into_buffers();
                WorkerReply::Mesh {
                    vertex_data,
                    index_data,
                }
            }
            Ok(MeshOutcome::Cancelled) => WorkerReply::Cancelled,
            Err(e) => WorkerReply::Failed(e),
        };

        if reply.send(message).is_err() {
            tracing::debug!("Job {} finished after its caller left; result dropped", job);
        }
    }
}

/// Runs mesh jobs on a dedicated thread.
pub struct DelegatedExecutor {
    bridge: WorkerBridge,
    handle: Option<JoinHandle<()>>,
    next_job: AtomicU64,
    stop: CancellationToken,
}

impl DelegatedExecutor {
    /// Spawn the worker thread.
    pub fn spawn(params: PipelineParams) -> Result<Self> {
        params.validate()?;
        let (bridge, cmd_rx) = WorkerBridge::new();
        let stop = CancellationToken::new();
        let worker = MeshWorker::new(params, cmd_rx, stop.clone())?;
        let handle = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            bridge,
            handle: Some(handle),
            next_job: AtomicU64::new(0),
            stop,
        })
    }

    /// Attach to an externally driven command receiver.
    #[cfg(test)]
    pub(crate) fn from_bridge(bridge: WorkerBridge) -> Self {
        Self {
            bridge,
            handle: None,
            next_job: AtomicU64::new(0),
            stop: CancellationToken::new(),
        }
    }

    /// Move `grid` to the worker and await the mesh.
    pub async fn compute_mesh(
        &self,
        grid: VelocityGrid,
        sigma: f32,
        cancel: &CancellationToken,
    ) -> Result<MeshOutcome> {
        if cancel.is_cancelled() {
            return Ok(MeshOutcome::Cancelled);
        }

        let job = self.next_job.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.bridge
            .submit(WorkerCommand::Compute {
                job,
                grid,
                sigma,
                cancel: cancel.clone(),
                reply: reply_tx,
            })
            .map_err(|failure| {
                tracing::warn!("Failed to submit job {}: {:?}", job, failure);
                match failure {
                    SendFailure::Full => {
                        FlowError::WorkerUnavailable("worker queue is full".into())
                    }
                    SendFailure::Disconnected => {
                        FlowError::WorkerUnavailable("worker thread has exited".into())
                    }
                }
            })?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Job {} cancelled while awaiting reply", job);
                Ok(MeshOutcome::Cancelled)
            }
            reply = reply_rx => match reply {
                Ok(WorkerReply::Mesh { vertex_data, index_data }) => {
                    Ok(MeshOutcome::Completed(Mesh::new(vertex_data, index_data)))
                }
                Ok(WorkerReply::Cancelled) => Ok(MeshOutcome::Cancelled),
                Ok(WorkerReply::Failed(e)) => Err(e),
                Err(_) => Err(FlowError::WorkerCrashed(job)),
            },
        }
    }

    /// Whether the worker thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the worker and wait for it to exit. Idempotent.
    ///
    /// Blocks the calling thread until the worker reaches its next
    /// checkpoint; queued jobs are answered with `Cancelled` unrun.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop.cancel();
            self.bridge.shutdown();
            if handle.join().is_err() {
                tracing::warn!("Mesh worker panicked");
            }
        }
    }
}

impl Drop for DelegatedExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceParams;

    fn params() -> PipelineParams {
        PipelineParams {
            line_count: 16,
            trace: TraceParams {
                max_steps: 10,
                ..TraceParams::default()
            },
            ..PipelineParams::default()
        }
    }

    #[tokio::test]
    async fn test_delegated_completes() {
        let executor = DelegatedExecutor::spawn(params()).unwrap();
        assert!(executor.is_running());
        let grid = VelocityGrid::uniform(8, 8, 1.0, 1.0, 0.0).unwrap();
        let outcome = executor
            .compute_mesh(grid, 1.0, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!outcome.into_mesh().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pre_cancelled_call_never_reaches_worker() {
        let executor = DelegatedExecutor::spawn(params()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let grid = VelocityGrid::uniform(4, 4, 1.0, 1.0, 0.0).unwrap();
        let outcome = executor.compute_mesh(grid, 1.0, &cancel).await.unwrap();
        assert!(outcome.is_cancelled());
    }

    #[tokio::test]
    async fn test_unavailable_after_shutdown() {
        let mut executor = DelegatedExecutor::spawn(params()).unwrap();
        executor.shutdown();
        assert!(!executor.is_running());

        let grid = VelocityGrid::uniform(4, 4, 1.0, 1.0, 0.0).unwrap();
        let err = executor
            .compute_mesh(grid, 1.0, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::WorkerUnavailable(_)));
    }

    #[tokio::test]
    async fn test_dropped_reply_is_crash() {
        let (bridge, cmd_rx) = WorkerBridge::new();
        let fake = std::thread::spawn(move || {
            // Accept one job and die without answering
            if let Ok(WorkerCommand::Compute { reply, .. }) = cmd_rx.recv() {
                drop(reply);
            }
        });
        let executor = DelegatedExecutor::from_bridge(bridge);
        let grid = VelocityGrid::uniform(4, 4, 1.0, 1.0, 0.0).unwrap();
        let err = executor
            .compute_mesh(grid, 1.0, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::WorkerCrashed(0)));
        fake.join().unwrap();
    }

    #[tokio::test]
    async fn test_worker_returns_core_error_unchanged() {
        let executor = DelegatedExecutor::spawn(params()).unwrap();
        let grid = VelocityGrid::uniform(4, 4, 1.0, 1.0, 0.0).unwrap();
        let err = executor
            .compute_mesh(grid, -1.0, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidParameter { name: "sigma", .. }));
    }

    fn queue_job(bridge: &WorkerBridge, grid: VelocityGrid) -> oneshot::Receiver<WorkerReply> {
        let (reply, reply_rx) = oneshot::channel();
        bridge
            .submit(WorkerCommand::Compute {
                job: 0,
                grid,
                sigma: 1.0,
                cancel: CancellationToken::new(),
                reply,
            })
            .unwrap();
        reply_rx
    }

    #[test]
    fn test_queued_job_is_skipped_after_stop() {
        let (bridge, cmd_rx) = WorkerBridge::new();
        let stop = CancellationToken::new();
        let worker = MeshWorker::new(params(), cmd_rx, stop.clone()).unwrap();

        let grid = VelocityGrid::uniform(8, 8, 1.0, 1.0, 0.0).unwrap();
        let mut reply_rx = queue_job(&bridge, grid);
        assert!(bridge.shutdown());
        stop.cancel();
        worker.run();

        assert!(matches!(reply_rx.try_recv(), Ok(WorkerReply::Cancelled)));
    }

    #[test]
    fn test_stop_abandons_running_job() {
        let big = PipelineParams {
            line_count: 1_000_000,
            trace: TraceParams {
                max_steps: 200,
                ..TraceParams::default()
            },
            quantum: std::time::Duration::from_millis(1),
            ..PipelineParams::default()
        };
        let (bridge, cmd_rx) = WorkerBridge::new();
        let stop = CancellationToken::new();
        let worker = MeshWorker::new(big, cmd_rx, stop.clone()).unwrap();

        // Long rightward lanes: nearly every line runs all 200 steps
        let grid = VelocityGrid::uniform(1024, 8, 1.0, 1.0, 0.0).unwrap();
        let mut reply_rx = queue_job(&bridge, grid);
        assert!(bridge.shutdown());
        let handle = std::thread::spawn(move || worker.run());
        std::thread::sleep(std::time::Duration::from_millis(10));
        stop.cancel();
        handle.join().unwrap();

        assert!(matches!(reply_rx.try_recv(), Ok(WorkerReply::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_resolves_cancelled() {
        let (bridge, cmd_rx) = WorkerBridge::new();
        // Worker that holds the job until told to stop
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let fake = std::thread::spawn(move || {
            let held = cmd_rx.recv();
            let _ = release_rx.recv();
            drop(held);
        });
        let executor = DelegatedExecutor::from_bridge(bridge);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let grid = VelocityGrid::uniform(4, 4, 1.0, 1.0, 0.0).unwrap();
        let outcome = executor.compute_mesh(grid, 1.0, &cancel).await.unwrap();
        assert!(outcome.is_cancelled());

        release_tx.send(()).unwrap();
        fake.join().unwrap();
    }
}
