//! Thread boundary between callers and the delegated mesh worker.
//!
//! Requests move the grid's backing buffer into the worker; replies move the
//! finished vertex and index buffers back. Nothing large is copied in either
//! direction.

use crate::error::FlowError;
use crate::pipeline::CancellationToken;
use crate::types::VelocityGrid;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tokio::sync::oneshot;

/// Identifies one delegated computation in logs and errors.
pub type JobId = u64;

/// Commands sent from callers to the worker thread.
#[derive(Debug)]
pub enum WorkerCommand {
    /// Run the mesh pipeline on `grid`.
    Compute {
        job: JobId,
        grid: VelocityGrid,
        sigma: f32,
        /// Shared with the caller; cancelling it aborts the job at its next checkpoint
        cancel: CancellationToken,
        reply: oneshot::Sender<WorkerReply>,
    },
    /// Shut down the worker thread.
    Shutdown,
}

/// Replies sent from the worker to a waiting caller.
#[derive(Debug)]
pub enum WorkerReply {
    /// Raw mesh buffers, moved out of the worker.
    Mesh {
        vertex_data: Vec<f32>,
        index_data: Vec<u32>,
    },
    /// The job observed its cancellation token.
    Cancelled,
    /// The pipeline rejected its inputs. Carried as-is so callers see the
    /// same error the local path would return.
    Failed(FlowError),
}

/// Channel capacity for commands (callers → worker).
const CMD_CHANNEL_CAPACITY: usize = 64;

/// Why a command could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    Full,
    Disconnected,
}

/// Caller-side handle for submitting work to the worker thread.
#[derive(Debug, Clone)]
pub struct WorkerBridge {
    cmd_tx: Sender<WorkerCommand>,
}

impl WorkerBridge {
    /// Create a new bridge pair: `(bridge_for_callers, cmd_rx)`.
    ///
    /// The worker thread owns `cmd_rx`.
    pub fn new() -> (Self, Receiver<WorkerCommand>) {
        let (cmd_tx, cmd_rx) = bounded(CMD_CHANNEL_CAPACITY);
        (Self { cmd_tx }, cmd_rx)
    }

    /// Queue a command without blocking. A rejected command is dropped,
    /// along with any buffers it owned.
    pub fn submit(&self, cmd: WorkerCommand) -> Result<(), SendFailure> {
        self.cmd_tx.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => SendFailure::Full,
            TrySendError::Disconnected(_) => SendFailure::Disconnected,
        })
    }

    pub fn shutdown(&self) -> bool {
        self.cmd_tx.send(WorkerCommand::Shutdown).is_ok()
    }
}
