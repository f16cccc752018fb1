//! Cooperative, cancellable mesh generation.
//!
//! The driver chains the pure stages together and turns the two per-line
//! loops into cooperative tasks:
//!
//! ```text
//! [VelocityGrid] ──► smooth ──► sample ──► TraceBatch ──► RibbonMeshBuilder ──► [Mesh]
//!                                              ▲                 ▲
//!                                     checkpoint / yield   checkpoint / yield
//! ```
//!
//! # Design
//!
//! - **Explicit suspension** - `tokio::task::yield_now` once per quantum,
//!   measured with an injected [`Clock`].
//! - **Cooperative cancellation** - [`CancellationToken`] is polled at stage
//!   entry and after every line; a cancelled run yields
//!   [`MeshOutcome::Cancelled`], never a partial mesh.
//! - **Single random stream** - one [`crate::trace::FlowRng`] seeds the
//!   traces and then the ribbon phases, in that order.

pub mod cancel;
pub mod clock;
pub mod driver;

pub use cancel::CancellationToken;
pub use clock::{Clock, SystemClock};
pub use driver::{
    MeshOutcome, MeshPipeline, PipelineParams, PipelineReport, PipelineStage, DEFAULT_QUANTUM,
};
