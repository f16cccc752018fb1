//! Per-stage settings sections of [`super::FlowConfig`]
//!
//! Each section maps onto one table of the TOML config file:
//!
//! ```toml
//! seed = 24301
//! execution = "local"
//!
//! [smoothing]
//! sigma = 1.0
//!
//! [trace]
//! step_length = 1.0
//! max_steps = 50
//! min_speed = 0.001
//! speed_scale = 1.0
//! line_count = 1000
//!
//! [mesh]
//! distance_unit = 1.0
//!
//! [scheduler]
//! quantum_ms = 10
//! ```
//!
//! Missing keys fall back to their defaults.

use crate::mesh::DEFAULT_DISTANCE_UNIT;
use crate::pipeline::DEFAULT_QUANTUM;
use crate::trace::TraceParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default smoothing sigma, in cells
pub const DEFAULT_SIGMA: f32 = 1.0;

/// Default number of seeded streamlines
pub const DEFAULT_LINE_COUNT: usize = 1000;

/// Gaussian pre-smoothing of the input grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingSettings {
    /// Kernel width in cells
    pub sigma: f32,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SIGMA,
        }
    }
}

/// Streamline integration and seeding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSettings {
    /// Distance advanced per step, in grid units
    pub step_length: f32,

    /// Maximum integration steps per line
    pub max_steps: usize,

    /// Particles slower than this stop
    pub min_speed: f32,

    /// Multiplier applied to sampled velocities
    pub speed_scale: f32,

    /// Number of streamlines seeded per run
    pub line_count: usize,
}

impl Default for TraceSettings {
    fn default() -> Self {
        let trace = TraceParams::default();
        Self {
            step_length: trace.step_length,
            max_steps: trace.max_steps,
            min_speed: trace.min_speed,
            speed_scale: trace.speed_scale,
            line_count: DEFAULT_LINE_COUNT,
        }
    }
}

impl TraceSettings {
    pub fn trace_params(&self) -> TraceParams {
        TraceParams {
            step_length: self.step_length,
            max_steps: self.max_steps,
            min_speed: self.min_speed,
            speed_scale: self.speed_scale,
        }
    }
}

/// Ribbon mesh output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// Numerator of the per-segment display speed
    pub distance_unit: f32,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            distance_unit: DEFAULT_DISTANCE_UNIT,
        }
    }
}

/// Cooperative scheduling of the pipeline driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Work time between suspensions in milliseconds
    pub quantum_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            quantum_ms: DEFAULT_QUANTUM.as_millis() as u64,
        }
    }
}

impl SchedulerSettings {
    pub fn quantum(&self) -> Duration {
        Duration::from_millis(self.quantum_ms)
    }
}
