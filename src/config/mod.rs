//! Configuration management for flowmesh
//!
//! [`FlowConfig`] collects every tunable of a pipeline run. It is stored as
//! TOML in the platform config directory under `flowmesh/`:
//!
//! - **Linux**: `~/.config/flowmesh/config.toml`
//! - **macOS**: `~/Library/Application Support/flowmesh/config.toml`
//! - **Windows**: `%APPDATA%\flowmesh\config.toml`
//!
//! # Main Types
//!
//! - [`FlowConfig`] - The full configuration
//! - [`ExecutionMode`] - Where mesh generation runs
//! - [`settings`] - The per-stage sections

pub mod settings;

pub use settings::{
    MeshSettings, SchedulerSettings, SmoothingSettings, TraceSettings, DEFAULT_LINE_COUNT,
    DEFAULT_SIGMA,
};

use crate::error::{FlowError, Result};
use crate::pipeline::PipelineParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name used under the platform config directory
pub const APP_DIR: &str = "flowmesh";

/// Config file name
pub const CONFIG_FILE: &str = "config.toml";

/// Default seed for the shared random source
pub const DEFAULT_SEED: u64 = 0x5EED;

/// Get the flowmesh config directory
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_DIR))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Where mesh generation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// On the caller's task
    #[default]
    Local,
    /// On a dedicated worker thread
    Delegated,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Local => write!(f, "local"),
            ExecutionMode::Delegated => write!(f, "delegated"),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Seed for streamline seeding and ribbon phases
    pub seed: u64,

    /// Execution context used by the CLI
    pub execution: ExecutionMode,

    pub smoothing: SmoothingSettings,

    pub trace: TraceSettings,

    pub mesh: MeshSettings,

    pub scheduler: SchedulerSettings,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            execution: ExecutionMode::default(),
            smoothing: SmoothingSettings::default(),
            trace: TraceSettings::default(),
            mesh: MeshSettings::default(),
            scheduler: SchedulerSettings::default(),
        }
    }
}

impl FlowConfig {
    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            FlowError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config from the default location, returning defaults if it
    /// is missing or unreadable
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FlowError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| {
            FlowError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Render the config as a TOML document
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| FlowError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        self.pipeline_params()
            .validate()
            .and_then(|_| crate::error::ensure_positive("sigma", self.smoothing.sigma))
            .map_err(|e| FlowError::Config(e.to_string()))
    }

    /// Parameters for [`crate::pipeline::MeshPipeline`]; the sigma is passed
    /// per call
    pub fn pipeline_params(&self) -> PipelineParams {
        PipelineParams {
            trace: self.trace.trace_params(),
            line_count: self.trace.line_count,
            distance_unit: self.mesh.distance_unit,
            quantum: self.scheduler.quantum(),
            seed: self.seed,
        }
    }
}
