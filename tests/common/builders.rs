//! Test data builders for creating test objects

use flowmesh::field::{Field, SumField, UniformField, VortexField};
use flowmesh::trace::TraceParams;
use flowmesh::{PipelineParams, VelocityGrid};
use std::time::Duration;

/// Builder for test velocity grids
pub struct GridBuilder {
    columns: usize,
    rows: usize,
    cell_size: f32,
    field: SumField,
}

impl GridBuilder {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            cell_size: 1.0,
            field: SumField::new(),
        }
    }

    pub fn cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn uniform(self, u: f32, v: f32) -> Self {
        self.with_field(UniformField::new(u, v))
    }

    pub fn vortex(self, cx: f32, cy: f32, strength: f32) -> Self {
        self.with_field(VortexField::new(cx, cy, strength, 1.0))
    }

    pub fn with_field(mut self, field: impl Field + 'static) -> Self {
        self.field = self.field.with(field);
        self
    }

    /// An empty builder yields an all-zero grid
    pub fn build(self) -> VelocityGrid {
        VelocityGrid::from_field(&self.field, self.columns, self.rows, self.cell_size)
            .expect("test grid shape is valid")
    }
}

/// Builder for pipeline parameters with small test-friendly defaults
pub struct ParamsBuilder {
    params: PipelineParams,
}

impl ParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: PipelineParams {
                line_count: 32,
                trace: TraceParams {
                    max_steps: 20,
                    ..TraceParams::default()
                },
                ..PipelineParams::default()
            },
        }
    }

    pub fn lines(mut self, line_count: usize) -> Self {
        self.params.line_count = line_count;
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.params.trace.max_steps = max_steps;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    pub fn quantum(mut self, quantum: Duration) -> Self {
        self.params.quantum = quantum;
        self
    }

    pub fn build(self) -> PipelineParams {
        self.params
    }
}

impl Default for ParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_builder() {
        let grid = GridBuilder::new(3, 2).cell_size(0.5).uniform(1.0, -1.0).build();

        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cell_size(), 0.5);
        assert_eq!(grid.cell(2, 1), (1.0, -1.0));
    }

    #[test]
    fn test_empty_grid_builder_is_zero() {
        let grid = GridBuilder::new(2, 2).build();
        assert!(grid.data().iter().all(|&v| v == 0.0));
    }
}
