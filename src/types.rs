//! Core data types for flowmesh
//!
//! This module contains the data structures that flow through the mesh
//! generation pipeline, from the input velocity grid to the output mesh.
//!
//! # Main Types
//!
//! - [`VelocityGrid`] - Row-major 2-channel velocity table with a fixed shape
//! - [`TraceVertex`] - A single position/time sample along a trace
//! - [`Streamline`] - Ordered vertices of one particle trace
//! - [`Mesh`] - Vertex/index buffer pair consumed by the renderer
//!
//! # Vertex Layout
//!
//! Every mesh vertex is [`VERTEX_STRIDE`] floats wide. The attribute order is
//! a fixed contract with the renderer:
//!
//! ```text
//! [x, y, edgeNormalX, edgeNormalY, side, t, totalTime, speed, randomSeed]
//! ```

use crate::error::{FlowError, Result};
use crate::field::Field;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Number of floats per mesh vertex
pub const VERTEX_STRIDE: usize = 9;

/// Offset of the position attribute (2 floats)
pub const ATTR_POSITION: usize = 0;
/// Offset of the edge normal attribute (2 floats)
pub const ATTR_NORMAL: usize = 2;
/// Offset of the side attribute (-1 or +1)
pub const ATTR_SIDE: usize = 4;
/// Offset of the vertex time
pub const ATTR_TIME: usize = 5;
/// Offset of the owning line's total time
pub const ATTR_TOTAL_TIME: usize = 6;
/// Offset of the segment display speed
pub const ATTR_SPEED: usize = 7;
/// Offset of the per-line random phase
pub const ATTR_RANDOM: usize = 8;

/// Vertices emitted per ribbon segment
pub const VERTICES_PER_SEGMENT: usize = 4;
/// Indices emitted per ribbon segment (two triangles)
pub const INDICES_PER_SEGMENT: usize = 6;

/// Discretized velocity field: `columns x rows` cells, each holding `(u, v)`.
///
/// The shape invariant `data.len() == 2 * columns * rows` is checked on
/// construction, so every other component may index the buffer freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridParts")]
pub struct VelocityGrid {
    columns: usize,
    rows: usize,
    cell_size: f32,
    data: Vec<f32>,
}

/// Unvalidated grid shape, as it arrives over serde.
#[derive(Deserialize)]
struct GridParts {
    columns: usize,
    rows: usize,
    cell_size: f32,
    data: Vec<f32>,
}

impl TryFrom<GridParts> for VelocityGrid {
    type Error = FlowError;

    fn try_from(parts: GridParts) -> Result<Self> {
        VelocityGrid::new(parts.data, parts.columns, parts.rows, parts.cell_size)
    }
}

impl VelocityGrid {
    /// Build a grid from an interleaved `(u, v)` buffer.
    pub fn new(data: Vec<f32>, columns: usize, rows: usize, cell_size: f32) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(FlowError::invalid(
                "columns/rows",
                format!("grid must be at least 1x1, got {}x{}", columns, rows),
            ));
        }
        crate::error::ensure_positive("cell_size", cell_size)?;

        let expected = columns
            .checked_mul(rows)
            .and_then(|n| n.checked_mul(2))
            .ok_or_else(|| FlowError::invalid("columns/rows", "grid size overflows usize"))?;
        if data.len() != expected {
            return Err(FlowError::ShapeMismatch {
                columns,
                rows,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            columns,
            rows,
            cell_size,
            data,
        })
    }

    /// Grid where every cell holds the same velocity.
    pub fn uniform(columns: usize, rows: usize, cell_size: f32, u: f32, v: f32) -> Result<Self> {
        let cells = columns.saturating_mul(rows);
        let data = std::iter::repeat([u, v]).take(cells).flatten().collect();
        Self::new(data, columns, rows, cell_size)
    }

    /// Rasterize any field by evaluating it at each cell centre index.
    pub fn from_field(
        field: &dyn Field,
        columns: usize,
        rows: usize,
        cell_size: f32,
    ) -> Result<Self> {
        let mut data = Vec::with_capacity(columns.saturating_mul(rows).saturating_mul(2));
        for y in 0..rows {
            for x in 0..columns {
                let (u, v) = field.evaluate(x as f32, y as f32);
                data.push(u);
                data.push(v);
            }
        }
        Self::new(data, columns, rows, cell_size)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Grid-to-output-unit scale
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Interleaved `(u, v)` buffer in row-major order
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of cells
    pub fn cell_count(&self) -> usize {
        self.columns * self.rows
    }

    /// Velocity stored at integer cell `(x, y)`. Callers must stay in bounds.
    #[inline]
    pub fn cell(&self, x: usize, y: usize) -> (f32, f32) {
        let i = 2 * (y * self.columns + x);
        (self.data[i], self.data[i + 1])
    }

    /// Give up the backing storage, e.g. to move it across a thread boundary.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// A grid with the same shape and a new buffer.
    pub(crate) fn with_data(&self, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            columns: self.columns,
            rows: self.rows,
            cell_size: self.cell_size,
            data,
        }
    }
}

/// One sample along a trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceVertex {
    /// Position in output units
    pub position: [f32; 2],
    /// Seconds since the trace started
    pub time: f32,
}

impl TraceVertex {
    pub fn new(x: f32, y: f32, time: f32) -> Self {
        Self {
            position: [x, y],
            time,
        }
    }
}

/// Ordered vertices of one particle trace. Never empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Streamline {
    pub vertices: Vec<TraceVertex>,
}

impl Streamline {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of consecutive vertex pairs
    pub fn segment_count(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    /// Time of the last vertex, or 0 for an empty line
    pub fn total_time(&self) -> f32 {
        self.vertices.last().map(|v| v.time).unwrap_or(0.0)
    }

    pub fn push(&mut self, vertex: TraceVertex) {
        self.vertices.push(vertex);
    }
}

/// Renderable ribbon mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// [`VERTEX_STRIDE`] floats per vertex
    pub vertex_data: Vec<f32>,
    /// Triangle list, three indices per triangle
    pub index_data: Vec<u32>,
}

impl Mesh {
    pub fn new(vertex_data: Vec<f32>, index_data: Vec<u32>) -> Self {
        Self {
            vertex_data,
            index_data,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_data.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.index_data.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.index_data.is_empty()
    }

    /// Attribute slice for vertex `i`
    pub fn vertex(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(VERTEX_STRIDE)?;
        self.vertex_data.get(start..start + VERTEX_STRIDE)
    }

    /// Split into the raw `(vertex, index)` buffers.
    pub fn into_buffers(self) -> (Vec<f32>, Vec<u32>) {
        (self.vertex_data, self.index_data)
    }

    /// Write the vertex buffer as little-endian f32.
    pub fn write_vertices_le<W: Write>(&self, mut w: W) -> Result<()> {
        for value in &self.vertex_data {
            w.write_all(&value.to_le_bytes())?;
        }
        w.flush()?;
        Ok(())
    }

    /// Write the index buffer as little-endian u32.
    pub fn write_indices_le<W: Write>(&self, mut w: W) -> Result<()> {
        for value in &self.index_data {
            w.write_all(&value.to_le_bytes())?;
        }
        w.flush()?;
        Ok(())
    }
}
