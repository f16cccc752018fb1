//! Ribbon mesh construction
//!
//! Every trace segment becomes a quad of four vertices straddling the
//! segment, split into two triangles. The shader extrudes each vertex along
//! its edge normal by `side * width`, and animates the streak using the
//! per-vertex time, the line's total time, the segment speed and the
//! line's random phase.
//!
//! ```text
//!   0 (p0, -1) ─────── 2 (p1, -1)
//!   │  ╲                │
//!   │     ╲             │        triangles: (0, 1, 2), (1, 3, 2)
//!   │        ╲          │
//!   1 (p0, +1) ─────── 3 (p1, +1)
//! ```
//!
//! Segments with a non-positive time delta or length are skipped; they
//! would otherwise put NaN or infinity into the speed or normal.

use crate::trace::FlowRng;
use crate::types::{
    Mesh, Streamline, TraceVertex, INDICES_PER_SEGMENT, VERTEX_STRIDE, VERTICES_PER_SEGMENT,
};

/// Default numerator for the per-segment display speed
pub const DEFAULT_DISTANCE_UNIT: f32 = 1.0;

/// Counters collected while building a mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub lines: usize,
    pub segments: usize,
    pub degenerate_segments: usize,
}

/// Incremental ribbon builder, fed one line at a time.
#[derive(Debug)]
pub struct RibbonMeshBuilder {
    distance_unit: f32,
    vertex_data: Vec<f32>,
    index_data: Vec<u32>,
    vertex_count: u32,
    stats: MeshStats,
}

impl RibbonMeshBuilder {
    pub fn new(distance_unit: f32) -> Self {
        Self {
            distance_unit,
            vertex_data: Vec::new(),
            index_data: Vec::new(),
            vertex_count: 0,
            stats: MeshStats::default(),
        }
    }

    /// Pre-size buffers for `segments` segments.
    pub fn with_capacity(distance_unit: f32, segments: usize) -> Self {
        let mut builder = Self::new(distance_unit);
        builder
            .vertex_data
            .reserve(segments * VERTICES_PER_SEGMENT * VERTEX_STRIDE);
        builder.index_data.reserve(segments * INDICES_PER_SEGMENT);
        builder
    }

    /// Append one line. Always draws exactly one value from `rng`.
    pub fn push_line(&mut self, line: &Streamline, rng: &mut FlowRng) {
        let phase = rng.next_unit();
        let total_time = line.total_time();
        self.stats.lines += 1;

        for pair in line.vertices.windows(2) {
            if !self.push_segment(&pair[0], &pair[1], total_time, phase) {
                self.stats.degenerate_segments += 1;
            }
        }
    }

    fn push_segment(
        &mut self,
        a: &TraceVertex,
        b: &TraceVertex,
        total_time: f32,
        phase: f32,
    ) -> bool {
        let dt = b.time - a.time;
        if !(dt > 0.0) {
            return false;
        }
        let speed = self.distance_unit / dt;

        let [x0, y0] = a.position;
        let [x1, y1] = b.position;
        let (dx, dy) = (x1 - x0, y1 - y0);
        let len = (dx * dx + dy * dy).sqrt();
        if !(len > 0.0) {
            return false;
        }
        let (ex, ey) = (-dy / len, dx / len);

        if !(speed.is_finite() && ex.is_finite() && ey.is_finite()) {
            return false;
        }
        if self.vertex_count > u32::MAX - VERTICES_PER_SEGMENT as u32 {
            return false;
        }

        let base = self.vertex_count;
        #[rustfmt::skip]
        let quad = [
            x0, y0,  ex,  ey, -1.0, a.time, total_time, speed, phase,
            x0, y0, -ex, -ey,  1.0, a.time, total_time, speed, phase,
            x1, y1,  ex,  ey, -1.0, b.time, total_time, speed, phase,
            x1, y1, -ex, -ey,  1.0, b.time, total_time, speed, phase,
        ];
        self.vertex_data.extend_from_slice(&quad);
        self.index_data.extend_from_slice(&[
            base,
            base + 1,
            base + 2,
            base + 1,
            base + 3,
            base + 2,
        ]);
        self.vertex_count += VERTICES_PER_SEGMENT as u32;
        self.stats.segments += 1;
        true
    }

    pub fn stats(&self) -> MeshStats {
        self.stats
    }

    pub fn finish(self) -> Mesh {
        if self.stats.degenerate_segments > 0 {
            tracing::debug!(
                "Skipped {} degenerate segments of {}",
                self.stats.degenerate_segments,
                self.stats.segments + self.stats.degenerate_segments
            );
        }
        Mesh::new(self.vertex_data, self.index_data)
    }
}

/// Build the ribbon mesh for `lines`, drawing one phase per line from `rng`.
pub fn build_mesh(lines: &[Streamline], rng: &mut FlowRng, distance_unit: f32) -> Mesh {
    let segments = lines.iter().map(Streamline::segment_count).sum();
    let mut builder = RibbonMeshBuilder::with_capacity(distance_unit, segments);
    for line in lines {
        builder.push_line(line, rng);
    }
    builder.finish()
}
