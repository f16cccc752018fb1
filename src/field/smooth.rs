//! Separable Gaussian smoothing of velocity grids.
//!
//! Two 1D passes, horizontal then vertical, with kernel weight
//! `exp(-d² / sigma²)` and half-width `round(3 * sigma)`. Neighbours past the
//! grid edge are dropped from the sum rather than reflected, so edge cells
//! are normalised over a smaller support.

use crate::error::{ensure_positive, Result};
use crate::types::VelocityGrid;

/// Accumulated kernel weight below which a cell is written as zero.
pub const MIN_KERNEL_WEIGHT: f32 = 1e-6;

/// Blur both channels of `grid`. Returns a new grid of identical shape.
pub fn smooth(grid: &VelocityGrid, sigma: f32) -> Result<VelocityGrid> {
    ensure_positive("sigma", sigma)?;

    let columns = grid.columns();
    let rows = grid.rows();
    // Anything wider than the grid adds only omitted neighbours
    let half_width = ((3.0 * sigma).round() as usize).min(columns.max(rows));
    let kernel = kernel_weights(sigma, half_width);

    let mut horizontal = vec![0.0f32; grid.data().len()];
    blur_pass(grid.data(), &mut horizontal, &kernel, columns, rows, Axis::X);

    let mut vertical = vec![0.0f32; grid.data().len()];
    blur_pass(&horizontal, &mut vertical, &kernel, columns, rows, Axis::Y);

    Ok(grid.with_data(vertical))
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

/// Weights for offsets `0..=half_width`.
///
/// Divides before squaring so a sigma whose square underflows still gives a
/// centre weight of exactly 1.
fn kernel_weights(sigma: f32, half_width: usize) -> Vec<f32> {
    (0..=half_width)
        .map(|d| (-(d as f32 / sigma).powi(2)).exp())
        .collect()
}

fn blur_pass(
    src: &[f32],
    dst: &mut [f32],
    kernel: &[f32],
    columns: usize,
    rows: usize,
    axis: Axis,
) {
    let half_width = kernel.len() - 1;
    let (len, lines) = match axis {
        Axis::X => (columns, rows),
        Axis::Y => (rows, columns),
    };
    let cell_index = |line: usize, pos: usize| match axis {
        Axis::X => 2 * (line * columns + pos),
        Axis::Y => 2 * (pos * columns + line),
    };

    for line in 0..lines {
        for pos in 0..len {
            let lo = pos.saturating_sub(half_width);
            let hi = (pos + half_width).min(len - 1);

            let mut sum_u = 0.0f32;
            let mut sum_v = 0.0f32;
            let mut weight = 0.0f32;
            for n in lo..=hi {
                let w = kernel[pos.abs_diff(n)];
                let i = cell_index(line, n);
                sum_u += src[i] * w;
                sum_v += src[i + 1] * w;
                weight += w;
            }

            let out = cell_index(line, pos);
            // NaN lands here too
            if !(weight >= MIN_KERNEL_WEIGHT) {
                dst[out] = 0.0;
                dst[out + 1] = 0.0;
            } else {
                dst[out] = sum_u / weight;
                dst[out + 1] = sum_v / weight;
            }
        }
    }
}
